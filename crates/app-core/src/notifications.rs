//! Notification feed
//!
//! Entries are read-only apart from their read flag, which only
//! [`NotificationFeed::mark_read`] changes. The unread badge is published on a
//! watch channel so the tab bar updates without polling.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Unread count at which the badge stops counting (displays as "30+")
pub const MAX_DISPLAY_COUNT: u32 = 30;

/// Unread badge value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnreadDisplay {
    /// No unread items
    #[default]
    None,
    /// Specific count (1-29)
    Count(u32),
    /// 30 or more unread items
    Many,
}

impl UnreadDisplay {
    /// Create from a numeric count
    pub fn from_count(count: u32) -> Self {
        match count {
            0 => UnreadDisplay::None,
            n if n >= MAX_DISPLAY_COUNT => UnreadDisplay::Many,
            n => UnreadDisplay::Count(n),
        }
    }

    /// Whether the badge should be shown
    pub fn has_unread(&self) -> bool {
        !matches!(self, UnreadDisplay::None)
    }
}

impl std::fmt::Display for UnreadDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnreadDisplay::None => Ok(()),
            UnreadDisplay::Count(n) => write!(f, "{n}"),
            UnreadDisplay::Many => write!(f, "{MAX_DISPLAY_COUNT}+"),
        }
    }
}

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    /// Trip receipts and updates
    Trip,
    /// Promotions
    Promo,
}

/// Icon shown next to the entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationIcon {
    /// Receipt icon
    Receipt,
    /// Gift icon
    Gift,
}

/// Feed entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
    /// Entry identifier
    pub id: String,
    /// Category
    #[serde(rename = "type")]
    pub category: NotificationCategory,
    /// Title line
    pub title: String,
    /// Body text
    pub message: String,
    /// When the notification was sent
    pub time: DateTime<Utc>,
    /// Whether the user has opened it
    pub read: bool,
    /// Icon selector
    pub icon: NotificationIcon,
}

/// Feed filter tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationFilter {
    /// Everything
    #[default]
    All,
    /// Unread only
    Unread,
    /// Trip notifications
    Trips,
    /// Promotions
    Promos,
}

impl NotificationFilter {
    /// Whether an entry belongs under this tab
    pub fn matches(&self, item: &NotificationItem) -> bool {
        match self {
            NotificationFilter::All => true,
            NotificationFilter::Unread => !item.read,
            NotificationFilter::Trips => item.category == NotificationCategory::Trip,
            NotificationFilter::Promos => item.category == NotificationCategory::Promo,
        }
    }
}

/// In-memory notification feed
pub struct NotificationFeed {
    items: RwLock<Vec<NotificationItem>>,
    unread_tx: watch::Sender<UnreadDisplay>,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl NotificationFeed {
    /// Create a feed from server entries
    pub fn new(items: Vec<NotificationItem>) -> Self {
        let unread = UnreadDisplay::from_count(count_unread(&items));
        let (unread_tx, _) = watch::channel(unread);
        Self { items: RwLock::new(items), unread_tx }
    }

    /// All entries in feed order
    pub fn items(&self) -> Vec<NotificationItem> {
        self.items.read().clone()
    }

    /// Entries under a filter tab
    pub fn filtered(&self, filter: NotificationFilter) -> Vec<NotificationItem> {
        self.items.read().iter().filter(|item| filter.matches(item)).cloned().collect()
    }

    /// Replace the whole feed with a fresh server listing
    ///
    /// The badge is republished only when its value changes.
    pub fn replace(&self, items: Vec<NotificationItem>) {
        let mut current = self.items.write();
        *current = items;
        let unread = UnreadDisplay::from_count(count_unread(&current));
        self.unread_tx.send_if_modified(|display| {
            let changed = *display != unread;
            *display = unread;
            changed
        });
        tracing::debug!(items = current.len(), %unread, "notification feed replaced");
    }

    /// Mark one entry as read
    ///
    /// Returns `false` when no entry has that id. Marking an entry twice is a
    /// no-op.
    pub fn mark_read(&self, id: &str) -> bool {
        let mut items = self.items.write();
        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        if !item.read {
            item.read = true;
            self.unread_tx.send_replace(UnreadDisplay::from_count(count_unread(&items)));
        }
        true
    }

    /// Number of unread entries
    pub fn unread_count(&self) -> u32 {
        count_unread(&self.items.read())
    }

    /// Number of entries in a category
    pub fn count(&self, category: NotificationCategory) -> usize {
        self.items.read().iter().filter(|item| item.category == category).count()
    }

    /// Current badge value
    pub fn unread_display(&self) -> UnreadDisplay {
        *self.unread_tx.borrow()
    }

    /// Subscribe to badge changes
    pub fn subscribe_unread(&self) -> watch::Receiver<UnreadDisplay> {
        self.unread_tx.subscribe()
    }
}

fn count_unread(items: &[NotificationItem]) -> u32 {
    let unread = items.iter().filter(|item| !item.read).count();
    u32::try_from(unread).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, category: NotificationCategory, read: bool) -> NotificationItem {
        NotificationItem {
            id: id.to_string(),
            category,
            title: "Viaje completado".to_string(),
            message: "Tu viaje a Plaza Carso ha finalizado".to_string(),
            time: Utc::now(),
            read,
            icon: match category {
                NotificationCategory::Trip => NotificationIcon::Receipt,
                NotificationCategory::Promo => NotificationIcon::Gift,
            },
        }
    }

    fn feed() -> NotificationFeed {
        NotificationFeed::new(vec![
            item("1", NotificationCategory::Trip, false),
            item("2", NotificationCategory::Promo, false),
            item("3", NotificationCategory::Trip, true),
        ])
    }

    #[test]
    fn test_unread_display_from_count() {
        assert_eq!(UnreadDisplay::from_count(0), UnreadDisplay::None);
        assert_eq!(UnreadDisplay::from_count(5), UnreadDisplay::Count(5));
        assert_eq!(UnreadDisplay::from_count(30), UnreadDisplay::Many);
        assert_eq!(UnreadDisplay::from_count(100).to_string(), "30+");
        assert_eq!(UnreadDisplay::None.to_string(), "");
        assert!(!UnreadDisplay::None.has_unread());
    }

    #[test]
    fn test_filters_and_counts() {
        let feed = feed();
        assert_eq!(feed.filtered(NotificationFilter::All).len(), 3);
        assert_eq!(feed.filtered(NotificationFilter::Unread).len(), 2);
        assert_eq!(feed.filtered(NotificationFilter::Promos)[0].id, "2");
        assert_eq!(feed.count(NotificationCategory::Trip), 2);
        assert_eq!(feed.count(NotificationCategory::Promo), 1);
        assert_eq!(feed.unread_count(), 2);
    }

    #[tokio::test]
    async fn test_mark_read_updates_badge() {
        let feed = feed();
        let mut rx = feed.subscribe_unread();
        assert_eq!(*rx.borrow(), UnreadDisplay::Count(2));

        assert!(feed.mark_read("1"));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), UnreadDisplay::Count(1));

        // Already read and unknown ids change nothing
        assert!(feed.mark_read("1"));
        assert!(!feed.mark_read("missing"));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(feed.unread_display(), UnreadDisplay::Count(1));
    }

    #[tokio::test]
    async fn test_replace_republishes_badge() {
        let feed = NotificationFeed::default();
        let mut rx = feed.subscribe_unread();
        assert_eq!(*rx.borrow_and_update(), UnreadDisplay::None);

        feed.replace(vec![
            item("1", NotificationCategory::Trip, false),
            item("2", NotificationCategory::Promo, true),
        ]);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), UnreadDisplay::Count(1));
        assert_eq!(feed.items().len(), 2);

        // Same unread total, new entries: badge observers are not woken
        feed.replace(vec![item("3", NotificationCategory::Trip, false)]);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(feed.filtered(NotificationFilter::All)[0].id, "3");

        feed.replace(Vec::new());
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), UnreadDisplay::None);
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(item("7", NotificationCategory::Promo, false)).unwrap();
        assert_eq!(json["type"], "promo");
        assert_eq!(json["icon"], "gift");
        assert_eq!(json["read"], false);
    }
}
