//! Authenticated user record

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Role a user may hold
///
/// The backend calls the passenger role `user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Requests rides
    #[serde(rename = "user")]
    Passenger,
    /// Accepts and drives rides
    #[serde(rename = "driver")]
    Driver,
}

/// Server-assigned loyalty classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FidelityTier {
    /// Entry tier
    #[default]
    Base,
    /// Intermediate tier
    Plus,
    /// Top tier
    Premium,
}

/// Authenticated principal as returned by the auth API
///
/// Rating, trip count and fidelity tier are server-authoritative. The client
/// only ever replaces the whole record after a confirmed sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User identifier
    pub id: UserId,

    /// Given names
    #[serde(rename = "nombres")]
    pub first_name: String,

    /// Family names
    #[serde(rename = "apellidos")]
    pub last_name: String,

    /// Email address
    pub email: String,

    /// Phone number
    #[serde(rename = "telefono")]
    pub phone: String,

    /// Profile photo URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    /// Roles held by this user
    #[serde(default)]
    pub roles: Vec<Role>,

    /// Aggregate rating
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,

    /// Total completed trips
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_trips: Option<u32>,

    /// Loyalty tier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fidelity_level: Option<FidelityTier>,
}

impl User {
    /// Whether the user holds the given role
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Full display name
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Loyalty tier, defaulting to base when the server omits it
    pub fn fidelity(&self) -> FidelityTier {
        self.fidelity_level.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_from_wire() {
        let json = r#"{
            "id": "mock-user-123",
            "nombres": "Kiki",
            "apellidos": "Mock",
            "email": "kiki.mock@rudix.com",
            "telefono": "+123456789",
            "roles": ["user", "driver"],
            "fidelityLevel": "plus"
        }"#;

        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.display_name(), "Kiki Mock");
        assert!(user.has_role(Role::Passenger));
        assert!(user.has_role(Role::Driver));
        assert_eq!(user.fidelity(), FidelityTier::Plus);
        assert!(user.rating.is_none());
    }

    #[test]
    fn test_missing_roles_and_tier_default() {
        let json = r#"{
            "id": "u2",
            "nombres": "Ana",
            "apellidos": "",
            "email": "ana@rudix.com",
            "telefono": "+5215555555555"
        }"#;

        let user: User = serde_json::from_str(json).unwrap();
        assert!(user.roles.is_empty());
        assert!(!user.has_role(Role::Driver));
        assert_eq!(user.fidelity(), FidelityTier::Base);
        assert_eq!(user.display_name(), "Ana");
    }
}
