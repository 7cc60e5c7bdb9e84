//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    /// Soft delete timestamp (None = active, Some = deleted)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_on: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new member with a fresh identity
    pub fn register(
        display_name: String,
        email: Option<String>,
        phone_number: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            display_name,
            email,
            phone_number,
            created_on: now,
            updated_on: now,
            deleted_on: None,
        }
    }

    /// Check if user is active (not deleted)
    pub fn is_active(&self) -> bool {
        self.deleted_on.is_none()
    }
}

/// User representation handed out by queries and commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDto {
    pub id: Uuid,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub created_on: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            email: user.email,
            phone_number: user.phone_number,
            created_on: user.created_on,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_identity_and_timestamps() {
        let a = User::register("Max".into(), Some("max@example.com".into()), None);
        let b = User::register("Max".into(), None, Some("+4917612345678".into()));

        assert_ne!(a.id, b.id);
        assert!(a.is_active());
        assert_eq!(a.created_on, a.updated_on);
    }

    #[test]
    fn test_dto_omits_missing_contact_fields() {
        let user = User::register("Anna".into(), None, Some("+4917612345678".into()));
        let json = serde_json::to_value(UserDto::from(user)).unwrap();

        assert_eq!(json["display_name"], "Anna");
        assert!(json.get("email").is_none());
        assert_eq!(json["phone_number"], "+4917612345678");
    }
}
