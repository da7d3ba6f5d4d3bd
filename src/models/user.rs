use serde::{Deserialize, Serialize};

use crate::domain::UserId;

/// Signed-in identity as seen by the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub created_at: String,
}

impl User {
    /// The identity the local adapter runs as until someone signs in.
    #[must_use]
    pub fn demo() -> Self {
        Self {
            id: UserId::new("1"),
            email: "default@user.com".to_string(),
            name: "Default User".to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// The fixed identity rendered by the shell.
    #[must_use]
    pub fn guest() -> Self {
        Self {
            id: UserId::new("guest"),
            email: String::new(),
            name: "Guest User".to_string(),
            created_at: String::new(),
        }
    }
}

/// Display name derived from an email address.
#[must_use]
pub fn name_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .filter(|prefix| !prefix.is_empty())
        .unwrap_or("User")
        .to_string()
}

/// Account record persisted by the local auth adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAccount {
    #[serde(flatten)]
    pub user: User,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_email_prefix() {
        assert_eq!(name_from_email("rin@example.com"), "rin");
        assert_eq!(name_from_email("@example.com"), "User");
    }

    #[test]
    fn stored_account_flattens_user_fields() {
        let account = StoredAccount {
            user: User {
                id: UserId::new("42"),
                email: "a@b.c".to_string(),
                name: "a".to_string(),
                created_at: "2024-01-01T00:00:00Z".to_string(),
            },
            password_hash: "hash".to_string(),
        };
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["email"], "a@b.c");
        assert_eq!(json["password_hash"], "hash");
    }
}
