//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A registered account. Users author blog posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    /// Inactive users can neither log in nor use existing tokens
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Unset until the record is first modified
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Build an unsaved user. The password must already be hashed with
    /// `services::password::hash_password`.
    pub fn new(username: String, email: String, password_hash: String, role: UserRole) -> Self {
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            password_hash,
            role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// User role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Editor,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Editor => write!(f, "editor"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "editor" => Ok(UserRole::Editor),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    /// Defaults to editor
    pub role: Option<UserRole>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_user_new() {
        let user = User::new(
            "ed".to_string(),
            "ed@example.com".to_string(),
            "hash".to_string(),
            UserRole::Editor,
        );

        assert_eq!(user.id, 0);
        assert!(user.is_active);
        assert!(user.updated_at.is_none());
        assert!(!user.is_admin());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new(
            "ed".to_string(),
            "ed@example.com".to_string(),
            "secret-hash".to_string(),
            UserRole::Admin,
        );
        let json = serde_json::to_string(&user).unwrap();

        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
        assert!(json.contains(r#""role":"admin""#));
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!(UserRole::from_str("admin").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::from_str("Editor").unwrap(), UserRole::Editor);
        assert!(UserRole::from_str("author").is_err());
        assert!(UserRole::from_str("").is_err());
    }

    #[test]
    fn test_user_role_default() {
        assert_eq!(UserRole::default(), UserRole::Editor);
    }

    proptest! {
        #[test]
        fn role_display_parses_back(admin in any::<bool>()) {
            let role = if admin { UserRole::Admin } else { UserRole::Editor };
            prop_assert_eq!(UserRole::from_str(&role.to_string()).unwrap(), role);
        }

        #[test]
        fn unknown_roles_rejected(s in "[a-z]{1,12}") {
            prop_assume!(s != "admin" && s != "editor");
            prop_assert!(UserRole::from_str(&s).is_err());
        }
    }
}
