use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::names::{self, NameError};

/// A user who can own lists and be granted access to other users' lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    /// Unique login name; the key used everywhere ownership and sharing is
    /// expressed.
    pub username: String,
    /// Display name.
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: &str, name: impl Into<String>) -> Result<Self, NameError> {
        Ok(Self {
            id: Uuid::new_v4(),
            username: names::username(username)?,
            name: name.into(),
            created_at: Utc::now(),
        })
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.username)
        } else {
            write!(f, "{} ({})", self.username, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new("alice", "Alice").unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.name, "Alice");
        assert_eq!(user.to_string(), "alice (Alice)");
    }

    #[test]
    fn test_user_new_rejects_bad_username() {
        assert!(User::new("", "Nobody").is_err());
        assert!(User::new("two words", "Bad").is_err());
    }
}
