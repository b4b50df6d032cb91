//! Validated names.
//!
//! Item names are the identity key of the item pool, so every name that
//! reaches the pool goes through [`ItemName::parse`] first. Surrounding
//! whitespace is trimmed; comparison is case-sensitive.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

/// Errors produced while validating user-supplied names.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("{0} name must not be blank")]
    Blank(&'static str),

    #[error("Invalid username '{0}': must not contain whitespace or '/'")]
    InvalidUsername(String),
}

/// Name of a grocery item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemName(String);

impl ItemName {
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(NameError::Blank("item"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ItemName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ItemName> for String {
    fn from(name: ItemName) -> Self {
        name.0
    }
}

impl Borrow<str> for ItemName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ItemName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trims and validates a list name.
pub fn list_name(raw: &str) -> Result<String, NameError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NameError::Blank("list"));
    }
    Ok(trimmed.to_string())
}

/// Validates a username. Usernames appear in URL paths, so they may not
/// contain whitespace or slashes.
pub fn username(raw: &str) -> Result<String, NameError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NameError::Blank("user"));
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(NameError::InvalidUsername(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_name_trims() {
        let name = ItemName::parse("  Milk ").unwrap();
        assert_eq!(name.as_str(), "Milk");
    }

    #[test]
    fn test_item_name_rejects_blank() {
        assert_eq!(ItemName::parse(""), Err(NameError::Blank("item")));
        assert_eq!(ItemName::parse(" \t\n"), Err(NameError::Blank("item")));
    }

    #[test]
    fn test_item_name_is_case_sensitive() {
        let lower = ItemName::parse("milk").unwrap();
        let upper = ItemName::parse("Milk").unwrap();
        assert_ne!(lower, upper);
    }

    #[test]
    fn test_item_name_deserialize_validates() {
        let parsed: Result<ItemName, _> = serde_json::from_str("\"  \"");
        assert!(parsed.is_err());

        let parsed: ItemName = serde_json::from_str("\" Eggs\"").unwrap();
        assert_eq!(parsed.as_str(), "Eggs");
    }

    #[test]
    fn test_list_name() {
        assert_eq!(list_name(" Weekly ").unwrap(), "Weekly");
        assert_eq!(list_name("   "), Err(NameError::Blank("list")));
    }

    #[test]
    fn test_username() {
        assert_eq!(username("alice").unwrap(), "alice");
        assert!(matches!(
            username("bob smith"),
            Err(NameError::InvalidUsername(_))
        ));
        assert!(matches!(
            username("a/b"),
            Err(NameError::InvalidUsername(_))
        ));
        assert_eq!(username(""), Err(NameError::Blank("user")));
    }
}
