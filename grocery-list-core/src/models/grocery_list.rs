//! The grocery list aggregate.
//!
//! A list is the consistency boundary for its item set and its share set.
//! All mutation goes through methods on [`GroceryList`] so that:
//! - the owner is set once and never changes,
//! - the owner is never in the shared set,
//! - the item set never holds two items with the same name.
//!
//! The reverse direction (which lists reference an item, which lists are
//! shared with a user) is derived by the stores from the list side and is
//! never mutated on its own.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::item::GroceryItem;
use super::names::{self, ItemName, NameError};

pub type ListId = Uuid;

/// Violations of the list aggregate's invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("'{0}' owns this list and cannot be added as a shared user")]
    OwnerShared(String),

    #[error("list already holds an item named '{0}'")]
    DuplicateItem(String),

    #[error(transparent)]
    Name(#[from] NameError),
}

/// Stored scalar fields of a list, used by stores to rebuild the aggregate.
#[derive(Debug, Clone)]
pub struct ListRecord {
    pub id: ListId,
    pub name: String,
    pub owner: String,
    pub is_template: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroceryList {
    id: ListId,
    name: String,
    owner: String,
    items: BTreeMap<ItemName, GroceryItem>,
    shared_users: BTreeSet<String>,
    is_template: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GroceryList {
    /// Creates an empty, unshared list owned by `owner`.
    pub fn new(name: &str, owner: impl Into<String>, is_template: bool) -> Result<Self, NameError> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: names::list_name(name)?,
            owner: owner.into(),
            items: BTreeMap::new(),
            shared_users: BTreeSet::new(),
            is_template,
            created_at: now,
            updated_at: now,
        })
    }

    /// Creates a plain list owned by the template's owner whose items are the
    /// template's pooled items at this instant. Shares are not copied.
    pub fn from_template(template: &GroceryList, name: &str) -> Result<Self, NameError> {
        let mut list = Self::new(name, template.owner.clone(), false)?;
        list.items = template.items.clone();
        Ok(list)
    }

    /// Rebuilds a list from stored data, re-checking the invariants.
    pub fn from_record(
        record: ListRecord,
        items: impl IntoIterator<Item = GroceryItem>,
        shared_users: impl IntoIterator<Item = String>,
    ) -> Result<Self, InvariantError> {
        let mut list = Self {
            id: record.id,
            name: names::list_name(&record.name)?,
            owner: record.owner,
            items: BTreeMap::new(),
            shared_users: BTreeSet::new(),
            is_template: record.is_template,
            created_at: record.created_at,
            updated_at: record.updated_at,
        };

        for item in items {
            if list.items.contains_key(&item.name) {
                return Err(InvariantError::DuplicateItem(item.name.to_string()));
            }
            list.items.insert(item.name.clone(), item);
        }
        for username in shared_users {
            list.add_shared_user(&username)?;
        }

        Ok(list)
    }

    pub fn id(&self) -> ListId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_template(&self) -> bool {
        self.is_template
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_owned_by(&self, username: &str) -> bool {
        self.owner == username
    }

    /// True if `username` owns the list or has it shared with them.
    pub fn is_visible_to(&self, username: &str) -> bool {
        self.is_owned_by(username) || self.shared_users.contains(username)
    }

    /// Items ordered by name.
    pub fn items(&self) -> impl Iterator<Item = &GroceryItem> {
        self.items.values()
    }

    pub fn item_names(&self) -> impl Iterator<Item = &ItemName> {
        self.items.keys()
    }

    pub fn item(&self, name: &str) -> Option<&GroceryItem> {
        self.items.get(name)
    }

    pub fn contains_item(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn shared_users(&self) -> impl Iterator<Item = &str> {
        self.shared_users.iter().map(String::as_str)
    }

    pub fn is_shared_with(&self, username: &str) -> bool {
        self.shared_users.contains(username)
    }

    /// Attaches a pooled item. Returns false if an item with that name is
    /// already attached; the attached item is kept as is.
    pub fn add_item(&mut self, item: GroceryItem) -> bool {
        if self.items.contains_key(&item.name) {
            return false;
        }
        self.items.insert(item.name.clone(), item);
        true
    }

    /// Detaches the item with the given name, returning it.
    pub fn remove_item(&mut self, name: &str) -> Option<GroceryItem> {
        self.items.remove(name)
    }

    /// Renames the list. Returns whether the name changed.
    pub fn rename(&mut self, name: &str) -> Result<bool, NameError> {
        let name = names::list_name(name)?;
        if name == self.name {
            return Ok(false);
        }
        self.name = name;
        Ok(true)
    }

    /// Grants `username` access. Returns false if already shared.
    pub fn add_shared_user(&mut self, username: &str) -> Result<bool, InvariantError> {
        if self.is_owned_by(username) {
            return Err(InvariantError::OwnerShared(username.to_string()));
        }
        Ok(self.shared_users.insert(username.to_string()))
    }

    /// Revokes access. Returns false if the user was not shared.
    pub fn remove_shared_user(&mut self, username: &str) -> bool {
        self.shared_users.remove(username)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for GroceryList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = if self.is_template {
            format!("{} (template)", self.name)
        } else {
            self.name.clone()
        };
        writeln!(f, "{}", title)?;
        writeln!(f, "{}", "=".repeat(title.chars().count()))?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Owner: {}", self.owner)?;

        if !self.shared_users.is_empty() {
            let shared: Vec<&str> = self.shared_users().collect();
            writeln!(f, "Shared with: {}", shared.join(", "))?;
        }

        if !self.items.is_empty() {
            writeln!(f, "\nItems:")?;
            for item in self.items() {
                writeln!(f, "  - {}", item.name)?;
            }
        }

        Ok(())
    }
}
