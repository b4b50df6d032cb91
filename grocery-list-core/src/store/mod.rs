//! Storage interfaces for users, lists and the item pool.
//!
//! A [`Store`] hands out transactions. Everything the list service reads or
//! writes for one request goes through a single [`StoreTx`], which is either
//! committed as a whole or dropped (rolled back).

mod memory;

pub use memory::{MemoryStore, MemoryTx};

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{GroceryItem, GroceryList, ItemId, ItemName, ListId, PooledItem, User};

/// Errors raised by storage backends.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Missing record: {0}")]
    Missing(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),
}

/// A source of transactions.
#[async_trait]
pub trait Store: Send + Sync {
    type Tx: StoreTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Begins a transaction that is going to write. Stores that distinguish
    /// read and write transactions take their write lock here.
    async fn begin_write(&self) -> Result<Self::Tx, StoreError> {
        self.begin().await
    }
}

/// A unit of work over all three stores.
///
/// Dropping a transaction without calling [`StoreTx::commit`] discards its
/// writes.
#[async_trait]
pub trait StoreTx: ItemPool + ListStore + UserStore + Send + Sized {
    async fn commit(self) -> Result<(), StoreError>;
}

/// The canonical set of grocery items, one record per name.
#[async_trait]
pub trait ItemPool: Send {
    /// Returns the pooled item with this name, creating it if needed.
    async fn find_or_create(&mut self, name: &ItemName) -> Result<GroceryItem, StoreError>;

    async fn resolve_existing(&mut self, name: &str) -> Result<Option<GroceryItem>, StoreError>;

    /// Deletes items no list references. Returns how many were removed.
    async fn prune_orphans(&mut self) -> Result<u64, StoreError>;

    /// All pooled items with their reference counts, ordered by name.
    async fn pooled_items(&mut self) -> Result<Vec<PooledItem>, StoreError>;
}

/// Lists and their item/share relations.
#[async_trait]
pub trait ListStore: Send {
    async fn get_list(&mut self, id: ListId) -> Result<Option<GroceryList>, StoreError>;

    /// Persists a new list along with its current items and shares.
    async fn insert_list(&mut self, list: &GroceryList) -> Result<(), StoreError>;

    /// Writes the mutable scalar fields (name, updated_at).
    async fn update_list(&mut self, list: &GroceryList) -> Result<(), StoreError>;

    async fn attach_item(&mut self, list_id: ListId, item_id: ItemId) -> Result<(), StoreError>;

    async fn detach_item(&mut self, list_id: ListId, item_id: ItemId) -> Result<(), StoreError>;

    async fn add_share(&mut self, list_id: ListId, username: &str) -> Result<(), StoreError>;

    async fn remove_share(&mut self, list_id: ListId, username: &str) -> Result<(), StoreError>;

    /// Deletes the list and every relation it takes part in. Pooled items
    /// are left in place.
    async fn delete_list(&mut self, id: ListId) -> Result<(), StoreError>;

    async fn owned_list_names(
        &mut self,
        username: &str,
    ) -> Result<BTreeMap<ListId, String>, StoreError>;

    async fn shared_list_names(
        &mut self,
        username: &str,
    ) -> Result<BTreeMap<ListId, String>, StoreError>;

    /// Reverse index of the list/item relation.
    async fn lists_referencing(&mut self, item_id: ItemId) -> Result<Vec<ListId>, StoreError>;
}

/// Registered users.
#[async_trait]
pub trait UserStore: Send {
    async fn find_user(&mut self, username: &str) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] if the username is taken.
    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError>;

    async fn users(&mut self) -> Result<Vec<User>, StoreError>;

    /// Deletes the user along with the lists they own. Returns false if no
    /// such user existed.
    async fn delete_user(&mut self, username: &str) -> Result<bool, StoreError>;
}
