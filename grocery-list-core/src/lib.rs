//! Grocery Lists Core Library
//!
//! Lists, pooled items and users; item-set reconciliation; and the list
//! service that ties them together over an abstract transactional store.

pub mod error;
pub mod models;
pub mod payload;
pub mod reconcile;
pub mod service;
pub mod store;

pub use error::ListError;
pub use models::{
    GroceryItem, GroceryList, InvariantError, ItemId, ItemName, ListId, ListRecord, NameError,
    PooledItem, User,
};
pub use payload::{CreateListRequest, ListPayload, NewList, NewListSource, SaveList, SaveListRequest};
pub use reconcile::{DesiredItems, ReconcilePlan};
pub use service::ListService;
pub use store::{ItemPool, ListStore, MemoryStore, Store, StoreError, StoreTx, UserStore};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
