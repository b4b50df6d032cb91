//! In-memory store.
//!
//! Transactions run one at a time: `begin` waits for the previous
//! transaction to finish. A transaction works on a private copy of the state
//! and publishes it on commit, so uncommitted writes are never visible to
//! other readers.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{ItemPool, ListStore, Store, StoreError, StoreTx, UserStore};
use crate::models::{
    GroceryItem, GroceryList, ItemId, ItemName, ListId, ListRecord, PooledItem, User,
};

#[derive(Debug, Clone)]
struct StoredList {
    record: ListRecord,
    items: BTreeSet<ItemId>,
    shared: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<String, User>,
    items: BTreeMap<ItemId, GroceryItem>,
    /// Name index of `items`, ordered by name.
    item_names: BTreeMap<String, ItemId>,
    lists: BTreeMap<ListId, StoredList>,
}

impl MemoryState {
    fn hydrate(&self, stored: &StoredList) -> Result<GroceryList, StoreError> {
        let items = stored
            .items
            .iter()
            .map(|id| {
                self.items
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::Corrupt(format!("dangling item reference {}", id)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        GroceryList::from_record(stored.record.clone(), items, stored.shared.iter().cloned())
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    fn list_mut(&mut self, id: ListId) -> Result<&mut StoredList, StoreError> {
        self.lists
            .get_mut(&id)
            .ok_or_else(|| StoreError::Missing(format!("list {}", id)))
    }

    fn names_where(&self, pred: impl Fn(&StoredList) -> bool) -> BTreeMap<ListId, String> {
        self.lists
            .values()
            .filter(|l| pred(l))
            .map(|l| (l.record.id, l.record.name.clone()))
            .collect()
    }

    fn reference_count(&self, item_id: ItemId) -> u64 {
        self.lists
            .values()
            .filter(|l| l.items.contains(&item_id))
            .count() as u64
    }
}

/// Thread-safe in-memory store. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx { guard, working })
    }
}

/// A transaction over a [`MemoryStore`]. Holds the store's lock until it is
/// committed or dropped.
#[derive(Debug)]
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(mut self) -> Result<(), StoreError> {
        *self.guard = self.working;
        Ok(())
    }
}

#[async_trait]
impl ItemPool for MemoryTx {
    async fn find_or_create(&mut self, name: &ItemName) -> Result<GroceryItem, StoreError> {
        if let Some(id) = self.working.item_names.get(name.as_str()) {
            if let Some(item) = self.working.items.get(id) {
                return Ok(item.clone());
            }
        }

        let item = GroceryItem::new(name.clone());
        self.working
            .item_names
            .insert(name.as_str().to_string(), item.id);
        self.working.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn resolve_existing(&mut self, name: &str) -> Result<Option<GroceryItem>, StoreError> {
        Ok(self
            .working
            .item_names
            .get(name)
            .and_then(|id| self.working.items.get(id))
            .cloned())
    }

    async fn prune_orphans(&mut self) -> Result<u64, StoreError> {
        let referenced: BTreeSet<ItemId> = self
            .working
            .lists
            .values()
            .flat_map(|l| l.items.iter().copied())
            .collect();

        let orphans: Vec<GroceryItem> = self
            .working
            .items
            .values()
            .filter(|item| !referenced.contains(&item.id))
            .cloned()
            .collect();

        for item in &orphans {
            self.working.items.remove(&item.id);
            self.working.item_names.remove(item.name.as_str());
        }

        Ok(orphans.len() as u64)
    }

    async fn pooled_items(&mut self) -> Result<Vec<PooledItem>, StoreError> {
        let state = &self.working;
        Ok(state
            .item_names
            .values()
            .filter_map(|id| state.items.get(id))
            .map(|item| PooledItem {
                item: item.clone(),
                references: state.reference_count(item.id),
            })
            .collect())
    }
}

#[async_trait]
impl ListStore for MemoryTx {
    async fn get_list(&mut self, id: ListId) -> Result<Option<GroceryList>, StoreError> {
        match self.working.lists.get(&id) {
            Some(stored) => self.working.hydrate(stored).map(Some),
            None => Ok(None),
        }
    }

    async fn insert_list(&mut self, list: &GroceryList) -> Result<(), StoreError> {
        if self.working.lists.contains_key(&list.id()) {
            return Err(StoreError::Duplicate(format!("list {}", list.id())));
        }
        if !self.working.users.contains_key(list.owner()) {
            return Err(StoreError::Missing(format!("user '{}'", list.owner())));
        }

        let mut items = BTreeSet::new();
        for item in list.items() {
            if !self.working.items.contains_key(&item.id) {
                return Err(StoreError::Missing(format!("item '{}'", item.name)));
            }
            items.insert(item.id);
        }

        let mut shared = BTreeSet::new();
        for username in list.shared_users() {
            if !self.working.users.contains_key(username) {
                return Err(StoreError::Missing(format!("user '{}'", username)));
            }
            shared.insert(username.to_string());
        }

        let record = ListRecord {
            id: list.id(),
            name: list.name().to_string(),
            owner: list.owner().to_string(),
            is_template: list.is_template(),
            created_at: list.created_at(),
            updated_at: list.updated_at(),
        };
        self.working.lists.insert(
            list.id(),
            StoredList {
                record,
                items,
                shared,
            },
        );
        Ok(())
    }

    async fn update_list(&mut self, list: &GroceryList) -> Result<(), StoreError> {
        let stored = self.working.list_mut(list.id())?;
        stored.record.name = list.name().to_string();
        stored.record.updated_at = list.updated_at();
        Ok(())
    }

    async fn attach_item(&mut self, list_id: ListId, item_id: ItemId) -> Result<(), StoreError> {
        if !self.working.items.contains_key(&item_id) {
            return Err(StoreError::Missing(format!("item {}", item_id)));
        }
        self.working.list_mut(list_id)?.items.insert(item_id);
        Ok(())
    }

    async fn detach_item(&mut self, list_id: ListId, item_id: ItemId) -> Result<(), StoreError> {
        self.working.list_mut(list_id)?.items.remove(&item_id);
        Ok(())
    }

    async fn add_share(&mut self, list_id: ListId, username: &str) -> Result<(), StoreError> {
        if !self.working.users.contains_key(username) {
            return Err(StoreError::Missing(format!("user '{}'", username)));
        }
        let stored = self.working.list_mut(list_id)?;
        if stored.record.owner == username {
            return Err(StoreError::Constraint(
                "list owner cannot be a shared user".to_string(),
            ));
        }
        stored.shared.insert(username.to_string());
        Ok(())
    }

    async fn remove_share(&mut self, list_id: ListId, username: &str) -> Result<(), StoreError> {
        self.working.list_mut(list_id)?.shared.remove(username);
        Ok(())
    }

    async fn delete_list(&mut self, id: ListId) -> Result<(), StoreError> {
        self.working.lists.remove(&id);
        Ok(())
    }

    async fn owned_list_names(
        &mut self,
        username: &str,
    ) -> Result<BTreeMap<ListId, String>, StoreError> {
        Ok(self.working.names_where(|l| l.record.owner == username))
    }

    async fn shared_list_names(
        &mut self,
        username: &str,
    ) -> Result<BTreeMap<ListId, String>, StoreError> {
        Ok(self.working.names_where(|l| l.shared.contains(username)))
    }

    async fn lists_referencing(&mut self, item_id: ItemId) -> Result<Vec<ListId>, StoreError> {
        Ok(self
            .working
            .lists
            .values()
            .filter(|l| l.items.contains(&item_id))
            .map(|l| l.record.id)
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryTx {
    async fn find_user(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.working.users.get(username).cloned())
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        if self.working.users.contains_key(&user.username) {
            return Err(StoreError::Duplicate(format!("user '{}'", user.username)));
        }
        self.working
            .users
            .insert(user.username.clone(), user.clone());
        Ok(())
    }

    async fn users(&mut self) -> Result<Vec<User>, StoreError> {
        Ok(self.working.users.values().cloned().collect())
    }

    async fn delete_user(&mut self, username: &str) -> Result<bool, StoreError> {
        if self.working.users.remove(username).is_none() {
            return Ok(false);
        }
        self.working.lists.retain(|_, l| l.record.owner != username);
        for list in self.working.lists.values_mut() {
            list.shared.remove(username);
        }
        Ok(true)
    }
}
