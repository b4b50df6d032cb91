//! List service: authorization, creation, reconciliation, sharing, deletion.
//!
//! Every public operation runs in one store transaction. Reads that decide
//! authorization happen inside the same transaction as the writes they
//! guard, and nothing is visible to other readers until the commit.
//!
//! Authorization failures are reported as [`ListError::NotFound`], the same
//! as a missing list, so callers cannot discover lists they cannot see.

use std::collections::BTreeMap;

use crate::error::ListError;
use crate::models::{names, GroceryList, ListId, User};
use crate::payload::{NewList, NewListSource, SaveList};
use crate::reconcile::{reconcile, DesiredItems};
use crate::store::{ItemPool, ListStore, Store, StoreTx, UserStore};

pub struct ListService<S> {
    store: S,
    prune_orphan_items: bool,
}

impl<S: Store> ListService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            prune_orphan_items: false,
        }
    }

    /// When enabled, pooled items left without any referencing list are
    /// deleted in the same transaction as the save or removal that
    /// orphaned them.
    pub fn with_orphan_pruning(mut self, enabled: bool) -> Self {
        self.prune_orphan_items = enabled;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Names of every list `username` owns or has been given access to.
    pub async fn owned_and_shared_list_names(
        &self,
        username: &str,
    ) -> Result<BTreeMap<ListId, String>, ListError> {
        let mut tx = self.store.begin().await?;
        let user = resolve_user(&mut tx, username).await?;

        let mut names = tx.owned_list_names(&user.username).await?;
        names.extend(tx.shared_list_names(&user.username).await?);
        Ok(names)
    }

    pub async fn list_by_id(&self, id: ListId, username: &str) -> Result<GroceryList, ListError> {
        let mut tx = self.store.begin().await?;
        let user = resolve_user(&mut tx, username).await?;

        match tx.get_list(id).await? {
            Some(list) if list.is_visible_to(&user.username) => Ok(list),
            _ => Err(ListError::list_not_found(id)),
        }
    }

    /// Creates an empty, unshared list. `is_template` cannot change later.
    pub async fn create_list(
        &self,
        name: &str,
        username: &str,
        is_template: bool,
    ) -> Result<GroceryList, ListError> {
        let name = names::list_name(name)?;

        let mut tx = self.store.begin_write().await?;
        let user = resolve_user(&mut tx, username).await?;

        let list = GroceryList::new(&name, user.username, is_template)?;
        tx.insert_list(&list).await?;
        tx.commit().await?;

        tracing::info!(
            list_id = %list.id(),
            owner = list.owner(),
            is_template,
            "Created list"
        );
        Ok(list)
    }

    /// Creates a plain list holding the same pooled items as one of the
    /// caller's templates.
    pub async fn create_list_from_template(
        &self,
        name: &str,
        username: &str,
        template_id: ListId,
    ) -> Result<GroceryList, ListError> {
        let name = names::list_name(name)?;

        let mut tx = self.store.begin_write().await?;
        let user = resolve_user(&mut tx, username).await?;
        let template = owned_list(&mut tx, template_id, &user.username).await?;
        if !template.is_template() {
            return Err(ListError::Conflict(format!(
                "list {} is not a template",
                template_id
            )));
        }

        let list = GroceryList::from_template(&template, &name)?;
        tx.insert_list(&list).await?;
        tx.commit().await?;

        tracing::info!(
            list_id = %list.id(),
            template_id = %template_id,
            items = list.len(),
            "Created list from template"
        );
        Ok(list)
    }

    /// Dispatches a validated create request.
    pub async fn create(&self, request: NewList, username: &str) -> Result<GroceryList, ListError> {
        match request.source {
            NewListSource::Empty { is_template } => {
                self.create_list(&request.name, username, is_template).await
            }
            NewListSource::Template(template_id) => {
                self.create_list_from_template(&request.name, username, template_id)
                    .await
            }
        }
    }

    /// Brings the stored list in line with a submitted one: reconciles the
    /// item set and applies a rename. All of it commits together.
    pub async fn save_list(
        &self,
        submitted: SaveList,
        username: &str,
    ) -> Result<GroceryList, ListError> {
        let SaveList { id, name, items } = submitted;

        let mut tx = self.store.begin_write().await?;
        let user = resolve_user(&mut tx, username).await?;
        let mut list = owned_list(&mut tx, id, &user.username).await?;

        let applied = reconcile(&mut tx, &mut list, &items).await?;
        let renamed = match name.as_deref() {
            Some(name) if !name.trim().is_empty() => list.rename(name)?,
            _ => false,
        };

        if renamed || !applied.is_empty() {
            list.touch();
            tx.update_list(&list).await?;
        }

        let pruned = if self.prune_orphan_items && !applied.detach.is_empty() {
            tx.prune_orphans().await?
        } else {
            0
        };

        tx.commit().await?;

        tracing::info!(
            list_id = %id,
            attached = applied.attach.len(),
            detached = applied.detach.len(),
            renamed,
            pruned,
            "Saved list"
        );
        Ok(list)
    }

    /// Convenience wrapper around [`ListService::save_list`] for callers
    /// holding raw names.
    pub async fn save_items<I, T>(
        &self,
        id: ListId,
        items: I,
        username: &str,
    ) -> Result<GroceryList, ListError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let submitted = SaveList {
            id,
            name: None,
            items: DesiredItems::parse(items)?,
        };
        self.save_list(submitted, username).await
    }

    pub async fn remove_list(&self, id: ListId, username: &str) -> Result<(), ListError> {
        let mut tx = self.store.begin_write().await?;
        let user = resolve_user(&mut tx, username).await?;
        let list = owned_list(&mut tx, id, &user.username).await?;

        tx.delete_list(list.id()).await?;
        let pruned = if self.prune_orphan_items && !list.is_empty() {
            tx.prune_orphans().await?
        } else {
            0
        };
        tx.commit().await?;

        tracing::info!(list_id = %id, items = list.len(), pruned, "Removed list");
        Ok(())
    }

    /// Grants `target` access to the list. Sharing twice is a no-op.
    pub async fn share_list(
        &self,
        id: ListId,
        username: &str,
        target: &str,
    ) -> Result<(), ListError> {
        let mut tx = self.store.begin_write().await?;
        let (mut list, target) = share_target(&mut tx, id, username, target).await?;

        if list.add_shared_user(&target.username)? {
            tx.add_share(list.id(), &target.username).await?;
            tx.commit().await?;
            tracing::info!(list_id = %id, user = %target.username, "Shared list");
        }
        Ok(())
    }

    /// Revokes `target`'s access. Unsharing a user who has no access is a
    /// no-op.
    pub async fn unshare_list(
        &self,
        id: ListId,
        username: &str,
        target: &str,
    ) -> Result<(), ListError> {
        let mut tx = self.store.begin_write().await?;
        let (mut list, target) = share_target(&mut tx, id, username, target).await?;

        if list.remove_shared_user(&target.username) {
            tx.remove_share(list.id(), &target.username).await?;
            tx.commit().await?;
            tracing::info!(list_id = %id, user = %target.username, "Unshared list");
        }
        Ok(())
    }
}

async fn resolve_user<T: UserStore>(tx: &mut T, username: &str) -> Result<User, ListError> {
    tx.find_user(username)
        .await?
        .ok_or_else(|| ListError::user_not_found(username))
}

/// Loads a list the user owns. Lists owned by someone else are reported as
/// missing.
async fn owned_list<T: ListStore>(
    tx: &mut T,
    id: ListId,
    username: &str,
) -> Result<GroceryList, ListError> {
    match tx.get_list(id).await? {
        Some(list) if list.is_owned_by(username) => Ok(list),
        _ => Err(ListError::list_not_found(id)),
    }
}

async fn share_target<T: StoreTx>(
    tx: &mut T,
    id: ListId,
    username: &str,
    target: &str,
) -> Result<(GroceryList, User), ListError> {
    let user = resolve_user(tx, username).await?;
    let list = owned_list(tx, id, &user.username).await?;

    if list.is_owned_by(target) {
        return Err(ListError::InvalidParameter(
            "a list cannot be shared with its owner".to_string(),
        ));
    }
    let target = resolve_user(tx, target).await?;
    Ok((list, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GroceryItem, ItemId, ItemName, PooledItem};
    use crate::store::{MemoryStore, MemoryTx, StoreError};
    use async_trait::async_trait;

    async fn service_with_users(usernames: &[&str]) -> ListService<MemoryStore> {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        for username in usernames {
            tx.insert_user(&User::new(username, "").unwrap())
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();
        ListService::new(store)
    }

    fn item_names(list: &GroceryList) -> Vec<&str> {
        list.item_names().map(ItemName::as_str).collect()
    }

    #[tokio::test]
    async fn test_create_list_is_empty_and_unshared() {
        let service = service_with_users(&["alice"]).await;

        let list = service.create_list("Weekly", "alice", false).await.unwrap();
        assert_eq!(list.name(), "Weekly");
        assert_eq!(list.owner(), "alice");
        assert!(list.is_empty());
        assert!(!list.is_template());
        assert_eq!(list.shared_users().count(), 0);

        let fetched = service.list_by_id(list.id(), "alice").await.unwrap();
        assert_eq!(fetched.name(), "Weekly");
    }

    #[tokio::test]
    async fn test_create_list_unknown_user() {
        let service = service_with_users(&[]).await;
        let result = service.create_list("Weekly", "ghost", false).await;
        assert!(matches!(result, Err(ListError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_list_blank_name() {
        let service = service_with_users(&["alice"]).await;
        let result = service.create_list("  ", "alice", false).await;
        assert!(matches!(result, Err(ListError::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn test_save_list_round_trip() {
        let service = service_with_users(&["alice"]).await;
        let list = service.create_list("Weekly", "alice", false).await.unwrap();

        let saved = service
            .save_items(list.id(), ["Bread", "Milk"], "alice")
            .await
            .unwrap();
        assert_eq!(item_names(&saved), vec!["Bread", "Milk"]);
        let milk = saved.item("Milk").unwrap().clone();

        let saved = service
            .save_items(list.id(), ["Milk", "Eggs"], "alice")
            .await
            .unwrap();
        assert_eq!(item_names(&saved), vec!["Eggs", "Milk"]);
        assert!(saved.item("Milk").unwrap().is_same_item(&milk));

        let stored = service.list_by_id(list.id(), "alice").await.unwrap();
        assert_eq!(item_names(&stored), vec!["Eggs", "Milk"]);
        assert!(stored.item("Milk").unwrap().is_same_item(&milk));
    }

    #[tokio::test]
    async fn test_save_list_is_idempotent() {
        let service = service_with_users(&["alice"]).await;
        let list = service.create_list("Weekly", "alice", false).await.unwrap();

        let first = service
            .save_items(list.id(), ["Milk", "Eggs"], "alice")
            .await
            .unwrap();
        let second = service
            .save_items(list.id(), ["Eggs", "Milk", "Milk"], "alice")
            .await
            .unwrap();

        assert_eq!(item_names(&first), item_names(&second));
        for item in first.items() {
            assert!(second.item(item.name.as_str()).unwrap().is_same_item(item));
        }
    }

    #[tokio::test]
    async fn test_same_name_shares_pooled_item_across_lists() {
        let service = service_with_users(&["alice", "bob"]).await;
        let alices = service.create_list("A", "alice", false).await.unwrap();
        let bobs = service.create_list("B", "bob", false).await.unwrap();

        let alices = service
            .save_items(alices.id(), ["Milk"], "alice")
            .await
            .unwrap();
        let bobs = service.save_items(bobs.id(), ["Milk"], "bob").await.unwrap();

        assert!(alices
            .item("Milk")
            .unwrap()
            .is_same_item(bobs.item("Milk").unwrap()));
    }

    #[tokio::test]
    async fn test_save_list_rename_and_blank_name() {
        let service = service_with_users(&["alice"]).await;
        let list = service.create_list("Weekly", "alice", false).await.unwrap();

        let renamed = service
            .save_list(
                SaveList {
                    id: list.id(),
                    name: Some("Party".to_string()),
                    items: DesiredItems::default(),
                },
                "alice",
            )
            .await
            .unwrap();
        assert_eq!(renamed.name(), "Party");

        let unchanged = service
            .save_list(
                SaveList {
                    id: list.id(),
                    name: Some("   ".to_string()),
                    items: DesiredItems::default(),
                },
                "alice",
            )
            .await
            .unwrap();
        assert_eq!(unchanged.name(), "Party");
    }

    #[tokio::test]
    async fn test_save_list_requires_ownership() {
        let service = service_with_users(&["alice", "bob"]).await;
        let list = service.create_list("Weekly", "alice", false).await.unwrap();
        service.share_list(list.id(), "alice", "bob").await.unwrap();

        let result = service.save_items(list.id(), ["Milk"], "bob").await;
        assert!(matches!(result, Err(ListError::NotFound(_))));

        let stored = service.list_by_id(list.id(), "alice").await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_save_list_unknown_id() {
        let service = service_with_users(&["alice"]).await;
        let result = service
            .save_items(uuid::Uuid::new_v4(), ["Milk"], "alice")
            .await;
        assert!(matches!(result, Err(ListError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_save_list_blank_item_mutates_nothing() {
        let service = service_with_users(&["alice"]).await;
        let list = service.create_list("Weekly", "alice", false).await.unwrap();
        service
            .save_items(list.id(), ["Bread"], "alice")
            .await
            .unwrap();

        let result = service
            .save_items(list.id(), ["Milk", " "], "alice")
            .await;
        assert!(matches!(result, Err(ListError::InvalidParameter(_))));

        let stored = service.list_by_id(list.id(), "alice").await.unwrap();
        assert_eq!(item_names(&stored), vec!["Bread"]);
    }

    #[tokio::test]
    async fn test_template_clone() {
        let service = service_with_users(&["alice"]).await;
        let template = service.create_list("Basics", "alice", true).await.unwrap();
        let template = service
            .save_items(template.id(), ["Bread"], "alice")
            .await
            .unwrap();

        let copy = service
            .create_list_from_template("L2", "alice", template.id())
            .await
            .unwrap();
        assert!(!copy.is_template());
        assert_eq!(item_names(&copy), vec!["Bread"]);
        assert!(copy
            .item("Bread")
            .unwrap()
            .is_same_item(template.item("Bread").unwrap()));

        service
            .save_items(copy.id(), Vec::<String>::new(), "alice")
            .await
            .unwrap();
        let template = service.list_by_id(template.id(), "alice").await.unwrap();
        assert_eq!(item_names(&template), vec!["Bread"]);
        let copy = service.list_by_id(copy.id(), "alice").await.unwrap();
        assert!(copy.is_empty());
    }

    #[tokio::test]
    async fn test_template_clone_requires_owned_template() {
        let service = service_with_users(&["alice", "bob"]).await;
        let template = service.create_list("Basics", "alice", true).await.unwrap();
        service
            .share_list(template.id(), "alice", "bob")
            .await
            .unwrap();

        let result = service
            .create_list_from_template("Mine", "bob", template.id())
            .await;
        assert!(matches!(result, Err(ListError::NotFound(_))));

        let result = service
            .create_list_from_template("Mine", "alice", uuid::Uuid::new_v4())
            .await;
        assert!(matches!(result, Err(ListError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_template_clone_from_plain_list_conflicts() {
        let service = service_with_users(&["alice"]).await;
        let plain = service.create_list("Weekly", "alice", false).await.unwrap();

        let result = service
            .create_list_from_template("Copy", "alice", plain.id())
            .await;
        assert!(matches!(result, Err(ListError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unrelated_user_gets_not_found() {
        let service = service_with_users(&["alice", "mallory"]).await;
        let list = service.create_list("Weekly", "alice", false).await.unwrap();

        let result = service.list_by_id(list.id(), "mallory").await;
        assert!(matches!(result, Err(ListError::NotFound(_))));

        assert_eq!(
            result.unwrap_err().to_string(),
            format!("Not found: list {}", list.id())
        );

        let missing_id = uuid::Uuid::new_v4();
        let missing = service.list_by_id(missing_id, "mallory").await;
        assert_eq!(
            missing.unwrap_err().to_string(),
            format!("Not found: list {}", missing_id)
        );
    }

    #[tokio::test]
    async fn test_shared_user_can_read() {
        let service = service_with_users(&["alice", "bob"]).await;
        let list = service.create_list("Weekly", "alice", false).await.unwrap();
        service.share_list(list.id(), "alice", "bob").await.unwrap();

        let seen = service.list_by_id(list.id(), "bob").await.unwrap();
        assert_eq!(seen.shared_users().collect::<Vec<_>>(), vec!["bob"]);
    }

    #[tokio::test]
    async fn test_share_is_idempotent() {
        let service = service_with_users(&["alice", "bob"]).await;
        let list = service.create_list("Weekly", "alice", false).await.unwrap();

        service.share_list(list.id(), "alice", "bob").await.unwrap();
        service.share_list(list.id(), "alice", "bob").await.unwrap();

        let stored = service.list_by_id(list.id(), "alice").await.unwrap();
        assert_eq!(stored.shared_users().collect::<Vec<_>>(), vec!["bob"]);
    }

    #[tokio::test]
    async fn test_unshare_is_idempotent() {
        let service = service_with_users(&["alice", "bob"]).await;
        let list = service.create_list("Weekly", "alice", false).await.unwrap();
        service.share_list(list.id(), "alice", "bob").await.unwrap();

        service.unshare_list(list.id(), "alice", "bob").await.unwrap();
        service.unshare_list(list.id(), "alice", "bob").await.unwrap();

        let result = service.list_by_id(list.id(), "bob").await;
        assert!(matches!(result, Err(ListError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_share_with_owner_rejected() {
        let service = service_with_users(&["alice"]).await;
        let list = service.create_list("Weekly", "alice", false).await.unwrap();

        let result = service.share_list(list.id(), "alice", "alice").await;
        assert!(matches!(result, Err(ListError::InvalidParameter(_))));

        let stored = service.list_by_id(list.id(), "alice").await.unwrap();
        assert_eq!(stored.shared_users().count(), 0);
    }

    #[tokio::test]
    async fn test_share_with_unknown_user() {
        let service = service_with_users(&["alice"]).await;
        let list = service.create_list("Weekly", "alice", false).await.unwrap();

        let result = service.share_list(list.id(), "alice", "ghost").await;
        assert!(matches!(result, Err(ListError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_share_requires_ownership() {
        let service = service_with_users(&["alice", "bob", "carol"]).await;
        let list = service.create_list("Weekly", "alice", false).await.unwrap();
        service.share_list(list.id(), "alice", "bob").await.unwrap();

        let result = service.share_list(list.id(), "bob", "carol").await;
        assert!(matches!(result, Err(ListError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_owned_and_shared_list_names() {
        let service = service_with_users(&["alice", "bob"]).await;
        let mine = service.create_list("Mine", "bob", false).await.unwrap();
        let theirs = service.create_list("Theirs", "alice", false).await.unwrap();
        let hidden = service.create_list("Hidden", "alice", false).await.unwrap();
        service
            .share_list(theirs.id(), "alice", "bob")
            .await
            .unwrap();

        let names = service.owned_and_shared_list_names("bob").await.unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names.get(&mine.id()).map(String::as_str), Some("Mine"));
        assert_eq!(names.get(&theirs.id()).map(String::as_str), Some("Theirs"));
        assert!(!names.contains_key(&hidden.id()));

        let result = service.owned_and_shared_list_names("ghost").await;
        assert!(matches!(result, Err(ListError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_list() {
        let service = service_with_users(&["alice", "bob"]).await;
        let list = service.create_list("Weekly", "alice", false).await.unwrap();
        service
            .save_items(list.id(), ["Milk"], "alice")
            .await
            .unwrap();
        service.share_list(list.id(), "alice", "bob").await.unwrap();

        let result = service.remove_list(list.id(), "bob").await;
        assert!(matches!(result, Err(ListError::NotFound(_))));

        service.remove_list(list.id(), "alice").await.unwrap();
        let result = service.list_by_id(list.id(), "alice").await;
        assert!(matches!(result, Err(ListError::NotFound(_))));
        assert!(service
            .owned_and_shared_list_names("bob")
            .await
            .unwrap()
            .is_empty());

        // Terminal: a second removal finds nothing.
        let result = service.remove_list(list.id(), "alice").await;
        assert!(matches!(result, Err(ListError::NotFound(_))));

        // Without pruning the detached item stays pooled.
        let mut tx = service.store().begin().await.unwrap();
        assert!(tx.resolve_existing("Milk").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_orphan_pruning() {
        let service = service_with_users(&["alice"])
            .await
            .with_orphan_pruning(true);
        let first = service.create_list("A", "alice", false).await.unwrap();
        let second = service.create_list("B", "alice", false).await.unwrap();
        service
            .save_items(first.id(), ["Milk", "Bread"], "alice")
            .await
            .unwrap();
        service
            .save_items(second.id(), ["Milk"], "alice")
            .await
            .unwrap();

        service
            .save_items(first.id(), ["Milk"], "alice")
            .await
            .unwrap();
        {
            let mut tx = service.store().begin().await.unwrap();
            assert!(tx.resolve_existing("Bread").await.unwrap().is_none());
            assert!(tx.resolve_existing("Milk").await.unwrap().is_some());
        }

        service.remove_list(first.id(), "alice").await.unwrap();
        {
            let mut tx = service.store().begin().await.unwrap();
            assert!(tx.resolve_existing("Milk").await.unwrap().is_some());
        }

        service.remove_list(second.id(), "alice").await.unwrap();
        let mut tx = service.store().begin().await.unwrap();
        assert!(tx.resolve_existing("Milk").await.unwrap().is_none());
    }

    /// Store whose transactions fail every `attach_item` call.
    struct AttachFailingStore(MemoryStore);

    struct AttachFailingTx(MemoryTx);

    #[async_trait]
    impl Store for AttachFailingStore {
        type Tx = AttachFailingTx;

        async fn begin(&self) -> Result<AttachFailingTx, StoreError> {
            Ok(AttachFailingTx(self.0.begin().await?))
        }
    }

    #[async_trait]
    impl StoreTx for AttachFailingTx {
        async fn commit(self) -> Result<(), StoreError> {
            self.0.commit().await
        }
    }

    #[async_trait]
    impl ItemPool for AttachFailingTx {
        async fn find_or_create(&mut self, name: &ItemName) -> Result<GroceryItem, StoreError> {
            self.0.find_or_create(name).await
        }

        async fn resolve_existing(
            &mut self,
            name: &str,
        ) -> Result<Option<GroceryItem>, StoreError> {
            self.0.resolve_existing(name).await
        }

        async fn prune_orphans(&mut self) -> Result<u64, StoreError> {
            self.0.prune_orphans().await
        }

        async fn pooled_items(&mut self) -> Result<Vec<PooledItem>, StoreError> {
            self.0.pooled_items().await
        }
    }

    #[async_trait]
    impl ListStore for AttachFailingTx {
        async fn get_list(&mut self, id: ListId) -> Result<Option<GroceryList>, StoreError> {
            self.0.get_list(id).await
        }

        async fn insert_list(&mut self, list: &GroceryList) -> Result<(), StoreError> {
            self.0.insert_list(list).await
        }

        async fn update_list(&mut self, list: &GroceryList) -> Result<(), StoreError> {
            self.0.update_list(list).await
        }

        async fn attach_item(&mut self, _: ListId, _: ItemId) -> Result<(), StoreError> {
            Err(StoreError::Database("disk I/O error".to_string()))
        }

        async fn detach_item(
            &mut self,
            list_id: ListId,
            item_id: ItemId,
        ) -> Result<(), StoreError> {
            self.0.detach_item(list_id, item_id).await
        }

        async fn add_share(&mut self, list_id: ListId, username: &str) -> Result<(), StoreError> {
            self.0.add_share(list_id, username).await
        }

        async fn remove_share(
            &mut self,
            list_id: ListId,
            username: &str,
        ) -> Result<(), StoreError> {
            self.0.remove_share(list_id, username).await
        }

        async fn delete_list(&mut self, id: ListId) -> Result<(), StoreError> {
            self.0.delete_list(id).await
        }

        async fn owned_list_names(
            &mut self,
            username: &str,
        ) -> Result<BTreeMap<ListId, String>, StoreError> {
            self.0.owned_list_names(username).await
        }

        async fn shared_list_names(
            &mut self,
            username: &str,
        ) -> Result<BTreeMap<ListId, String>, StoreError> {
            self.0.shared_list_names(username).await
        }

        async fn lists_referencing(&mut self, item_id: ItemId) -> Result<Vec<ListId>, StoreError> {
            self.0.lists_referencing(item_id).await
        }
    }

    #[async_trait]
    impl UserStore for AttachFailingTx {
        async fn find_user(&mut self, username: &str) -> Result<Option<User>, StoreError> {
            self.0.find_user(username).await
        }

        async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
            self.0.insert_user(user).await
        }

        async fn users(&mut self) -> Result<Vec<User>, StoreError> {
            self.0.users().await
        }

        async fn delete_user(&mut self, username: &str) -> Result<bool, StoreError> {
            self.0.delete_user(username).await
        }
    }

    #[tokio::test]
    async fn test_failed_attach_rolls_back_whole_save() {
        let service = service_with_users(&["alice"]).await;
        let list = service.create_list("Weekly", "alice", false).await.unwrap();
        service
            .save_items(list.id(), ["Bread", "Milk"], "alice")
            .await
            .unwrap();

        let failing = ListService::new(AttachFailingStore(service.store().clone()));
        let result = failing.save_items(list.id(), ["Eggs"], "alice").await;
        assert!(matches!(result, Err(ListError::Storage(_))));

        // The detaches that ran before the failure are gone too.
        let stored = service.list_by_id(list.id(), "alice").await.unwrap();
        assert_eq!(item_names(&stored), vec!["Bread", "Milk"]);

        let mut tx = service.store().begin().await.unwrap();
        assert!(tx.resolve_existing("Eggs").await.unwrap().is_none());
    }
}
