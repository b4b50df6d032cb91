//! SQLite-backed store.
//!
//! Lists reference pooled items through the `list_items` join table and
//! users through `list_shares`. Each [`SqliteTx`] wraps one SQLite
//! transaction; dropping it without committing rolls back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::BTreeMap;
use uuid::Uuid;

use grocery_list_core::{
    GroceryItem, GroceryList, ItemId, ItemName, ItemPool, ListId, ListRecord, ListStore,
    PooledItem, Store, StoreError, StoreTx, User, UserStore,
};

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    type Tx = SqliteTx;

    async fn begin(&self) -> Result<SqliteTx, StoreError> {
        let tx = self.pool.begin().await.map_err(store_err)?;
        Ok(SqliteTx { tx })
    }

    // A deferred transaction that reads first and writes later can fail with
    // SQLITE_BUSY on upgrade; IMMEDIATE waits on busy_timeout instead.
    async fn begin_write(&self) -> Result<SqliteTx, StoreError> {
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(store_err)?;
        Ok(SqliteTx { tx })
    }
}

pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

// Row types for database queries
#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    name: String,
    created_at: String,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: String,
    name: String,
    created_at: String,
}

#[derive(sqlx::FromRow)]
struct PooledItemRow {
    id: String,
    name: String,
    created_at: String,
    refs: i64,
}

#[derive(sqlx::FromRow)]
struct ListRow {
    id: String,
    name: String,
    owner: String,
    is_template: bool,
    created_at: String,
    updated_at: String,
}

fn store_err(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::Missing(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.message().contains("cannot be a shared user") => {
            StoreError::Constraint(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.message().contains("immutable") => {
            StoreError::Constraint(db.message().to_string())
        }
        _ => {
            tracing::warn!("Database error: {}", e);
            StoreError::Database(e.to_string())
        }
    }
}

fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt(format!("bad id '{}': {}", raw, e)))
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{}': {}", raw, e)))
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: parse_id(&row.id)?,
            username: row.username,
            name: row.name,
            created_at: parse_time(&row.created_at)?,
        })
    }
}

fn hydrate_item(id: &str, name: &str, created_at: &str) -> Result<GroceryItem, StoreError> {
    Ok(GroceryItem {
        id: parse_id(id)?,
        name: ItemName::parse(name).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        created_at: parse_time(created_at)?,
    })
}

impl SqliteTx {
    async fn user_id(&mut self, username: &str) -> Result<String, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?;

        row.map(|r| r.0)
            .ok_or_else(|| StoreError::Missing(format!("user '{}'", username)))
    }

    async fn hydrate_list(&mut self, row: ListRow) -> Result<GroceryList, StoreError> {
        let items: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT i.id, i.name, i.created_at
            FROM list_items li
            JOIN grocery_items i ON i.id = li.item_id
            WHERE li.list_id = ?
            ORDER BY i.name
            "#,
        )
        .bind(&row.id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_err)?;

        let shared: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT u.username
            FROM list_shares s
            JOIN users u ON u.id = s.user_id
            WHERE s.list_id = ?
            ORDER BY u.username
            "#,
        )
        .bind(&row.id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_err)?;

        let items = items
            .iter()
            .map(|i| hydrate_item(&i.id, &i.name, &i.created_at))
            .collect::<Result<Vec<_>, _>>()?;

        let record = ListRecord {
            id: parse_id(&row.id)?,
            name: row.name,
            owner: row.owner,
            is_template: row.is_template,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
        };

        GroceryList::from_record(record, items, shared.into_iter().map(|s| s.0))
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    async fn list_names(
        &mut self,
        sql: &str,
        username: &str,
    ) -> Result<BTreeMap<ListId, String>, StoreError> {
        let rows: Vec<(String, String)> = sqlx::query_as(sql)
            .bind(username)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_err)?;

        rows.into_iter()
            .map(|(id, name)| Ok((parse_id(&id)?, name)))
            .collect()
    }
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(store_err)
    }
}

#[async_trait]
impl ItemPool for SqliteTx {
    async fn find_or_create(&mut self, name: &ItemName) -> Result<GroceryItem, StoreError> {
        let candidate = GroceryItem::new(name.clone());

        sqlx::query(
            "INSERT INTO grocery_items (id, name, created_at) VALUES (?, ?, ?) ON CONFLICT(name) DO NOTHING",
        )
        .bind(candidate.id.to_string())
        .bind(name.as_str())
        .bind(candidate.created_at.to_rfc3339())
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;

        let row: ItemRow = sqlx::query_as("SELECT id, name, created_at FROM grocery_items WHERE name = ?")
            .bind(name.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(store_err)?;

        hydrate_item(&row.id, &row.name, &row.created_at)
    }

    async fn resolve_existing(&mut self, name: &str) -> Result<Option<GroceryItem>, StoreError> {
        let row: Option<ItemRow> =
            sqlx::query_as("SELECT id, name, created_at FROM grocery_items WHERE name = ?")
                .bind(name)
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(store_err)?;

        row.map(|r| hydrate_item(&r.id, &r.name, &r.created_at))
            .transpose()
    }

    async fn prune_orphans(&mut self) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM grocery_items WHERE id NOT IN (SELECT item_id FROM list_items)",
        )
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected())
    }

    async fn pooled_items(&mut self) -> Result<Vec<PooledItem>, StoreError> {
        let rows: Vec<PooledItemRow> = sqlx::query_as(
            r#"
            SELECT i.id, i.name, i.created_at, COUNT(li.list_id) AS refs
            FROM grocery_items i
            LEFT JOIN list_items li ON li.item_id = i.id
            GROUP BY i.id
            ORDER BY i.name
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_err)?;

        rows.into_iter()
            .map(|r| {
                Ok(PooledItem {
                    item: hydrate_item(&r.id, &r.name, &r.created_at)?,
                    references: r.refs.max(0) as u64,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ListStore for SqliteTx {
    async fn get_list(&mut self, id: ListId) -> Result<Option<GroceryList>, StoreError> {
        let row: Option<ListRow> = sqlx::query_as(
            r#"
            SELECT l.id, l.name, u.username AS owner, l.is_template, l.created_at, l.updated_at
            FROM grocery_lists l
            JOIN users u ON u.id = l.owner_id
            WHERE l.id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_err)?;

        match row {
            Some(row) => self.hydrate_list(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn insert_list(&mut self, list: &GroceryList) -> Result<(), StoreError> {
        let owner_id = self.user_id(list.owner()).await?;
        let id = list.id().to_string();

        sqlx::query(
            r#"
            INSERT INTO grocery_lists (id, name, owner_id, is_template, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(list.name())
        .bind(&owner_id)
        .bind(list.is_template())
        .bind(list.created_at().to_rfc3339())
        .bind(list.updated_at().to_rfc3339())
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;

        for item in list.items() {
            sqlx::query("INSERT INTO list_items (list_id, item_id) VALUES (?, ?)")
                .bind(&id)
                .bind(item.id.to_string())
                .execute(&mut *self.tx)
                .await
                .map_err(store_err)?;
        }

        for username in list.shared_users() {
            let user_id = self.user_id(username).await?;
            sqlx::query("INSERT INTO list_shares (list_id, user_id) VALUES (?, ?)")
                .bind(&id)
                .bind(&user_id)
                .execute(&mut *self.tx)
                .await
                .map_err(store_err)?;
        }

        Ok(())
    }

    async fn update_list(&mut self, list: &GroceryList) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE grocery_lists SET name = ?, updated_at = ? WHERE id = ?")
            .bind(list.name())
            .bind(list.updated_at().to_rfc3339())
            .bind(list.id().to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(format!("list {}", list.id())));
        }
        Ok(())
    }

    async fn attach_item(&mut self, list_id: ListId, item_id: ItemId) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO list_items (list_id, item_id) VALUES (?, ?)")
            .bind(list_id.to_string())
            .bind(item_id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn detach_item(&mut self, list_id: ListId, item_id: ItemId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM list_items WHERE list_id = ? AND item_id = ?")
            .bind(list_id.to_string())
            .bind(item_id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn add_share(&mut self, list_id: ListId, username: &str) -> Result<(), StoreError> {
        let user_id = self.user_id(username).await?;
        sqlx::query("INSERT OR IGNORE INTO list_shares (list_id, user_id) VALUES (?, ?)")
            .bind(list_id.to_string())
            .bind(&user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn remove_share(&mut self, list_id: ListId, username: &str) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM list_shares WHERE list_id = ? AND user_id = (SELECT id FROM users WHERE username = ?)",
        )
        .bind(list_id.to_string())
        .bind(username)
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn delete_list(&mut self, id: ListId) -> Result<(), StoreError> {
        let id = id.to_string();

        // Detach from items and shared users, then drop the list itself.
        sqlx::query("DELETE FROM list_items WHERE list_id = ?")
            .bind(&id)
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        sqlx::query("DELETE FROM list_shares WHERE list_id = ?")
            .bind(&id)
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        sqlx::query("DELETE FROM grocery_lists WHERE id = ?")
            .bind(&id)
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn owned_list_names(
        &mut self,
        username: &str,
    ) -> Result<BTreeMap<ListId, String>, StoreError> {
        self.list_names(
            r#"
            SELECT l.id, l.name
            FROM grocery_lists l
            JOIN users u ON u.id = l.owner_id
            WHERE u.username = ?
            "#,
            username,
        )
        .await
    }

    async fn shared_list_names(
        &mut self,
        username: &str,
    ) -> Result<BTreeMap<ListId, String>, StoreError> {
        self.list_names(
            r#"
            SELECT l.id, l.name
            FROM list_shares s
            JOIN grocery_lists l ON l.id = s.list_id
            JOIN users u ON u.id = s.user_id
            WHERE u.username = ?
            "#,
            username,
        )
        .await
    }

    async fn lists_referencing(&mut self, item_id: ItemId) -> Result<Vec<ListId>, StoreError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT list_id FROM list_items WHERE item_id = ? ORDER BY list_id")
                .bind(item_id.to_string())
                .fetch_all(&mut *self.tx)
                .await
                .map_err(store_err)?;

        rows.iter().map(|r| parse_id(&r.0)).collect()
    }
}

#[async_trait]
impl UserStore for SqliteTx {
    async fn find_user(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?;

        row.map(User::try_from).transpose()
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (id, username, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(user.id.to_string())
            .bind(&user.username)
            .bind(&user.name)
            .bind(user.created_at.to_rfc3339())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| match store_err(e) {
                StoreError::Duplicate(_) => {
                    StoreError::Duplicate(format!("user '{}'", user.username))
                }
                other => other,
            })?;
        Ok(())
    }

    async fn users(&mut self) -> Result<Vec<User>, StoreError> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users ORDER BY username")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_err)?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn delete_user(&mut self, username: &str) -> Result<bool, StoreError> {
        // CASCADE removes owned lists, their relations, shares and API keys
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }
}
