//! API keys for the list server.
//!
//! Keys are 32 random bytes, base64url encoded, handed out once. Only a
//! SHA-256 digest of each key is stored.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

#[derive(Debug, Clone)]
pub struct ApiKeyRepository {
    pool: SqlitePool,
}

/// Summary of a stored key. The key itself is never recoverable.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKeyInfo {
    pub username: String,
    pub label: String,
    pub created_at: String,
}

impl ApiKeyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Issues a new key for `username`. Returns `None` if there is no such
    /// user.
    pub async fn issue(&self, username: &str, label: &str) -> Result<Option<String>, sqlx::Error> {
        let user: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        let Some((user_id,)) = user else {
            return Ok(None);
        };

        let key = generate_key();
        sqlx::query("INSERT INTO api_keys (key_hash, user_id, label, created_at) VALUES (?, ?, ?, ?)")
            .bind(hash_key(&key))
            .bind(&user_id)
            .bind(label)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        tracing::info!(user = username, label, "Issued API key");
        Ok(Some(key))
    }

    /// Returns the username a key was issued to.
    pub async fn resolve(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT u.username
            FROM api_keys k
            JOIN users u ON u.id = k.user_id
            WHERE k.key_hash = ?
            "#,
        )
        .bind(hash_key(key))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.0))
    }

    pub async fn list(&self) -> Result<Vec<ApiKeyInfo>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT u.username, k.label, k.created_at
            FROM api_keys k
            JOIN users u ON u.id = k.user_id
            ORDER BY u.username, k.created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Revokes every key issued to `username`. Returns how many were removed.
    pub async fn revoke_for_user(&self, username: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM api_keys WHERE user_id = (SELECT id FROM users WHERE username = ?)",
        )
        .bind(username)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn generate_key() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_db, SqliteStore};
    use grocery_list_core::{Store, StoreTx, User, UserStore};
    use tempfile::TempDir;

    struct TestContext {
        pool: SqlitePool,
        repo: ApiKeyRepository,
        _temp_dir: TempDir,
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();

        let store = SqliteStore::new(pool.clone());
        let mut tx = store.begin().await.unwrap();
        tx.insert_user(&User::new("alice", "Alice").unwrap())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        TestContext {
            repo: ApiKeyRepository::new(pool.clone()),
            pool,
            _temp_dir: temp_dir,
        }
    }

    #[test]
    fn test_generate_key_format() {
        let key = generate_key();
        // 32 bytes base64url without padding
        assert_eq!(key.len(), 43);
        assert_ne!(key, generate_key());
    }

    #[test]
    fn test_hash_key_is_stable() {
        assert_eq!(hash_key("abc"), hash_key("abc"));
        assert_ne!(hash_key("abc"), hash_key("abd"));
    }

    #[tokio::test]
    async fn test_issue_and_resolve() {
        let ctx = setup().await;

        let key = ctx.repo.issue("alice", "laptop").await.unwrap().unwrap();
        assert_eq!(
            ctx.repo.resolve(&key).await.unwrap().as_deref(),
            Some("alice")
        );
        assert!(ctx.repo.resolve("not-a-key").await.unwrap().is_none());

        let stored: (String,) = sqlx::query_as("SELECT key_hash FROM api_keys")
            .fetch_one(&ctx.pool)
            .await
            .unwrap();
        assert_ne!(stored.0, key);

        let keys = ctx.repo.list().await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].label, "laptop");
    }

    #[tokio::test]
    async fn test_issue_unknown_user() {
        let ctx = setup().await;
        assert!(ctx.repo.issue("ghost", "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke() {
        let ctx = setup().await;
        let first = ctx.repo.issue("alice", "a").await.unwrap().unwrap();
        let second = ctx.repo.issue("alice", "b").await.unwrap().unwrap();

        assert_eq!(ctx.repo.revoke_for_user("alice").await.unwrap(), 2);
        assert!(ctx.repo.resolve(&first).await.unwrap().is_none());
        assert!(ctx.repo.resolve(&second).await.unwrap().is_none());
        assert_eq!(ctx.repo.revoke_for_user("alice").await.unwrap(), 0);
    }
}
