mod api_keys;
mod sqlite_store;

pub use api_keys::{ApiKeyInfo, ApiKeyRepository};
pub use sqlite_store::{SqliteStore, SqliteTx};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Initialize the database connection pool and run migrations
pub async fn init_db(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::debug!("Opened database {}", path.display());
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_db_creates_tables() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("test.db");

        let pool = init_db(&db_path).await.unwrap();

        // Verify tables exist
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(
            table_names,
            vec![
                "api_keys",
                "grocery_items",
                "grocery_lists",
                "list_items",
                "list_shares",
                "users"
            ]
        );
    }

    #[tokio::test]
    async fn test_init_db_is_reentrant() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let pool = init_db(&db_path).await.unwrap();
        pool.close().await;

        assert!(init_db(&db_path).await.is_ok());
    }
}
