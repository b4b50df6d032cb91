//! Grocery List Server
//!
//! Serves the list API over HTTP, backed by a SQLite database.
//!
//! # Configuration
//!
//! Environment variables:
//! - `GROCERY_PORT`: Port to listen on (default: 8080)
//! - `GROCERY_DATABASE_PATH`: SQLite database (default: ~/.local/share/grocery-server/grocery.db)
//! - `GROCERY_PRUNE_ORPHAN_ITEMS`: Delete pooled items no list uses any more (default: false)
//!
//! Users and API keys are managed with `grocery-admin`.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grocery_list_core::ListService;
use grocerylist::db::{init_db, ApiKeyRepository, SqliteStore};
use grocerylist::server::{router, AppState};

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    /// Port to listen on
    port: u16,
    /// SQLite database file
    database_path: PathBuf,
    prune_orphan_items: bool,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let port = std::env::var("GROCERY_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let database_path = std::env::var("GROCERY_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_database_path());

        let prune_orphan_items = std::env::var("GROCERY_PRUNE_ORPHAN_ITEMS")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            port,
            database_path,
            prune_orphan_items,
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("grocery-server")
        .join("grocery.db")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grocerylist=info,grocery_list_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    tracing::info!("Database: {}", config.database_path.display());
    let pool = init_db(&config.database_path).await?;

    if config.prune_orphan_items {
        tracing::info!("Orphaned items will be pruned on save and removal");
    }

    let service = ListService::new(SqliteStore::new(pool.clone()))
        .with_orphan_pruning(config.prune_orphan_items);
    let state = AppState::new(service, ApiKeyRepository::new(pool));
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
