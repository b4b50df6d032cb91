//! Grocery List Admin CLI
//!
//! Administration tool for users, API keys and the item pool.
//!
//! # Usage
//!
//! ```bash
//! grocery-admin user add alice --name Alice
//! grocery-admin user list
//! grocery-admin key issue alice --label laptop
//! grocery-admin items prune
//! ```
//!
//! # Environment Variables
//!
//! - `GROCERY_DATABASE_PATH`: SQLite database the server uses (default: ~/.local/share/grocery-server/grocery.db)

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use grocery_list_core::{ItemPool, Store, StoreError, StoreTx, User, UserStore};
use grocerylist::db::{init_db, ApiKeyRepository, SqliteStore};

#[derive(Parser)]
#[command(name = "grocery-admin")]
#[command(version)]
#[command(about = "Grocery list server administration tool")]
struct Cli {
    /// Path to the server database
    #[arg(long, short, global = true, env = "GROCERY_DATABASE_PATH")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User(UserCommand),
    /// Manage API keys
    Key(KeyCommand),
    /// Inspect the item pool
    Items(ItemsCommand),
}

#[derive(Args)]
struct UserCommand {
    #[command(subcommand)]
    command: UserSubcommand,
}

#[derive(Subcommand)]
enum UserSubcommand {
    /// Add a new user
    Add {
        /// Login name
        username: String,
        /// Display name
        #[arg(long, short)]
        name: Option<String>,
    },
    /// List all users
    List,
    /// Remove a user along with the lists they own
    Remove { username: String },
}

#[derive(Args)]
struct KeyCommand {
    #[command(subcommand)]
    command: KeySubcommand,
}

#[derive(Subcommand)]
enum KeySubcommand {
    /// Issue a new API key. The key is printed once and not stored.
    Issue {
        username: String,
        /// Free-form note, e.g. the device the key is for
        #[arg(long, short, default_value = "")]
        label: String,
    },
    /// List issued keys
    List,
    /// Revoke every key issued to a user
    Revoke { username: String },
}

#[derive(Args)]
struct ItemsCommand {
    #[command(subcommand)]
    command: ItemsSubcommand,
}

#[derive(Subcommand)]
enum ItemsSubcommand {
    /// List pooled items and how many lists use each
    List,
    /// Delete items no list uses
    Prune,
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("grocery-server")
        .join("grocery.db")
}

async fn add_user(
    store: &SqliteStore,
    username: &str,
    name: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = User::new(username, name.unwrap_or_default())?;

    let mut tx = store.begin_write().await?;
    match tx.insert_user(&user).await {
        Err(StoreError::Duplicate(_)) => {
            return Err(format!("User '{}' already exists", user.username).into())
        }
        other => other?,
    }
    tx.commit().await?;

    println!("Added user: {}", user);
    Ok(())
}

async fn list_users(store: &SqliteStore) -> Result<(), Box<dyn std::error::Error>> {
    let mut tx = store.begin().await?;
    let users = tx.users().await?;

    if users.is_empty() {
        println!("No users registered.");
        return Ok(());
    }

    println!("{:<24} {:<30} {:<20}", "USERNAME", "NAME", "CREATED");
    println!("{}", "-".repeat(76));
    for user in &users {
        println!(
            "{:<24} {:<30} {:<20}",
            user.username,
            user.name,
            user.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    println!("Total: {} user(s)", users.len());
    Ok(())
}

async fn remove_user(store: &SqliteStore, username: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut tx = store.begin_write().await?;
    if !tx.delete_user(username).await? {
        return Err(format!("User '{}' not found", username).into());
    }
    tx.commit().await?;

    println!("Removed user: {}", username);
    Ok(())
}

async fn list_items(store: &SqliteStore) -> Result<(), Box<dyn std::error::Error>> {
    let mut tx = store.begin().await?;
    let items = tx.pooled_items().await?;

    if items.is_empty() {
        println!("No items pooled.");
        return Ok(());
    }

    println!("{:<40} {:>5}", "ITEM", "LISTS");
    println!("{}", "-".repeat(46));
    for pooled in &items {
        println!("{:<40} {:>5}", pooled.item.name.as_str(), pooled.references);
    }
    Ok(())
}

async fn prune_items(store: &SqliteStore) -> Result<(), Box<dyn std::error::Error>> {
    let mut tx = store.begin_write().await?;
    let removed = tx.prune_orphans().await?;
    tx.commit().await?;

    println!("Pruned {} orphaned item(s)", removed);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let path = cli.database.unwrap_or_else(default_database_path);
    let pool = init_db(&path).await?;
    let store = SqliteStore::new(pool.clone());
    let keys = ApiKeyRepository::new(pool);

    match cli.command {
        Commands::User(cmd) => match cmd.command {
            UserSubcommand::Add { username, name } => add_user(&store, &username, name).await,
            UserSubcommand::List => list_users(&store).await,
            UserSubcommand::Remove { username } => remove_user(&store, &username).await,
        },
        Commands::Key(cmd) => match cmd.command {
            KeySubcommand::Issue { username, label } => match keys.issue(&username, &label).await? {
                Some(key) => {
                    println!("API key for {}:", username);
                    println!("  {}", key);
                    println!("Store it now; it cannot be shown again.");
                    Ok(())
                }
                None => Err(format!("User '{}' not found", username).into()),
            },
            KeySubcommand::List => {
                for key in keys.list().await? {
                    println!("{:<24} {:<20} {}", key.username, key.label, key.created_at);
                }
                Ok(())
            }
            KeySubcommand::Revoke { username } => {
                let revoked = keys.revoke_for_user(&username).await?;
                println!("Revoked {} key(s) for {}", revoked, username);
                Ok(())
            }
        },
        Commands::Items(cmd) => match cmd.command {
            ItemsSubcommand::List => list_items(&store).await,
            ItemsSubcommand::Prune => prune_items(&store).await,
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
