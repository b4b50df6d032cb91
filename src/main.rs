use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{ConfigCommand, ListCommand};
use grocerylist::client::ListClient;
use grocerylist::config::Config;

#[derive(Parser)]
#[command(name = "grocery")]
#[command(version)]
#[command(about = "Shared grocery lists from the command line", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    List(ListCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.clone())?;

    match cli.command {
        Some(Commands::List(cmd)) => {
            let client = ListClient::from_config(&config)?;
            cmd.run(&client).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config, cli.config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
