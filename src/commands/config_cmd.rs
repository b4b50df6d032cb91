use clap::{Args, Subcommand};
use std::path::PathBuf;

use grocerylist::config::{mask_key, Config, DEFAULT_SERVER_URL};

use super::OutputFormat;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Write a config file
    Init {
        /// Server URL
        #[arg(long, default_value = DEFAULT_SERVER_URL)]
        server_url: String,

        /// API key from `grocery-admin key issue`
        #[arg(long)]
        api_key: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("server_url: {}", config.server_url.value);
                        println!("  source: {}", config.server_url.source);
                        println!();

                        let key = config
                            .api_key
                            .value
                            .as_deref()
                            .map(mask_key)
                            .unwrap_or_else(|| "(not set)".to_string());
                        println!("api_key: {}", key);
                        println!("  source: {}", config.api_key.source);
                    }
                }
                Ok(())
            }
            ConfigSubcommand::Init {
                server_url,
                api_key,
                force,
            } => {
                let path = config_path.unwrap_or_else(Config::default_config_path);
                Config::init(&path, server_url, api_key.as_deref(), *force)?;
                println!("Wrote {}", path.display());
                Ok(())
            }
        }
    }
}
