use clap::ValueEnum;

mod config_cmd;
mod list;

pub use config_cmd::ConfigCommand;
pub use list::ListCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
