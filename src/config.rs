use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Client configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Base URL of the list server
    pub server_url: ConfigValue<String>,
    /// API key issued by `grocery-admin key issue`
    #[serde(serialize_with = "redact")]
    pub api_key: ConfigValue<Option<String>>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(default)]
struct ConfigFile {
    server_url: Option<String>,
    api_key: Option<String>,
}

fn redact<S: serde::Serializer>(
    value: &ConfigValue<Option<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    ConfigValue::new(value.value.as_deref().map(mask_key), value.source.clone())
        .serialize(serializer)
}

/// Shows only the first few characters of a key.
pub fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{}…", prefix)
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut server_url =
            ConfigValue::new(DEFAULT_SERVER_URL.to_string(), ConfigSource::Default);
        let mut api_key = ConfigValue::new(None, ConfigSource::Default);
        let mut config_file = None;

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(url) = file_config.server_url {
                server_url = ConfigValue::new(url, ConfigSource::File);
            }
            if let Some(key) = file_config.api_key {
                api_key = ConfigValue::new(Some(key), ConfigSource::File);
            }
        }

        if let Ok(url) = std::env::var("GROCERY_SERVER_URL") {
            server_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(key) = std::env::var("GROCERY_API_KEY") {
            api_key = ConfigValue::new(Some(key), ConfigSource::Environment);
        }

        Ok(Self {
            server_url,
            api_key,
            config_file,
        })
    }

    /// Writes a starter config file. Refuses to overwrite an existing one
    /// unless `force` is set.
    pub fn init(
        path: &Path,
        server_url: &str,
        api_key: Option<&str>,
        force: bool,
    ) -> Result<(), ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(path.to_path_buf(), e))?;
        }

        let file = ConfigFile {
            server_url: Some(server_url.to_string()),
            api_key: api_key.map(str::to_string),
        };
        let contents = serde_yaml::to_string(&file)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))?;
        std::fs::write(path, contents).map_err(|e| ConfigError::WriteError(path.to_path_buf(), e))
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/grocery/
    /// - macOS: ~/Library/Application Support/grocery/
    /// - Windows: %APPDATA%/grocery/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("grocery")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    WriteError(PathBuf, std::io::Error),
    AlreadyExists(PathBuf),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::WriteError(path, e) => {
                write!(f, "Failed to write config file '{}': {}", path.display(), e)
            }
            ConfigError::AlreadyExists(path) => write!(
                f,
                "Config file '{}' already exists (use --force to overwrite)",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
