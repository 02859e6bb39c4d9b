//! Configuration management for sqldesk.
//!
//! Connection details live in `.properties` files inside a props directory;
//! a small TOML file names which of those files play which part.

mod connection;
mod properties;

pub use connection::ConnectionConfig;
pub use properties::Properties;

use crate::error::{DeskError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extension of property files in the props directory.
pub const PROPERTIES_EXTENSION: &str = "properties";

/// Main configuration structure for sqldesk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Directory holding the `.properties` files.
    #[serde(default = "default_props_dir")]
    pub props_dir: PathBuf,

    /// Profiles offered to the client role.
    #[serde(default)]
    pub client: ClientConfig,

    /// Fixed profile of the accountant role.
    #[serde(default)]
    pub accountant: AccountantConfig,

    /// Usage counter settings.
    #[serde(default)]
    pub usage: UsageConfig,
}

/// Profiles selectable by the client role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Database profile basenames (files carrying `driver` and `url`).
    #[serde(default = "default_databases")]
    pub databases: Vec<String>,

    /// User profile basenames (files carrying `user` and `password`).
    #[serde(default = "default_users")]
    pub users: Vec<String>,

    /// Single-file profile for the usage logging session.
    #[serde(default = "default_logging_profile")]
    pub logging: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            databases: default_databases(),
            users: default_users(),
            logging: default_logging_profile(),
        }
    }
}

/// The accountant's fixed single-file profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountantConfig {
    #[serde(default = "default_accountant_profile")]
    pub credentials: String,
}

impl Default for AccountantConfig {
    fn default() -> Self {
        Self {
            credentials: default_accountant_profile(),
        }
    }
}

/// Usage counter settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageConfig {
    /// Counter table name.
    #[serde(default = "default_usage_table")]
    pub table: String,

    /// Users whose operations are never counted, whatever their role.
    #[serde(default = "default_exempt_users")]
    pub exempt_users: Vec<String>,

    /// Create the counter table on first use if it is missing.
    #[serde(default)]
    pub create_table: bool,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            table: default_usage_table(),
            exempt_users: default_exempt_users(),
            create_table: false,
        }
    }
}

fn default_props_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sqldesk")
        .join("props")
}

fn default_databases() -> Vec<String> {
    vec![
        "project3".to_string(),
        "bikedb".to_string(),
        "operationslog".to_string(),
    ]
}

fn default_users() -> Vec<String> {
    vec![
        "root".to_string(),
        "client1".to_string(),
        "client2".to_string(),
    ]
}

fn default_logging_profile() -> String {
    "project3app".to_string()
}

fn default_accountant_profile() -> String {
    "theaccountant".to_string()
}

fn default_usage_table() -> String {
    "operationscount".to_string()
}

fn default_exempt_users() -> Vec<String> {
    vec!["theaccountant".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            props_dir: default_props_dir(),
            client: ClientConfig::default(),
            accountant: AccountantConfig::default(),
            usage: UsageConfig::default(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sqldesk")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| DeskError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            DeskError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that end up interpolated into SQL.
    pub fn validate(&self) -> Result<()> {
        let table = &self.usage.table;
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !valid {
            return Err(DeskError::config(format!(
                "Invalid usage table name '{table}'"
            )));
        }
        Ok(())
    }

    /// Resolves a profile name to its file in the props directory.
    ///
    /// `client1` and `client1.properties` both resolve to the same file.
    pub fn profile_path(&self, profile: &str) -> PathBuf {
        let file = if Path::new(profile).extension().is_some() {
            profile.to_string()
        } else {
            format!("{profile}.{PROPERTIES_EXTENSION}")
        };
        self.props_dir.join(file)
    }

    /// Lists the given profile basenames that exist in the props directory, in order.
    pub fn available_profiles(&self, basenames: &[String]) -> Vec<String> {
        if !self.props_dir.is_dir() {
            return Vec::new();
        }
        basenames
            .iter()
            .filter(|name| self.profile_path(name).is_file())
            .cloned()
            .collect()
    }

    /// Returns true if operations by this user are never counted.
    pub fn is_exempt(&self, username: &str) -> bool {
        self.usage.exempt_users.iter().any(|u| u == username)
    }
}
