//! Command-line argument parsing for sqldesk.
//!
//! Uses clap to parse CLI arguments.

use crate::config::Config;
use crate::error::{DeskError, Result};
use crate::policy::Role;
use crate::session::ConnectRequest;
use clap::Parser;
use std::path::PathBuf;

/// Output format for one-shot mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Box-drawn text table.
    #[default]
    Text,
    /// JSON document with columns, rows and timing.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Ad-hoc SQL desk with role-based statement policy and usage counting.
#[derive(Parser, Debug)]
#[command(name = "sqldesk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Role to run under (client or accountant)
    #[arg(short = 'r', long, value_name = "ROLE", default_value = "client")]
    pub role: Role,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the .properties files (overrides the config file)
    #[arg(long, value_name = "DIR")]
    pub props_dir: Option<PathBuf>,

    /// Database profile (client role)
    #[arg(short = 'd', long, value_name = "PROFILE")]
    pub database: Option<String>,

    /// User profile holding the expected login (client role)
    #[arg(short = 'u', long, value_name = "PROFILE")]
    pub user_profile: Option<String>,

    /// Login username
    #[arg(short = 'U', long, value_name = "USER")]
    pub username: Option<String>,

    /// Login password
    #[arg(long, value_name = "PASSWORD", env = "SQLDESK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Execute one statement, print the result and exit
    #[arg(short = 'e', long, value_name = "SQL")]
    pub execute: Option<String>,

    /// Output format for --execute
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub format: OutputFormat,

    /// Log at debug level
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Loads the config file and applies command-line overrides.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_from_file(&self.config_path())?;
        if let Some(dir) = &self.props_dir {
            config.props_dir = dir.clone();
        }
        Ok(config)
    }

    /// Returns true if a single statement should be run non-interactively.
    pub fn is_one_shot(&self) -> bool {
        self.execute.is_some()
    }

    /// Default log filter directive for the chosen verbosity.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Builds a connect request from the flags, or `None` when no login was given.
    pub fn connect_request(&self) -> Option<ConnectRequest> {
        self.username.as_ref()?;
        Some(self.connect_defaults())
    }

    /// Connect choices from the flags, with blanks for anything not given.
    pub fn connect_defaults(&self) -> ConnectRequest {
        ConnectRequest {
            role: self.role,
            database: self.database.clone(),
            user_profile: self.user_profile.clone(),
            username: self.username.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
        }
    }

    /// Validates one-shot mode arguments.
    pub fn validate(&self) -> Result<()> {
        if !self.is_one_shot() {
            return Ok(());
        }
        if self.username.is_none() {
            return Err(DeskError::config("--execute requires --username"));
        }
        if self.role == Role::Client && (self.database.is_none() || self.user_profile.is_none()) {
            return Err(DeskError::config(
                "--execute with the client role requires --database and --user-profile",
            ));
        }
        Ok(())
    }
}
