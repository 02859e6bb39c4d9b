//! Connection descriptors built from property files.

use super::Properties;
use crate::db::DatabaseBackend;
use crate::error::{DeskError, Result};
use std::fmt;
use std::path::Path;
use url::Url;

/// Prefix carried by JDBC-style connection URLs.
const JDBC_PREFIX: &str = "jdbc:";

/// Everything needed to open a session: driver, URL and login.
///
/// Immutable once loaded.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Driver identifier exactly as configured.
    pub driver: String,

    /// Backend resolved from the driver identifier.
    pub backend: DatabaseBackend,

    /// Connection URL with any `jdbc:` prefix removed.
    pub url: String,

    /// Login user.
    pub user: String,

    /// Login password.
    pub password: String,
}

impl ConnectionConfig {
    /// Builds a config from a single file carrying all four keys.
    pub fn from_properties(props: &Properties) -> Result<Self> {
        Self::from_pair(props, props)
    }

    /// Builds a config from a database file (`driver`, `url`) and a user
    /// file (`user`, `password`).
    pub fn from_pair(database: &Properties, credentials: &Properties) -> Result<Self> {
        let driver = database.require("driver")?.trim().to_string();
        let backend = DatabaseBackend::from_driver(&driver).ok_or_else(|| {
            DeskError::config(format!(
                "Unsupported driver '{driver}' in {}",
                database.source_name()
            ))
        })?;
        let url = strip_jdbc_prefix(database.require("url")?.trim()).to_string();

        Ok(Self {
            driver,
            backend,
            url,
            user: credentials.require("user")?.to_string(),
            password: credentials.require("password")?.to_string(),
        })
    }

    /// Loads a single-file connection.
    pub fn load_single(path: &Path) -> Result<Self> {
        Self::from_properties(&Properties::load(path)?)
    }

    /// Loads a database file paired with a user file.
    pub fn load_pair(database: &Path, credentials: &Path) -> Result<Self> {
        Self::from_pair(&Properties::load(database)?, &Properties::load(credentials)?)
    }

    /// Returns true if the supplied login equals the configured one.
    pub fn matches_login(&self, user: &str, password: &str) -> bool {
        self.user == user && self.password == password
    }

    /// Database name taken from the URL path, if any.
    pub fn database_name(&self) -> Option<String> {
        if self.backend == DatabaseBackend::Sqlite {
            let path = self.url.trim_start_matches("sqlite:").trim_start_matches("//");
            let path = path.split('?').next().unwrap_or(path);
            return Path::new(path)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned());
        }

        let url = Url::parse(&self.url).ok()?;
        url.path_segments()?
            .next()
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    /// Returns a display-safe string (no password) for UI purposes.
    pub fn display_string(&self) -> String {
        let database = self.database_name().unwrap_or_else(|| "unknown".to_string());

        match Url::parse(&self.url) {
            Ok(url) if url.host_str().is_some() => {
                let host = url.host_str().unwrap_or("localhost");
                let port = url.port().unwrap_or_else(|| self.backend.default_port());
                format!("{database} @ {host}:{port}")
            }
            _ => format!("{database} ({})", self.backend.as_str()),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("backend", &self.backend)
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn strip_jdbc_prefix(url: &str) -> &str {
    match url.get(..JDBC_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(JDBC_PREFIX) => &url[JDBC_PREFIX.len()..],
        _ => url,
    }
}
