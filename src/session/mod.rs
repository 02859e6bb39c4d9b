//! Session lifecycle for sqldesk.
//!
//! A session is one authenticated connection. At most one is open at a time.

mod manager;

pub use manager::{ActiveSession, SessionManager};

use crate::policy::Role;
use std::fmt;

/// What the user asked to connect with.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ConnectRequest {
    /// Role the session runs under.
    pub role: Role,
    /// Database profile basename (client role only).
    pub database: Option<String>,
    /// User profile basename holding the expected login (client role only).
    pub user_profile: Option<String>,
    /// Username as typed.
    pub username: String,
    /// Password as typed.
    pub password: String,
}

impl fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("role", &self.role)
            .field("database", &self.database)
            .field("user_profile", &self.user_profile)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Who is connected and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub role: Role,
    /// Login username recorded in the usage counters.
    pub username: String,
    /// Database label shown in the status line.
    pub database: String,
    /// Password-free connection target, e.g. `project3 @ localhost:3306`.
    pub target: String,
}
