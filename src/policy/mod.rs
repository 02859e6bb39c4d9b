//! Statement policy module.
//!
//! Classifies submitted SQL by its leading verb and decides, per role,
//! whether it may be sent to the database at all.

mod authorizer;

pub use authorizer::{authorize, normalize, READ_ONLY_VERBS, STATEMENT_TERMINATOR};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The role a session runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Generic client: reads and writes, usage is counted.
    #[default]
    Client,
    /// Restricted accountant: read-only, never counted.
    Accountant,
}

impl Role {
    /// Returns true if this role may run mutating statements.
    pub fn may_mutate(&self) -> bool {
        matches!(self, Self::Client)
    }

    /// Returns true if operations under this role feed the usage counters.
    pub fn is_logged(&self) -> bool {
        matches!(self, Self::Client)
    }

    /// Returns the role as a string for display and CLI parsing.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Accountant => "accountant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "accountant" => Ok(Self::Accountant),
            _ => Err(format!(
                "Invalid role: {s}. Expected: client or accountant"
            )),
        }
    }
}

/// Classification of an authorized statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// SELECT, SHOW or DESC: executed as a query, produces a table.
    ReadOnly,
    /// Anything else: executed as an update, produces a row count.
    Mutating,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "read-only"),
            Self::Mutating => write!(f, "mutating"),
        }
    }
}

/// A statement that passed the policy and may be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedStatement {
    /// SQL with surrounding whitespace and the single trailing terminator removed.
    pub sql: String,
    /// Lower-cased first token.
    pub verb: String,
    /// Read-only or mutating.
    pub kind: StatementKind,
}

impl AuthorizedStatement {
    /// Returns true if the statement should be run as a query.
    pub fn is_read_only(&self) -> bool {
        self.kind == StatementKind::ReadOnly
    }
}

/// Reasons a statement is refused before execution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    /// A terminator remained after stripping the trailing one.
    #[error("Multi-statement SQL is not allowed.")]
    MultiStatement,

    /// The restricted role submitted a non read-only verb.
    #[error("Only SELECT, SHOW, and DESC commands are allowed for the accountant role (got '{verb}').")]
    NotPermitted { verb: String },
}
