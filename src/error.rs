//! Error types for sqldesk.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for sqldesk operations.
#[derive(Error, Debug)]
pub enum DeskError {
    /// Property file or app config could not be loaded (missing file, bad key, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Supplied username/password do not match the credential file.
    #[error("Login failed: {0}")]
    Credentials(String),

    /// Database connection errors (host unreachable, driver refused, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement rejected by the role policy before reaching the database.
    #[error("{0}")]
    Policy(#[from] crate::policy::PolicyViolation),

    /// Query execution errors, carrying the driver message verbatim.
    #[error("{0}")]
    Query(String),

    /// Usage counter bookkeeping failed. Never shown to the user.
    #[error("Usage logging error: {0}")]
    Usage(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeskError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a credentials error with the given message.
    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::Credentials(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a usage logging error with the given message.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    ///
    /// These double as the dialog titles of the interactive front end.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Credentials(_) => "Login Failed",
            Self::Connection(_) => "Connection Error",
            Self::Policy(crate::policy::PolicyViolation::MultiStatement) => "Error",
            Self::Policy(_) => "Operation Not Permitted",
            Self::Query(_) => "SQL Error",
            Self::Usage(_) => "Usage Logging Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the message without the category prefix, for dialog bodies.
    pub fn detail(&self) -> String {
        match self {
            Self::Config(msg)
            | Self::Credentials(msg)
            | Self::Connection(msg)
            | Self::Query(msg)
            | Self::Usage(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::Policy(violation) => violation.to_string(),
        }
    }

    /// Returns true if the user may retry after this error without restarting.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::Internal(_))
    }
}

/// Result type alias using DeskError.
pub type Result<T> = std::result::Result<T, DeskError>;
