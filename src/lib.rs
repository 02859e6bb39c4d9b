//! sqldesk - An ad-hoc SQL desk with role-based statement policy.
//!
//! This library exposes the core modules for use in integration tests.

pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod policy;
pub mod query;
pub mod repl;
pub mod session;
pub mod table;
pub mod usage;
