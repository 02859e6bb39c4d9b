//! Query execution for sqldesk.
//!
//! This module isolates authorization, execution and usage counting
//! from the application state handlers.

pub mod executor;

pub use executor::{ExecutionOutcome, QueryExecutor};
