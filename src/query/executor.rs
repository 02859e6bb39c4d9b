//! Query execution with role authorization and usage counting.
//!
//! Provides isolated query execution that can be tested independently
//! of the application state.

use crate::error::Result;
use crate::policy::{authorize, StatementKind};
use crate::session::ActiveSession;
use crate::table::ResultTable;
use crate::usage::OperationKind;
use tracing::{debug, info};

/// Query executor bound to an open session.
pub struct QueryExecutor<'a> {
    session: &'a ActiveSession,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(session: &'a ActiveSession) -> Self {
        Self { session }
    }

    /// Authorizes and executes one statement.
    ///
    /// Read-only statements run as queries and produce a table; anything else
    /// runs as an update. After a successful operation the usage counter is
    /// bumped for counted users; counting failures never surface here.
    pub async fn execute(&self, raw_sql: &str) -> Result<ExecutionOutcome> {
        let info = &self.session.info;
        let Some(statement) = authorize(raw_sql, info.role)? else {
            debug!("Blank statement, nothing to execute");
            return Ok(ExecutionOutcome::Skipped);
        };

        debug!("Executing {} statement '{}'", statement.kind, statement.verb);

        let (outcome, kind) = match statement.kind {
            StatementKind::ReadOnly => {
                let table = self.session.db.execute_query(&statement.sql).await?;
                info!(
                    "{} returned {} row(s) in {:?}",
                    statement.verb,
                    table.row_count(),
                    table.execution_time()
                );
                (ExecutionOutcome::Table(table), OperationKind::Query)
            }
            StatementKind::Mutating => {
                let rows_affected = self.session.db.execute_update(&statement.sql).await?;
                info!("{} affected {} row(s)", statement.verb, rows_affected);
                (ExecutionOutcome::Updated { rows_affected }, OperationKind::Update)
            }
        };

        if let Some(usage) = &self.session.usage {
            usage.record_quietly(&info.username, kind).await;
        }

        Ok(outcome)
    }
}

/// Result of executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// Blank input; nothing was sent to the database.
    Skipped,
    /// A read-only statement's materialized result.
    Table(ResultTable),
    /// A modifying statement's affected row count.
    Updated { rows_affected: u64 },
}

impl ExecutionOutcome {
    /// One-line summary for status output.
    pub fn summary(&self) -> String {
        match self {
            Self::Skipped => "Nothing to execute.".to_string(),
            Self::Table(table) => format!(
                "{} row{} returned.",
                table.row_count(),
                if table.row_count() == 1 { "" } else { "s" }
            ),
            Self::Updated { rows_affected } => format!("{rows_affected} row(s) affected."),
        }
    }
}
