//! Terminal presentation of application state.
//!
//! These helpers turn state into lines; the caller decides where they go.

use crate::app::{ConnectionStatus, Notice};
use crate::query::ExecutionOutcome;
use crossterm::style::Stylize;

/// Width used when the terminal size cannot be read.
pub const DEFAULT_WIDTH: usize = 120;

/// Current terminal width in columns.
pub fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(cols, _)| cols as usize)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Status line: green while connected, red otherwise.
pub fn status_line(status: &ConnectionStatus, styled: bool) -> String {
    let text = status.to_string();
    if !styled {
        return text;
    }
    match status {
        ConnectionStatus::Connected { .. } => text.green().to_string(),
        ConnectionStatus::Disconnected => text.red().to_string(),
    }
}

/// Notice as `Title: message`, errors in red.
pub fn notice_lines(notice: &Notice, styled: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut message = notice.message.lines();
    let first = message.next().unwrap_or_default();
    let head = format!("{}: {}", notice.title, first);

    lines.push(if styled && notice.is_error() {
        head.red().to_string()
    } else {
        head
    });
    lines.extend(message.map(|l| format!("  {l}")));
    lines
}

/// Machine-readable form of an execution outcome.
pub fn outcome_json(outcome: &ExecutionOutcome) -> serde_json::Value {
    match outcome {
        ExecutionOutcome::Skipped => serde_json::json!({ "skipped": true }),
        ExecutionOutcome::Table(table) => table.to_json(),
        ExecutionOutcome::Updated { rows_affected } => {
            serde_json::json!({ "rows_affected": rows_affected })
        }
    }
}

/// Profile listing for `\profiles`.
pub fn profile_lines(title: &str, profiles: &[String]) -> Vec<String> {
    if profiles.is_empty() {
        return vec![format!("{title}: (none found)")];
    }
    let mut lines = vec![format!("{title}:")];
    lines.extend(profiles.iter().map(|p| format!("  {p}")));
    lines
}
