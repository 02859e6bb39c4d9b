//! Diagnostic logging for sqldesk.
//!
//! Interactive sessions log to a file so the prompt stays clean; one-shot runs
//! log to stderr so stdout carries only the result. Usage counter failures
//! never reach the user and are only visible here, under [`USAGE_TARGET`].

use std::fs::{self, File};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Target for usage counter diagnostics.
pub const USAGE_TARGET: &str = "sqldesk::usage";

/// Where diagnostics go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// `~/.local/state/sqldesk/sqldesk.log`, truncated per run.
    Interactive,
    /// stderr.
    OneShot,
}

impl LogMode {
    pub fn for_run(one_shot: bool) -> Self {
        if one_shot {
            Self::OneShot
        } else {
            Self::Interactive
        }
    }
}

/// Default filter directives for `level`.
///
/// sqlx reports every user statement at info; it is held at warn so the log
/// shows sqldesk's own view of each statement. Usage failures are kept at any
/// level.
pub fn default_directives(level: &str) -> String {
    format!("{level},sqlx=warn,{USAGE_TARGET}={}", usage_level(level))
}

fn usage_level(level: &str) -> &str {
    match level {
        "trace" | "debug" => level,
        _ => "warn",
    }
}

/// Builds the filter: `RUST_LOG` wins, otherwise [`default_directives`].
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Installs the global subscriber for `mode`.
pub fn init(mode: LogMode, level: &str) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(level));

    match mode {
        LogMode::OneShot => builder.with_writer(std::io::stderr).init(),
        LogMode::Interactive => {
            if let Some(file) = open_log_file() {
                builder.with_writer(file).with_ansi(false).init();
            }
        }
    }
}

fn open_log_file() -> Option<File> {
    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            return None;
        }
    }

    File::create(&log_path)
        .map_err(|e| eprintln!("Warning: Could not create log file: {e}"))
        .ok()
}

/// Returns the path for the interactive log file.
pub fn get_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::config_dir)
        .map(|dir| dir.join("sqldesk").join("sqldesk.log"))
        .unwrap_or_else(|| std::env::temp_dir().join("sqldesk.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_mode_for_run() {
        assert_eq!(LogMode::for_run(true), LogMode::OneShot);
        assert_eq!(LogMode::for_run(false), LogMode::Interactive);
    }

    #[test]
    fn test_default_directives() {
        assert_eq!(
            default_directives("info"),
            "info,sqlx=warn,sqldesk::usage=warn"
        );
        assert_eq!(
            default_directives("debug"),
            "debug,sqlx=warn,sqldesk::usage=debug"
        );
    }

    #[test]
    fn test_default_directives_parse() {
        for level in ["info", "debug"] {
            assert!(EnvFilter::try_new(default_directives(level)).is_ok());
        }
    }

    #[test]
    fn test_log_path() {
        let path = get_log_path();
        assert!(path.is_absolute());
        assert!(path.ends_with("sqldesk.log"));
    }
}
