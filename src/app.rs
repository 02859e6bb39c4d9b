//! Application state and interaction handlers for sqldesk.
//!
//! The front end owns an [`AppState`] value and feeds it, together with an
//! [`Action`], through [`App::handle`], getting the next state back. The only
//! thing held across calls besides that value is the open session.

use crate::error::{DeskError, Result};
use crate::query::{ExecutionOutcome, QueryExecutor};
use crate::session::{ConnectRequest, SessionManager};
use crate::table::ResultTable;
use std::fmt;
use tracing::{debug, warn};

/// Connection status shown in the status line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected { username: String, database: String },
}

impl ConnectionStatus {
    /// Returns true when a session is open.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connected { username, database } => {
                write!(f, "Connected as {username} to {database}")
            }
        }
    }
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message for the user, the terminal stand-in for a dialog box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    /// An informational notice.
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    /// An error notice titled with the error's category.
    pub fn from_error(error: &DeskError) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: error.category().to_string(),
            message: error.detail(),
        }
    }

    /// Returns true for error notices.
    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// Everything the front end displays.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub status: ConnectionStatus,
    /// Statement being edited.
    pub sql_text: String,
    /// Last materialized result, kept until cleared or replaced.
    pub table: Option<ResultTable>,
    /// Outcome of the last action, if it has something to say.
    pub notice: Option<Notice>,
    /// Set when the last action put a fresh result in `table`.
    pub table_refreshed: bool,
}

impl AppState {
    /// Profiles may be picked and a connection opened.
    pub fn can_connect(&self) -> bool {
        !self.status.is_connected()
    }

    pub fn can_disconnect(&self) -> bool {
        self.status.is_connected()
    }

    /// A statement may be submitted.
    pub fn can_execute(&self) -> bool {
        self.status.is_connected()
    }

    pub fn can_clear_sql(&self) -> bool {
        self.status.is_connected()
    }

    pub fn can_clear_results(&self) -> bool {
        self.status.is_connected()
    }
}

/// A user interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Verify credentials and open a session, replacing any open one.
    Connect(ConnectRequest),
    /// Close the open session.
    Disconnect,
    /// Replace the statement being edited.
    SetSql(String),
    /// Run the statement being edited.
    Execute,
    /// Empty the statement editor.
    ClearSql,
    /// Drop the displayed result.
    ClearResults,
}

/// Applies actions to state, owning the session they act on.
pub struct App {
    sessions: SessionManager,
}

impl App {
    /// Creates a new app around a session manager.
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    /// The session manager.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Returns the status matching the session actually open.
    pub fn current_status(&self) -> ConnectionStatus {
        match self.sessions.info() {
            Some(info) => ConnectionStatus::Connected {
                username: info.username.clone(),
                database: info.database.clone(),
            },
            None => ConnectionStatus::Disconnected,
        }
    }

    /// Applies `action` to `state` and returns the new state.
    ///
    /// Recoverable failures land in `notice`; the table is never touched by a
    /// failed action.
    pub async fn handle(&mut self, state: AppState, action: Action) -> AppState {
        let state = AppState {
            notice: None,
            table_refreshed: false,
            ..state
        };

        match action {
            Action::Connect(request) => self.on_connect(state, request).await,
            Action::Disconnect => self.on_disconnect(state).await,
            Action::SetSql(sql) => AppState {
                sql_text: sql,
                ..state
            },
            Action::Execute => self.on_execute(state).await,
            Action::ClearSql => {
                if !state.can_clear_sql() {
                    debug!("Ignoring clear-sql while disconnected");
                    return state;
                }
                AppState {
                    sql_text: String::new(),
                    ..state
                }
            }
            Action::ClearResults => {
                if !state.can_clear_results() {
                    debug!("Ignoring clear-results while disconnected");
                    return state;
                }
                AppState {
                    table: None,
                    ..state
                }
            }
        }
    }

    async fn on_connect(&mut self, mut state: AppState, request: ConnectRequest) -> AppState {
        if let Err(e) = self.sessions.connect(&request).await {
            warn!("Connect failed: {}", e);
            state.notice = Some(Notice::from_error(&e));
        }
        state.status = self.current_status();
        state
    }

    async fn on_disconnect(&mut self, mut state: AppState) -> AppState {
        if let Err(e) = self.sessions.disconnect().await {
            // The session is gone either way.
            warn!("Error while closing session: {}", e);
        }
        state.status = self.current_status();
        state
    }

    async fn on_execute(&mut self, mut state: AppState) -> AppState {
        let Some(session) = self.sessions.active() else {
            state.notice = Some(Notice::from_error(&DeskError::connection(
                "Not connected to a database.",
            )));
            return state;
        };

        match QueryExecutor::new(session).execute(&state.sql_text).await {
            Ok(ExecutionOutcome::Skipped) => {}
            Ok(ExecutionOutcome::Table(table)) => {
                state.table = Some(table);
                state.table_refreshed = true;
            }
            Ok(outcome @ ExecutionOutcome::Updated { .. }) => {
                state.notice = Some(Notice::info("Update Result", outcome.summary()));
            }
            Err(e) => state.notice = Some(Notice::from_error(&e)),
        }
        state
    }

    /// Closes the open session on exit.
    pub async fn close(&mut self) -> Result<()> {
        self.sessions.disconnect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{ColumnInfo, FailingDatabaseClient, MockDatabaseClient, Value};
    use crate::policy::Role;
    use crate::session::{ActiveSession, SessionInfo};
    use pretty_assertions::assert_eq;

    fn connected_app(db: Box<dyn crate::db::DatabaseClient>, role: Role) -> (App, AppState) {
        let session = ActiveSession {
            info: SessionInfo {
                role,
                username: "client1".to_string(),
                database: "project3".to_string(),
                target: "project3 @ localhost:3306".to_string(),
            },
            db,
            usage: None,
        };
        let app = App::new(SessionManager::with_session(Config::default(), session));
        let state = AppState {
            status: app.current_status(),
            ..AppState::default()
        };
        (app, state)
    }

    fn accounts_table() -> ResultTable {
        ResultTable::from_parts(
            vec![ColumnInfo::new("id", "INT"), ColumnInfo::new("owner", "VARCHAR")],
            vec![vec![Value::Int(1), Value::from("ada")]],
        )
        .unwrap()
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(ConnectionStatus::Disconnected.to_string(), "Disconnected");
        let status = ConnectionStatus::Connected {
            username: "client1".to_string(),
            database: "project3".to_string(),
        };
        assert_eq!(status.to_string(), "Connected as client1 to project3");
    }

    #[test]
    fn test_control_enablement() {
        let state = AppState::default();
        assert!(state.can_connect());
        assert!(!state.can_execute());
        assert!(!state.can_disconnect());

        let state = AppState {
            status: ConnectionStatus::Connected {
                username: "root".to_string(),
                database: "bikedb".to_string(),
            },
            ..AppState::default()
        };
        assert!(!state.can_connect());
        assert!(state.can_execute());
        assert!(state.can_clear_sql());
        assert!(state.can_clear_results());
    }

    #[tokio::test]
    async fn test_execute_query_sets_table() {
        let db = MockDatabaseClient::new().with_result("SELECT * FROM accounts", accounts_table());
        let (mut app, state) = connected_app(Box::new(db), Role::Client);

        let state = app
            .handle(state, Action::SetSql("SELECT * FROM accounts;".to_string()))
            .await;
        let state = app.handle(state, Action::Execute).await;

        assert_eq!(state.table, Some(accounts_table()));
        assert!(state.table_refreshed);
        assert_eq!(state.notice, None);
        assert_eq!(state.sql_text, "SELECT * FROM accounts;");

        // Same result again still counts as a fresh one.
        let state = app.handle(state, Action::Execute).await;
        assert!(state.table_refreshed);
        let state = app.handle(state, Action::ClearSql).await;
        assert!(!state.table_refreshed);
        assert!(state.table.is_some());
    }

    #[tokio::test]
    async fn test_update_reports_notice_and_keeps_table() {
        let db = MockDatabaseClient::new().with_rows_affected(2);
        let (mut app, mut state) = connected_app(Box::new(db), Role::Client);
        state.table = Some(accounts_table());

        let state = app
            .handle(state, Action::SetSql("DELETE FROM riders".to_string()))
            .await;
        let state = app.handle(state, Action::Execute).await;

        assert_eq!(
            state.notice,
            Some(Notice::info("Update Result", "2 row(s) affected."))
        );
        assert_eq!(state.table, Some(accounts_table()));
        assert!(!state.table_refreshed);
    }

    #[tokio::test]
    async fn test_errors_leave_table_and_session_untouched() {
        let (mut app, mut state) = connected_app(
            Box::new(FailingDatabaseClient::new("Unknown column 'x'")),
            Role::Accountant,
        );
        state.table = Some(accounts_table());

        for sql in ["SELECT x FROM accounts", "DROP TABLE accounts", "SELECT 1; SELECT 2"] {
            state = app.handle(state, Action::SetSql(sql.to_string())).await;
            state = app.handle(state, Action::Execute).await;

            let notice = state.notice.clone().unwrap();
            assert!(notice.is_error());
            assert_eq!(state.table, Some(accounts_table()));
            assert!(app.sessions().is_connected());
        }

        assert_eq!(state.notice.unwrap().title, "Error");
    }

    #[tokio::test]
    async fn test_blank_execute_is_noop() {
        let (mut app, state) = connected_app(Box::new(MockDatabaseClient::new()), Role::Client);
        let before = state.clone();

        let state = app.handle(state, Action::Execute).await;
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn test_execute_while_disconnected() {
        let mut app = App::new(SessionManager::new(Config::default()));
        let state = app
            .handle(AppState::default(), Action::SetSql("SELECT 1".to_string()))
            .await;
        let state = app.handle(state, Action::Execute).await;

        let notice = state.notice.unwrap();
        assert_eq!(notice.title, "Connection Error");
        assert_eq!(notice.message, "Not connected to a database.");
    }

    #[tokio::test]
    async fn test_clear_actions() {
        let (mut app, mut state) = connected_app(Box::new(MockDatabaseClient::new()), Role::Client);
        state.sql_text = "SELECT 1".to_string();
        state.table = Some(accounts_table());

        let state = app.handle(state, Action::ClearSql).await;
        assert!(state.sql_text.is_empty());
        assert!(state.table.is_some());

        let state = app.handle(state, Action::ClearResults).await;
        assert!(state.table.is_none());
    }

    #[tokio::test]
    async fn test_clear_ignored_while_disconnected() {
        let mut app = App::new(SessionManager::new(Config::default()));
        let state = AppState {
            sql_text: "SELECT 1".to_string(),
            ..AppState::default()
        };
        let state = app.handle(state, Action::ClearSql).await;
        assert_eq!(state.sql_text, "SELECT 1");
    }

    #[tokio::test]
    async fn test_disconnect_updates_status() {
        let db = MockDatabaseClient::new();
        let closed = db.closed_flag();
        let (mut app, state) = connected_app(Box::new(db), Role::Client);

        let state = app.handle(state, Action::Disconnect).await;
        assert_eq!(state.status, ConnectionStatus::Disconnected);
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
        assert!(!state.can_execute());
    }

    #[tokio::test]
    async fn test_connect_failure_sets_notice() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            props_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let mut app = App::new(SessionManager::new(config));

        let request = ConnectRequest {
            role: Role::Client,
            database: Some("project3".to_string()),
            user_profile: Some("client1".to_string()),
            username: "client1".to_string(),
            password: "pw".to_string(),
        };
        let state = app.handle(AppState::default(), Action::Connect(request)).await;

        assert_eq!(state.status, ConnectionStatus::Disconnected);
        let notice = state.notice.unwrap();
        assert_eq!(notice.title, "Configuration Error");
        assert!(notice.message.contains("Cannot load properties"));
    }
}
