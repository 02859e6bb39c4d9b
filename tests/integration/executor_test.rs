//! Statement execution integration tests.
//!
//! Runs statements through real sessions under both roles.

use super::Desk;
use sqldesk::db::Value;
use sqldesk::error::DeskError;
use sqldesk::policy::PolicyViolation;
use sqldesk::query::{ExecutionOutcome, QueryExecutor};
use sqldesk::session::SessionManager;

async fn client_session(desk: &Desk) -> SessionManager {
    let mut sessions = SessionManager::new(desk.config.clone());
    sessions.connect(&desk.client_login()).await.unwrap();
    sessions
}

async fn run(sessions: &SessionManager, sql: &str) -> sqldesk::error::Result<ExecutionOutcome> {
    QueryExecutor::new(sessions.active().unwrap()).execute(sql).await
}

#[tokio::test]
async fn test_client_writes_and_reads() {
    let desk = Desk::new();
    let sessions = client_session(&desk).await;

    run(&sessions, "CREATE TABLE riders (id INTEGER PRIMARY KEY, name TEXT, rating REAL)")
        .await
        .unwrap();
    let outcome = run(
        &sessions,
        "INSERT INTO riders (name, rating) VALUES ('ada', 4.5), ('grace', NULL);",
    )
    .await
    .unwrap();
    assert_eq!(outcome, ExecutionOutcome::Updated { rows_affected: 2 });
    assert_eq!(outcome.summary(), "2 row(s) affected.");

    let ExecutionOutcome::Table(table) = run(&sessions, "select name, rating from riders order by id")
        .await
        .unwrap()
    else {
        panic!("expected a table");
    };
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.column_name(0), Some("name"));
    assert_eq!(table.value_at(0, 0), Some(&Value::Text("ada".to_string())));
    assert_eq!(table.value_at(0, 1), Some(&Value::Float(4.5)));
    assert_eq!(table.value_at(1, 1), Some(&Value::Null));
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let desk = Desk::new();
    let sessions = client_session(&desk).await;
    run(&sessions, "CREATE TABLE accounts (id INTEGER, owner TEXT)")
        .await
        .unwrap();

    let ExecutionOutcome::Table(table) = run(&sessions, "SELECT id, owner FROM accounts")
        .await
        .unwrap()
    else {
        panic!("expected a table");
    };
    assert!(table.is_empty());
    assert_eq!(table.column_count(), 2);
}

#[tokio::test]
async fn test_accountant_cannot_modify() {
    let desk = Desk::new();
    let client = client_session(&desk).await;
    run(&client, "CREATE TABLE accounts (id INTEGER)").await.unwrap();
    run(&client, "INSERT INTO accounts VALUES (1)").await.unwrap();

    let mut sessions = SessionManager::new(desk.config.clone());
    sessions.connect(&desk.accountant_login()).await.unwrap();

    let err = run(&sessions, "DELETE FROM accounts").await.unwrap_err();
    assert!(matches!(
        err,
        DeskError::Policy(PolicyViolation::NotPermitted { .. })
    ));
    assert_eq!(err.category(), "Operation Not Permitted");

    let ExecutionOutcome::Table(table) = run(&sessions, "SELECT COUNT(*) AS n FROM accounts")
        .await
        .unwrap()
    else {
        panic!("expected a table");
    };
    assert_eq!(table.value_at(0, 0), Some(&Value::Int(1)));
}

#[tokio::test]
async fn test_multi_statement_rejected_before_execution() {
    let desk = Desk::new();
    let sessions = client_session(&desk).await;

    let err = run(&sessions, "CREATE TABLE a (x INTEGER); DROP TABLE a")
        .await
        .unwrap_err();
    assert!(matches!(err, DeskError::Policy(PolicyViolation::MultiStatement)));

    let err = run(&sessions, "SELECT * FROM a").await.unwrap_err();
    assert_eq!(err.to_string(), "no such table: a");
}

#[tokio::test]
async fn test_blank_statement_is_skipped() {
    let desk = Desk::new();
    let sessions = client_session(&desk).await;

    assert_eq!(run(&sessions, "   ").await.unwrap(), ExecutionOutcome::Skipped);
    assert_eq!(run(&sessions, ";").await.unwrap(), ExecutionOutcome::Skipped);
}
