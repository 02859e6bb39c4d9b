//! Usage counter integration tests.
//!
//! Counters are written through a separate logging session.

use super::Desk;
use sqldesk::config::ConnectionConfig;
use sqldesk::db;
use sqldesk::query::QueryExecutor;
use sqldesk::session::SessionManager;
use sqldesk::usage::{fetch_counter, UsageCounter};

async fn counter_for(desk: &Desk, username: &str) -> Option<UsageCounter> {
    let path = desk.config.profile_path(&desk.config.client.logging);
    let config = ConnectionConfig::load_single(&path).unwrap();
    let conn = db::connect(&config).await.unwrap();
    let counter = fetch_counter(conn.as_ref(), &desk.config.usage.table, username)
        .await
        .unwrap();
    conn.close().await.unwrap();
    counter
}

#[tokio::test]
async fn test_client_operations_are_counted_by_kind() {
    let desk = Desk::new();
    let mut sessions = SessionManager::new(desk.config.clone());
    sessions.connect(&desk.client_login()).await.unwrap();
    let session = sessions.active().unwrap();
    let executor = QueryExecutor::new(session);

    executor.execute("CREATE TABLE t (x INTEGER)").await.unwrap();
    executor.execute("INSERT INTO t VALUES (1)").await.unwrap();
    executor.execute("SELECT * FROM t").await.unwrap();

    let counter = counter_for(&desk, "client1").await.unwrap();
    assert_eq!(counter.num_queries, 1);
    assert_eq!(counter.num_updates, 2);
}

#[tokio::test]
async fn test_failed_and_rejected_statements_are_not_counted() {
    let desk = Desk::new();
    let mut sessions = SessionManager::new(desk.config.clone());
    sessions.connect(&desk.client_login()).await.unwrap();
    let executor = QueryExecutor::new(sessions.active().unwrap());

    executor.execute("SELECT 1").await.unwrap();
    assert!(executor.execute("SELECT * FROM missing").await.is_err());
    assert!(executor.execute("SELECT 1; SELECT 2").await.is_err());
    executor.execute("").await.unwrap();

    let counter = counter_for(&desk, "client1").await.unwrap();
    assert_eq!(counter.num_queries, 1);
    assert_eq!(counter.num_updates, 0);
}

#[tokio::test]
async fn test_accountant_operations_are_not_counted() {
    let desk = Desk::new();

    let mut client = SessionManager::new(desk.config.clone());
    client.connect(&desk.client_login()).await.unwrap();
    QueryExecutor::new(client.active().unwrap())
        .execute("SELECT 1")
        .await
        .unwrap();

    let mut sessions = SessionManager::new(desk.config.clone());
    sessions.connect(&desk.accountant_login()).await.unwrap();
    QueryExecutor::new(sessions.active().unwrap())
        .execute("SELECT 1")
        .await
        .unwrap();

    assert!(counter_for(&desk, "theaccountant").await.is_none());
}

#[tokio::test]
async fn test_unreachable_logging_database_does_not_fail_statements() {
    let desk = Desk::new();
    std::fs::write(
        desk.config.profile_path("project3app"),
        "driver=org.sqlite.JDBC\nurl=jdbc:sqlite:/nonexistent/dir/log.db\nuser=a\npassword=b\n",
    )
    .unwrap();

    let mut sessions = SessionManager::new(desk.config.clone());
    sessions.connect(&desk.client_login()).await.unwrap();

    let outcome = QueryExecutor::new(sessions.active().unwrap())
        .execute("SELECT 1")
        .await;
    assert!(outcome.is_ok());
}
