//! Session integration tests.
//!
//! Tests logins against property files and real SQLite connections.

use super::Desk;
use sqldesk::error::DeskError;
use sqldesk::policy::Role;
use sqldesk::session::SessionManager;

#[tokio::test]
async fn test_client_login_opens_counted_session() {
    let desk = Desk::new();
    let mut sessions = SessionManager::new(desk.config.clone());

    let info = sessions.connect(&desk.client_login()).await.unwrap().clone();
    assert_eq!(info.role, Role::Client);
    assert_eq!(info.username, "client1");
    assert_eq!(info.database, "project3");
    assert!(info.target.contains("sqlite"), "target was {}", info.target);

    let active = sessions.active().unwrap();
    assert!(active.usage.is_some());

    sessions.disconnect().await.unwrap();
    assert!(!sessions.is_connected());
}

#[tokio::test]
async fn test_accountant_login_is_not_counted() {
    let desk = Desk::new();
    let mut sessions = SessionManager::new(desk.config.clone());

    sessions.connect(&desk.accountant_login()).await.unwrap();
    let active = sessions.active().unwrap();
    assert_eq!(active.info.role, Role::Accountant);
    assert!(active.usage.is_none());
}

#[tokio::test]
async fn test_wrong_password_names_the_credential_file() {
    let desk = Desk::new();
    let mut sessions = SessionManager::new(desk.config.clone());

    let mut request = desk.client_login();
    request.password = "guess".to_string();

    let err = sessions.connect(&request).await.unwrap_err();
    assert!(matches!(err, DeskError::Credentials(_)));
    assert_eq!(err.detail(), "Credentials do not match client1.properties");
    assert!(!sessions.is_connected());
}

#[tokio::test]
async fn test_failed_login_keeps_open_session() {
    let desk = Desk::new();
    let mut sessions = SessionManager::new(desk.config.clone());
    sessions.connect(&desk.client_login()).await.unwrap();

    let mut request = desk.accountant_login();
    request.password = "nope".to_string();
    assert!(sessions.connect(&request).await.is_err());

    assert_eq!(sessions.info().unwrap().username, "client1");
}

#[tokio::test]
async fn test_missing_profile_is_config_error() {
    let desk = Desk::new();
    let mut sessions = SessionManager::new(desk.config.clone());

    let mut request = desk.client_login();
    request.database = Some("bikedb".to_string());

    let err = sessions.connect(&request).await.unwrap_err();
    assert!(matches!(err, DeskError::Config(_)));
}

#[tokio::test]
async fn test_missing_database_file_is_connection_error() {
    let desk = Desk::new();
    std::fs::remove_file(&desk.db_path).unwrap();
    let mut sessions = SessionManager::new(desk.config.clone());

    let err = sessions.connect(&desk.client_login()).await.unwrap_err();
    assert!(matches!(err, DeskError::Connection(_)), "got {err:?}");
}

#[test]
fn test_profile_discovery_lists_existing_files() {
    let desk = Desk::new();
    let sessions = SessionManager::new(desk.config.clone());

    assert_eq!(sessions.database_profiles(), vec!["project3".to_string()]);
    assert_eq!(sessions.user_profiles(), vec!["client1".to_string()]);
}
