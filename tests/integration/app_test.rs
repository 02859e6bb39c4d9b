//! Application state integration tests.
//!
//! Drives [`App`] through connect, execute and disconnect actions.

use super::Desk;
use sqldesk::app::{Action, App, AppState, ConnectionStatus};
use sqldesk::session::SessionManager;

#[tokio::test]
async fn test_full_interaction() {
    let desk = Desk::new();
    let mut app = App::new(SessionManager::new(desk.config.clone()));

    let state = app
        .handle(AppState::default(), Action::Connect(desk.client_login()))
        .await;
    assert_eq!(state.notice, None);
    assert_eq!(state.status.to_string(), "Connected as client1 to project3");

    let state = app
        .handle(state, Action::SetSql("CREATE TABLE bikes (id INTEGER)".to_string()))
        .await;
    let state = app.handle(state, Action::Execute).await;
    let notice = state.notice.clone().unwrap();
    assert_eq!(notice.title, "Update Result");
    assert_eq!(notice.message, "0 row(s) affected.");

    let state = app
        .handle(state, Action::SetSql("SELECT * FROM bikes".to_string()))
        .await;
    let state = app.handle(state, Action::Execute).await;
    let table = state.table.clone().unwrap();
    assert_eq!(table.column_count(), 1);
    assert!(table.is_empty());

    let state = app.handle(state, Action::Disconnect).await;
    assert_eq!(state.status, ConnectionStatus::Disconnected);
    assert!(!state.can_execute());
}

#[tokio::test]
async fn test_login_failure_notice() {
    let desk = Desk::new();
    let mut app = App::new(SessionManager::new(desk.config.clone()));

    let mut request = desk.client_login();
    request.password.clear();
    let state = app.handle(AppState::default(), Action::Connect(request)).await;

    let notice = state.notice.unwrap();
    assert_eq!(notice.title, "Login Failed");
    assert_eq!(notice.message, "Please enter both username and password.");
    assert_eq!(state.status, ConnectionStatus::Disconnected);
}
