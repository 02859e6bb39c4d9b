//! Integration tests for sqldesk.
//!
//! Every test builds its own props directory and SQLite database.

pub mod app_test;
pub mod executor_test;
pub mod session_test;
pub mod usage_test;

use sqldesk::config::Config;
use sqldesk::policy::Role;
use sqldesk::session::ConnectRequest;
use std::path::PathBuf;
use tempfile::TempDir;

/// A props directory wired to one SQLite database.
pub struct Desk {
    pub dir: TempDir,
    pub db_path: PathBuf,
    pub config: Config,
}

impl Desk {
    /// Creates `project3`, `client1`, `project3app` and `theaccountant`
    /// profiles, all pointing at the same empty database file.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let props = dir.path().join("props");
        std::fs::create_dir(&props).unwrap();

        let db_path = dir.path().join("project3.db");
        std::fs::File::create(&db_path).unwrap();
        let source = format!(
            "driver=org.sqlite.JDBC\nurl=jdbc:sqlite:{}\n",
            db_path.display()
        );

        let write = |name: &str, body: &str| std::fs::write(props.join(name), body).unwrap();
        write("project3.properties", &source);
        write("client1.properties", "user=client1\npassword=client1pw\n");
        write(
            "project3app.properties",
            &format!("{source}user=project3app\npassword=apppw\n"),
        );
        write(
            "theaccountant.properties",
            &format!("{source}user=theaccountant\npassword=acctpw\n"),
        );

        let mut config = Config {
            props_dir: props,
            ..Config::default()
        };
        config.usage.create_table = true;

        Self {
            dir,
            db_path,
            config,
        }
    }

    pub fn client_login(&self) -> ConnectRequest {
        ConnectRequest {
            role: Role::Client,
            database: Some("project3".to_string()),
            user_profile: Some("client1".to_string()),
            username: "client1".to_string(),
            password: "client1pw".to_string(),
        }
    }

    pub fn accountant_login(&self) -> ConnectRequest {
        ConnectRequest {
            role: Role::Accountant,
            username: "theaccountant".to_string(),
            password: "acctpw".to_string(),
            ..ConnectRequest::default()
        }
    }
}
