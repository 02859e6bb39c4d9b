//! Session manager for credential checks, connecting and disconnecting.

use std::sync::Arc;

use super::{ConnectRequest, SessionInfo};
use crate::config::{Config, ConnectionConfig, Properties};
use crate::db::{Connector, DatabaseClient, DriverConnector};
use crate::error::{DeskError, Result};
use crate::policy::Role;
use crate::usage::UsageTracker;
use tracing::{debug, info, warn};

/// An open session with its metadata.
pub struct ActiveSession {
    /// Who is connected, where, and under which role.
    pub info: SessionInfo,
    /// Database client owning the session's connection.
    pub db: Box<dyn DatabaseClient>,
    /// Usage tracker, present only when this user's operations are counted.
    pub usage: Option<UsageTracker>,
}

/// Owns the single open session of the running instance.
pub struct SessionManager {
    config: Config,
    connector: Arc<dyn Connector>,
    usage_connector: Arc<dyn Connector>,
    active: Option<ActiveSession>,
}

impl SessionManager {
    /// Creates a manager that opens sessions through the real drivers.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connector: Arc::new(DriverConnector::default()),
            usage_connector: Arc::new(DriverConnector::single_attempt()),
            active: None,
        }
    }

    /// Creates a manager that opens every session, logging ones included,
    /// through `connector`.
    pub fn with_connector(config: Config, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            usage_connector: Arc::clone(&connector),
            connector,
            active: None,
        }
    }

    /// Creates a manager with an existing session.
    pub fn with_session(config: Config, session: ActiveSession) -> Self {
        let mut manager = Self::new(config);
        manager.active = Some(session);
        manager
    }

    /// The application configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves a request to its connection descriptor and credential file name.
    pub fn resolve(&self, request: &ConnectRequest) -> Result<(ConnectionConfig, String)> {
        match request.role {
            Role::Accountant => {
                let path = self.config.profile_path(&self.config.accountant.credentials);
                let props = Properties::load(&path)?;
                Ok((ConnectionConfig::from_properties(&props)?, props.source_name()))
            }
            Role::Client => {
                let database = request.database.as_deref().ok_or_else(|| {
                    DeskError::config("No database profile selected")
                })?;
                let user = request.user_profile.as_deref().ok_or_else(|| {
                    DeskError::config("No user profile selected")
                })?;
                let db_props = Properties::load(&self.config.profile_path(database))?;
                let user_props = Properties::load(&self.config.profile_path(user))?;
                Ok((
                    ConnectionConfig::from_pair(&db_props, &user_props)?,
                    user_props.source_name(),
                ))
            }
        }
    }

    /// Verifies the login and opens a session, replacing any open one.
    ///
    /// Credential failures leave an existing session untouched; once the login
    /// checks out, the old session is closed before the new one is opened.
    pub async fn connect(&mut self, request: &ConnectRequest) -> Result<&SessionInfo> {
        if request.username.trim().is_empty() || request.password.is_empty() {
            return Err(DeskError::credentials(
                "Please enter both username and password.",
            ));
        }

        let (config, credential_file) = self.resolve(request)?;
        let username = request.username.trim();

        if !config.matches_login(username, &request.password) {
            warn!("Login rejected for {} against {}", username, credential_file);
            return Err(DeskError::credentials(format!(
                "Credentials do not match {credential_file}"
            )));
        }

        self.disconnect().await?;

        let db = self.connector.open(&config).await?;
        let info = SessionInfo {
            role: request.role,
            username: config.user.clone(),
            database: request
                .database
                .clone()
                .or_else(|| config.database_name())
                .unwrap_or_else(|| config.display_string()),
            target: config.display_string(),
        };
        let usage = self.usage_tracker_for(&info);

        info!(
            "Connected as {} ({}) to {}",
            info.username, info.role, info.target
        );

        let session = self.active.insert(ActiveSession { info, db, usage });
        Ok(&session.info)
    }

    /// Builds the usage tracker for a session, if its user is counted.
    fn usage_tracker_for(&self, info: &SessionInfo) -> Option<UsageTracker> {
        if !info.role.is_logged() || self.config.is_exempt(&info.username) {
            debug!("Usage counting disabled for {}", info.username);
            return None;
        }

        let path = self.config.profile_path(&self.config.client.logging);
        match ConnectionConfig::load_single(&path) {
            Ok(logging) => Some(UsageTracker::new(
                logging,
                &self.config.usage,
                Arc::clone(&self.usage_connector),
            )),
            Err(e) => {
                warn!("Usage counting disabled: {}", e);
                None
            }
        }
    }

    /// Closes the open session, if any. Calling it again is a no-op.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(session) = self.active.take() {
            debug!("Closing session for {}", session.info.username);
            session.db.close().await?;
        }
        Ok(())
    }

    /// The open session.
    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    /// Metadata of the open session.
    pub fn info(&self) -> Option<&SessionInfo> {
        self.active.as_ref().map(|s| &s.info)
    }

    /// Check if there's an open session.
    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    /// Database profiles the client may pick from.
    pub fn database_profiles(&self) -> Vec<String> {
        self.config.available_profiles(&self.config.client.databases)
    }

    /// User profiles the client may pick from.
    pub fn user_profiles(&self) -> Vec<String> {
        self.config.available_profiles(&self.config.client.users)
    }
}
