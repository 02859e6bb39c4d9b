//! Interactive prompt for sqldesk.
//!
//! Reads lines with rustyline, turns them into [`Action`]s and prints the
//! resulting state.

pub mod command;
pub mod output;

pub use command::{Command, LineBuffer, HELP_TEXT};

use crate::app::{Action, App, AppState};
use crate::error::{DeskError, Result};
use crate::policy::Role;
use crate::session::ConnectRequest;
use crate::table::{render_text, ResultTable};
use crossterm::style::Stylize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, error, info, warn};

const CONTINUATION_PROMPT: &str = "    -> ";

/// Whether the loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// The interactive session loop.
pub struct Repl {
    app: App,
    state: AppState,
    /// Login and profile choices from the command line, used by `\connect`.
    defaults: ConnectRequest,
    styled: bool,
}

impl Repl {
    pub fn new(app: App, defaults: ConnectRequest) -> Self {
        let state = AppState {
            status: app.current_status(),
            ..AppState::default()
        };
        Self {
            app,
            state,
            defaults,
            styled: true,
        }
    }

    /// Runs until `\quit` or end of input, then closes the session.
    pub async fn run(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()
            .map_err(|e| DeskError::internal(format!("Cannot start line editor: {e}")))?;

        println!(
            "sqldesk {} ({} role). Type \\help for help.",
            env!("CARGO_PKG_VERSION"),
            self.defaults.role
        );

        if !self.defaults.username.is_empty() {
            self.connect(&mut rl, None, None).await;
        } else {
            println!("{}", output::status_line(&self.state.status, self.styled));
        }

        let mut buffer = LineBuffer::default();
        loop {
            let prompt = if buffer.is_pending() {
                CONTINUATION_PROMPT.to_string()
            } else {
                self.prompt()
            };

            match rl.readline(&prompt) {
                Ok(line) => {
                    let Some(input) = buffer.push(&line) else {
                        continue;
                    };
                    let Some(command) = command::parse(&input) else {
                        continue;
                    };
                    let _ = rl.add_history_entry(input.as_str());

                    if self.dispatch(&mut rl, command).await == Flow::Quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    if buffer.is_pending() {
                        buffer.clear();
                        println!("{}", "Statement cancelled".yellow());
                    } else {
                        println!("{}", "Use \\quit or \\q to exit".dim());
                    }
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    error!("Readline error: {}", e);
                    break;
                }
            }
        }

        if let Err(e) = self.app.close().await {
            warn!("Error while closing session on exit: {}", e);
        }
        info!("Interactive session ended");
        Ok(())
    }

    fn prompt(&self) -> String {
        match self.app.sessions().info() {
            Some(info) => format!("{}@{}> ", info.username, info.database),
            None => "sqldesk> ".to_string(),
        }
    }

    async fn dispatch(&mut self, rl: &mut DefaultEditor, command: Command) -> Flow {
        debug!("Dispatching {:?}", command);
        match command {
            Command::Sql(sql) => self.execute(sql).await,
            Command::Connect {
                database,
                user_profile,
            } => self.connect(rl, database, user_profile).await,
            Command::Disconnect => {
                self.apply(Action::Disconnect).await;
                println!("{}", output::status_line(&self.state.status, self.styled));
            }
            Command::Clear => {
                if self.state.can_clear_results() {
                    self.apply(Action::ClearSql).await;
                    self.apply(Action::ClearResults).await;
                    println!("Cleared.");
                } else {
                    println!("{}", "Nothing to clear while disconnected.".dim());
                }
            }
            Command::Status => self.print_status(),
            Command::Profiles => self.print_profiles(),
            Command::Help => println!("{HELP_TEXT}"),
            Command::Quit => return Flow::Quit,
            Command::Unknown(name) => {
                let message = format!("Unknown command: {name}. Type \\help for help.");
                println!("{}", message.red());
            }
        }
        Flow::Continue
    }

    async fn apply(&mut self, action: Action) {
        let state = std::mem::take(&mut self.state);
        self.state = self.app.handle(state, action).await;
    }

    async fn execute(&mut self, sql: String) {
        self.apply(Action::SetSql(sql)).await;
        self.apply(Action::Execute).await;

        if self.state.table_refreshed {
            if let Some(table) = &self.state.table {
                self.print_table(table);
            }
        }
        self.print_notice();
    }

    async fn connect(
        &mut self,
        rl: &mut DefaultEditor,
        database: Option<String>,
        user_profile: Option<String>,
    ) {
        let mut request = build_request(&self.defaults, database, user_profile);

        if request.username.is_empty() {
            match rl.readline("Username: ") {
                Ok(name) => request.username = name.trim().to_string(),
                Err(_) => return,
            }
        }
        if request.password.is_empty() {
            match rpassword::prompt_password("Password: ") {
                Ok(password) => request.password = password,
                Err(e) => {
                    warn!("Cannot read password: {}", e);
                    return;
                }
            }
        }

        let username = request.username.clone();
        self.apply(Action::Connect(request)).await;

        match &self.state.notice {
            Some(notice) if notice.title == "Login Failed" => {
                // Ask again next time instead of retrying a known-bad password.
                self.defaults.password.clear();
            }
            Some(_) => {}
            None => self.defaults.username = username,
        }

        self.print_notice();
        println!("{}", output::status_line(&self.state.status, self.styled));
    }

    fn print_table(&self, table: &ResultTable) {
        for line in render_text(table, output::terminal_width(), self.styled) {
            println!("{line}");
        }
    }

    fn print_notice(&self) {
        if let Some(notice) = &self.state.notice {
            for line in output::notice_lines(notice, self.styled) {
                println!("{line}");
            }
        }
    }

    fn print_status(&self) {
        println!("{}", output::status_line(&self.state.status, self.styled));
        if let Some(info) = self.app.sessions().info() {
            println!("  Role:   {}", info.role);
            println!("  Target: {}", info.target);
        }
    }

    fn print_profiles(&self) {
        let sessions = self.app.sessions();
        let lines = match self.defaults.role {
            Role::Client => {
                let mut lines = output::profile_lines("Databases", &sessions.database_profiles());
                lines.extend(output::profile_lines("Users", &sessions.user_profiles()));
                lines
            }
            Role::Accountant => output::profile_lines(
                "Credentials",
                &[sessions.config().accountant.credentials.clone()],
            ),
        };
        for line in lines {
            println!("{line}");
        }
    }
}

/// Fills a connect request from `\connect` arguments, falling back to the
/// command-line choices.
fn build_request(
    defaults: &ConnectRequest,
    database: Option<String>,
    user_profile: Option<String>,
) -> ConnectRequest {
    ConnectRequest {
        role: defaults.role,
        database: database.or_else(|| defaults.database.clone()),
        user_profile: user_profile.or_else(|| defaults.user_profile.clone()),
        username: defaults.username.clone(),
        password: defaults.password.clone(),
    }
}
