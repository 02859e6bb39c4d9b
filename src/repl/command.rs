//! Input parsing for the interactive prompt.
//!
//! Distinguishes SQL statements from backslash commands and joins
//! continued lines.

/// Parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// SQL statement, passed to the executor as typed.
    Sql(String),
    /// Connect, optionally naming the database and user profiles.
    Connect {
        database: Option<String>,
        user_profile: Option<String>,
    },
    Disconnect,
    /// Clear the statement and the displayed result.
    Clear,
    Status,
    Profiles,
    Help,
    Quit,
    /// Unrecognized backslash command.
    Unknown(String),
}

/// Help text displayed for the `\help` command.
pub const HELP_TEXT: &str = r#"Enter a SQL statement to execute it. End a line with \ to continue on the next.

Commands:
  \connect [db] [user]  - Connect using a database and user profile
  \disconnect           - Close the session
  \clear                - Clear the statement and results
  \status               - Show connection status
  \profiles             - List available profiles
  \help, \?             - Show this help message
  \quit, \q             - Exit

Only SELECT, SHOW and DESC are allowed for the accountant role.
One statement at a time; a single trailing ';' is ignored."#;

/// Parses one complete input. Returns `None` for blank input.
pub fn parse(input: &str) -> Option<Command> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed.starts_with('\\') {
        return Some(Command::Sql(trimmed.to_string()));
    }

    let mut parts = trimmed.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let command = match name {
        "\\connect" | "\\c" => Command::Connect {
            database: args.first().map(|s| s.to_string()),
            user_profile: args.get(1).map(|s| s.to_string()),
        },
        "\\disconnect" => Command::Disconnect,
        "\\clear" => Command::Clear,
        "\\status" => Command::Status,
        "\\profiles" => Command::Profiles,
        "\\help" | "\\?" => Command::Help,
        "\\quit" | "\\q" | "\\exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    };
    Some(command)
}

/// Accumulates physical lines into one logical input.
///
/// A line ending in `\` continues on the next line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    /// Adds a line; returns the complete input once no continuation follows.
    pub fn push(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end();
        if !self.pending.is_empty() {
            self.pending.push('\n');
        }

        match line.strip_suffix('\\') {
            Some(head) if !is_bare_command(line) => {
                self.pending.push_str(head);
                None
            }
            _ => {
                self.pending.push_str(line);
                Some(std::mem::take(&mut self.pending))
            }
        }
    }

    /// Returns true while a continued input is waiting for more lines.
    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drops any partial input.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// A lone `\` or a command word must not be read as a continuation marker.
fn is_bare_command(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed == "\\" || (trimmed.starts_with('\\') && !trimmed.contains(char::is_whitespace))
}
