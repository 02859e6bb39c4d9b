//! sqldesk - An ad-hoc SQL desk with role-based statement policy.

use sqldesk::app::App;
use sqldesk::cli::{Cli, OutputFormat};
use sqldesk::config::Config;
use sqldesk::error::{DeskError, Result};
use sqldesk::logging::{self, LogMode};
use sqldesk::query::{ExecutionOutcome, QueryExecutor};
use sqldesk::repl::{output, Repl};
use sqldesk::session::SessionManager;
use sqldesk::table::render_text;
use std::io::IsTerminal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse_args();

    logging::init(LogMode::for_run(cli.is_one_shot()), cli.log_level());

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        eprintln!("{}: {}", e.category(), e.detail());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    cli.validate()?;

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = cli.load_config()?;
    info!("Profiles directory: {}", config.props_dir.display());

    match &cli.execute {
        Some(sql) => run_one_shot(&cli, config, sql).await,
        None => {
            let app = App::new(SessionManager::new(config));
            Repl::new(app, cli.connect_defaults()).run().await
        }
    }
}

/// Connects, runs a single statement, prints its result and disconnects.
async fn run_one_shot(cli: &Cli, config: Config, sql: &str) -> Result<()> {
    let request = cli
        .connect_request()
        .ok_or_else(|| DeskError::config("--execute requires --username"))?;

    let mut sessions = SessionManager::new(config);
    sessions.connect(&request).await?;

    let result = match sessions.active() {
        Some(session) => QueryExecutor::new(session).execute(sql).await,
        None => Err(DeskError::internal("Session vanished after connect")),
    };

    if let Err(e) = sessions.disconnect().await {
        warn!("Error while closing session: {}", e);
    }

    print_outcome(&result?, cli.format)
}

fn print_outcome(outcome: &ExecutionOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&output::outcome_json(outcome))
                .map_err(|e| DeskError::internal(format!("Cannot encode result: {e}")))?;
            println!("{json}");
        }
        OutputFormat::Text => match outcome {
            ExecutionOutcome::Skipped => {}
            ExecutionOutcome::Table(table) => {
                let styled = std::io::stdout().is_terminal();
                for line in render_text(table, output::terminal_width(), styled) {
                    println!("{line}");
                }
            }
            ExecutionOutcome::Updated { .. } => println!("{}", outcome.summary()),
        },
    }
    Ok(())
}
