//! RecruitAI CLI - sign in to a RecruitAI account from the terminal.
//!
//! Keeps the session in the configured credential store, so a login
//! survives between invocations until the refresh token expires or the
//! user logs out.

mod commands;

use std::io;

use anyhow::{Context, Result};
use recruitai_core::{ApiClient, Config, SessionState};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;

/// Log file name when `log_dir` is configured
const LOG_FILE: &str = "recruitai.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr unless the config names a log directory. The returned
/// guard flushes the file writer and must live until exit.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match config.log_dir {
        Some(ref dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, commands::USAGE);
            std::process::exit(2);
        }
    };
    if command == Command::Help {
        println!("{}", commands::USAGE);
        return Ok(());
    }

    let mut config = Config::load().context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config);
    info!(api_base = %config.api_base, "RecruitAI CLI starting");

    let store = config
        .credential_store()
        .context("Failed to open credential store")?;
    let client = ApiClient::new(&config, store).context("Failed to create API client")?;
    let session = SessionState::new(client);

    let result = commands::run(command, &session, &mut config).await;
    if let Err(ref e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    result
}
