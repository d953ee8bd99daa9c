//! gymlog - command-line workout tracker.
//!
//! Stores exercises, sessions, weight logs and reports as JSON documents in a
//! local data directory managed by `gymlog-store`.

use clap::Parser;
use gymlog::cli::{self, Cli};
use gymlog::{AppError, Config, Tracker};
use gymlog_store::DataStorage;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gymlog=info,gymlog_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err.report());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = Config::from_env()?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    tracing::debug!("Using data directory {}", config.data_dir.display());

    let storage = DataStorage::open(config.storage_config())?;
    let mut tracker = Tracker::open(storage)?;

    let stdout = io::stdout();
    cli::execute(cli.command, &mut tracker, &mut stdout.lock())
}
