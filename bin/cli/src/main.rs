mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;
use seed_portal_access::{FileStorage, HttpPortalBackend, Rehydration, SessionManager};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::CliConfig;
use crate::error::{CliError, backend_failed};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays clean.
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            tracing::debug!(error = %report, "command failed");
            eprintln!("error: {}", report.current_context());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> seed_portal_core::Result<(), CliError> {
    let config = CliConfig::from_env().map_err(|e| CliError::Config {
        reason: e.to_string(),
    })?;
    let path = cli
        .storage
        .or_else(|| config.storage_path())
        .ok_or(CliError::NoStorageLocation)?;

    let backend = HttpPortalBackend::new(config.portal_api()).map_err(backend_failed)?;
    let mut manager = SessionManager::new(backend, FileStorage::open(path.clone()));

    match manager.rehydrate() {
        Rehydration::DiscardedCorrupt => tracing::warn!(
            path = %path.display(),
            "stored session was unreadable and has been cleared"
        ),
        outcome => tracing::debug!(?outcome, path = %path.display(), "session loaded"),
    }

    commands::run(&mut manager, cli.command).await
}
