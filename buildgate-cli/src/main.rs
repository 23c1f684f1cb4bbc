//! Buildgate CLI
//!
//! Gates TeamCity builds on the folders a Stash pull request touches, and
//! propagates the statuses of dependent builds back to Stash.

mod commands;
mod config;
#[cfg(test)]
mod fakes;
mod service;
mod sink;

use std::future::Future;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use commands::{Commands, ConnectionArgs, handle_command};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Time a command gets to wind down after Ctrl-C
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "buildgate")]
#[command(about = "Folder-aware build gate for Stash and TeamCity", long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "buildgate_cli=info,buildgate_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = cli.connection.into_config()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, stopping");
                on_interrupt.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    run_until_interrupted(
        handle_command(cli.command, &config, cancel.clone()),
        cancel,
        SHUTDOWN_GRACE,
    )
    .await
}

/// Drive `command` to completion unless `cancel` fires
///
/// Once cancelled the command gets `grace` to finish on its own, then it is
/// dropped and the run fails.
async fn run_until_interrupted<F>(
    command: F,
    cancel: CancellationToken,
    grace: Duration,
) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    tokio::pin!(command);

    tokio::select! {
        result = &mut command => result,
        _ = cancel.cancelled() => match tokio::time::timeout(grace, &mut command).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Command did not stop within {:?}", grace);
                bail!("Interrupted")
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_finished_command_is_returned() {
        let cancel = CancellationToken::new();
        let result = run_until_interrupted(async { Ok(()) }, cancel, SHUTDOWN_GRACE).await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_stops_stuck_command() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run_until_interrupted(std::future::pending(), cancel, SHUTDOWN_GRACE)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Interrupted");
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_lets_command_wind_down() {
        let cancel = CancellationToken::new();
        let observed = cancel.clone();
        let command = async move {
            observed.cancelled().await;
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        };
        cancel.cancel();

        assert!(run_until_interrupted(command, cancel, SHUTDOWN_GRACE).await.is_ok());
    }
}
