//! Local command action
//!
//! The shell command configured for "build required" runs to completion, but
//! its exit status is intentionally not acted on: a failing command neither
//! stops the gate nor changes its result. The status is only logged.

use std::process::ExitStatus;

use tokio::process::Command;
use tracing::{info, warn};

/// A shell command whose result is discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCommand {
    command: String,
}

impl LocalCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Run the command through the platform shell and forget about its status
    pub async fn run(&self) {
        match self.execute().await {
            Ok(status) => info!("Command [{}] finished with {}", self.command, status),
            Err(e) => warn!("Command [{}] could not be started: {}", self.command, e),
        }
    }

    async fn execute(&self) -> std::io::Result<ExitStatus> {
        info!("Running command [{}]", self.command);
        shell(&self.command).status().await
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
