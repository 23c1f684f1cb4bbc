//! Trigger command handler
//!
//! Runs the conditional trigger flow against the real Stash and TeamCity
//! clients and prints a short summary to stderr.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use buildgate_core::policy::{PathMatcher, parse_watched_folders};
use buildgate_core::service_message::ServiceMessage;
use clap::{ArgAction, Args};
use colored::*;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::config::{CompletionMode, Config, DEFAULT_POLL_INTERVAL_SECS, GateConfig, WaitPolicy};
use crate::service::{GateOutcome, WaitOutcome, run_gate};
use crate::sink::{MessageSink, StdoutSink};

/// Options of the `trigger` command
#[derive(Args, Debug)]
pub struct TriggerArgs {
    /// Framework branch to build, e.g. "pull-requests/42/from"
    #[arg(long, env = "BUILDGATE_FRAMEWORK_BRANCH")]
    framework_branch: String,

    /// Client branch passed to the build as the client_branch property
    #[arg(long, env = "BUILDGATE_CLIENT_BRANCH")]
    client_branch: Option<String>,

    /// Semicolon-separated list of watched folders
    #[arg(long, env = "BUILDGATE_CHECK_FOLDERS")]
    check_folders: String,

    /// Build configuration to trigger when a build is required
    #[arg(long, env = "BUILDGATE_CONFIGURATION_ID")]
    configuration_id: Option<String>,

    /// Build linked in Stash when the build is skipped in report mode
    #[arg(long, env = "BUILDGATE_ROOT_BUILD", alias = "root-configuration-id")]
    root_build: Option<String>,

    /// Shell command run when a build is required
    #[arg(long, env = "BUILDGATE_RUN_COMMAND")]
    run_command: Option<String>,

    /// Rewrite "/from" branches to "/merge" before triggering
    #[arg(
        long,
        env = "BUILDGATE_CONVERT_TO_MERGE",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    convert_to_merge: bool,

    /// Report the triggered build to Stash instead of waiting for it
    #[arg(
        long,
        env = "BUILDGATE_REPORT_MODE",
        alias = "request-stash-mode",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    report_mode: bool,

    /// Seconds between two build status requests
    #[arg(long, env = "BUILDGATE_POLL_INTERVAL", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval: u64,

    /// Give up waiting after this many seconds (waits forever when absent)
    #[arg(long, env = "BUILDGATE_WAIT_TIMEOUT")]
    wait_timeout: Option<u64>,

    /// Repository checkout the changed paths are relative to (defaults to the current directory)
    #[arg(long, env = "BUILDGATE_BASE_DIR")]
    base_dir: Option<PathBuf>,
}

impl TriggerArgs {
    fn gate_config(&self) -> GateConfig {
        GateConfig {
            framework_branch: self.framework_branch.clone(),
            client_branch: self.client_branch.clone(),
            watched_folders: parse_watched_folders(&self.check_folders),
            configuration_id: self.configuration_id.clone(),
            root_build: self.root_build.clone(),
            run_command: self.run_command.clone(),
            convert_to_merge: self.convert_to_merge,
            mode: if self.report_mode {
                CompletionMode::Report
            } else {
                CompletionMode::Wait
            },
            wait: WaitPolicy::new(
                Duration::from_secs(self.poll_interval),
                self.wait_timeout.map(Duration::from_secs),
            ),
        }
    }

    fn path_matcher(&self) -> Result<PathMatcher> {
        match &self.base_dir {
            Some(dir) => Ok(PathMatcher::new(dir)),
            None => PathMatcher::from_current_dir().context("Failed to read the current directory"),
        }
    }
}

/// Handle the trigger command
pub async fn handle_trigger_command(
    args: TriggerArgs,
    config: &Config,
    cancel: CancellationToken,
) -> Result<()> {
    let gate = args.gate_config();
    gate.validate()?;
    let matcher = args.path_matcher()?;

    let (review, ci) = super::connect(config)?;

    match run_gate(&gate, &review, &ci, &matcher, &StdoutSink, cancel).await {
        Ok(outcome) => print_outcome(&outcome),
        Err(e) => report_failure(&StdoutSink, &e),
    }

    Ok(())
}

/// Surface a failed run to the build server without failing the process
fn report_failure(sink: &dyn MessageSink, error: &anyhow::Error) {
    error!("Trigger failed: {:#}", error);
    sink.service(&ServiceMessage::error("Build gate failed", format!("{:#}", error)));
    eprintln!("{} {:#}", "Error:".red().bold(), error);
}

/// Print the gate summary
fn print_outcome(outcome: &GateOutcome) {
    let reason = outcome.decision.reason.code();
    if outcome.decision.required() {
        eprintln!("{} {}", "Build required:".green().bold(), reason);
    } else {
        eprintln!("{} {}", "Build not required:".yellow().bold(), reason);
    }

    if let Some(triggered) = &outcome.triggered {
        eprintln!("  {} {}", "Queued:".bold(), triggered.web_url.cyan());
    }

    match &outcome.wait {
        Some(WaitOutcome::Finished(status)) if status.is_failed() => {
            eprintln!("  {} {}", "Failed:".red().bold(), status.status_text);
        }
        Some(WaitOutcome::Finished(status)) => {
            eprintln!("  {} {}", "Succeeded:".green(), status.status_text);
        }
        Some(WaitOutcome::TimedOut(_)) => eprintln!("  {}", "Gave up waiting".yellow()),
        Some(WaitOutcome::Cancelled(_)) => eprintln!("  {}", "Wait cancelled".yellow()),
        None => {}
    }

    if let Some(report) = &outcome.report {
        eprintln!(
            "  {} {} for commit {}",
            "Reported:".bold(),
            report.status,
            report.commit.dimmed()
        );
    }
}
