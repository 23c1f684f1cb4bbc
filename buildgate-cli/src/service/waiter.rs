//! Build waiter
//!
//! Polls a triggered build until it reaches `finished`, printing a progress
//! line each time its status text changes. A failed build is reported as an
//! error service message with the build link; the waiter itself still
//! returns normally and leaves the verdict to the caller.
//!
//! The wait stops early when the [`CancellationToken`] fires or the
//! configured deadline passes. With [`WaitDeadline::Unbounded`] only
//! cancellation ends a wait on a build that never finishes.

use anyhow::{Context, Result};
use buildgate_client::CiServer;
use buildgate_core::domain::build::{BuildLocator, BuildStatus};
use buildgate_core::service_message::ServiceMessage;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{WaitDeadline, WaitPolicy};
use crate::sink::MessageSink;

/// How a wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The build reached `finished`
    Finished(BuildStatus),
    /// The deadline passed first; carries the last snapshot seen
    TimedOut(Option<BuildStatus>),
    /// The run was cancelled; carries the last snapshot seen
    Cancelled(Option<BuildStatus>),
}

/// Polls one build until it finishes
pub struct BuildWaiter<'a> {
    ci: &'a dyn CiServer,
    sink: &'a dyn MessageSink,
    policy: WaitPolicy,
    cancel: CancellationToken,
}

impl<'a> BuildWaiter<'a> {
    pub fn new(
        ci: &'a dyn CiServer,
        sink: &'a dyn MessageSink,
        policy: WaitPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            ci,
            sink,
            policy,
            cancel,
        }
    }

    /// Wait for build `build_id`
    pub async fn wait(&self, build_id: &str) -> Result<WaitOutcome> {
        let locator = BuildLocator::Id(build_id.to_string());
        let deadline = match self.policy.deadline {
            WaitDeadline::Unbounded => None,
            WaitDeadline::After(limit) => Some(Instant::now() + limit),
        };

        info!(
            "Waiting for build {} (interval: {:?}, deadline: {:?})",
            build_id, self.policy.interval, self.policy.deadline
        );

        let mut last_text = String::new();
        let mut last: Option<BuildStatus> = None;

        loop {
            let status = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(WaitOutcome::Cancelled(last)),
                _ = until(deadline) => return Ok(WaitOutcome::TimedOut(last)),
                status = self.ci.get_build_status(&locator) => status
                    .with_context(|| format!("Failed to fetch status of build {}", build_id))?,
            };

            debug!("Build {} is {}", build_id, status.state);

            if status.status_text != last_text {
                self.sink.line(&format!("{} ..", status.status_text));
                last_text = status.status_text.clone();
            }

            if status.state.is_terminal() {
                if status.is_failed() {
                    warn!("Build {} failed: {}", build_id, status.web_url);
                    self.sink
                        .service(&ServiceMessage::error("Build failed !!!", &status.web_url));
                } else {
                    info!("Build {} succeeded", build_id);
                }
                return Ok(WaitOutcome::Finished(status));
            }

            last = Some(status);

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(WaitOutcome::Cancelled(last)),
                _ = until(deadline) => return Ok(WaitOutcome::TimedOut(last)),
                _ = sleep(self.policy.interval) => {}
            }
        }
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
