//! Conditional trigger flow
//!
//! Decides whether the framework branch needs a build and acts on it. When a
//! build is required the local command runs first, then the CI build is
//! queued, then it is either waited for or reported to Stash as in progress.
//! Either way the flow ends by publishing `env.build_required`.

use anyhow::{Context, Result};
use buildgate_client::{CiServer, ReviewSystem};
use buildgate_core::domain::build::{BuildLocator, TriggeredBuild};
use buildgate_core::domain::change::ChangeRequest;
use buildgate_core::domain::report::{ReportedStatus, StatusReport};
use buildgate_core::policy::PathMatcher;
use buildgate_core::service_message::ServiceMessage;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::command::LocalCommand;
use super::decision::{BuildDecision, decide};
use super::trigger::{build_request, trigger_build};
use super::waiter::{BuildWaiter, WaitOutcome};
use crate::config::{CompletionMode, GateConfig};
use crate::sink::MessageSink;

/// Parameter published to the build server at the end of the flow
pub const BUILD_REQUIRED_PARAMETER: &str = "env.build_required";

/// Everything the gate did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub decision: BuildDecision,
    pub triggered: Option<TriggeredBuild>,
    pub wait: Option<WaitOutcome>,
    pub report: Option<StatusReport>,
}

impl GateOutcome {
    fn new(decision: BuildDecision) -> Self {
        Self {
            decision,
            triggered: None,
            wait: None,
            report: None,
        }
    }
}

/// Run the conditional trigger flow
pub async fn run_gate(
    config: &GateConfig,
    review: &dyn ReviewSystem,
    ci: &dyn CiServer,
    matcher: &PathMatcher,
    sink: &dyn MessageSink,
    cancel: CancellationToken,
) -> Result<GateOutcome> {
    sink.line("Check depends");

    let decision = decide(
        review,
        matcher,
        &config.framework_branch,
        &config.watched_folders,
    )
    .await?;

    sink.line(&decision.reason.to_string());
    info!(
        "Decision for {}: {}",
        config.framework_branch,
        decision.reason.code()
    );

    let mut outcome = GateOutcome::new(decision);

    if outcome.decision.required() {
        build(config, review, ci, sink, cancel, &mut outcome).await?;
    } else {
        skip(config, review, ci, sink, &mut outcome).await?;
    }

    sink.service(&ServiceMessage::set_parameter(
        BUILD_REQUIRED_PARAMETER,
        outcome.decision.required().to_string(),
    ));

    Ok(outcome)
}

async fn build(
    config: &GateConfig,
    review: &dyn ReviewSystem,
    ci: &dyn CiServer,
    sink: &dyn MessageSink,
    cancel: CancellationToken,
    outcome: &mut GateOutcome,
) -> Result<()> {
    if let Some(command) = &config.run_command {
        LocalCommand::new(command.as_str()).run().await;
    }

    let Some(configuration_id) = &config.configuration_id else {
        return Ok(());
    };

    let request = build_request(
        configuration_id,
        &config.framework_branch,
        config.client_branch.as_deref(),
        config.convert_to_merge,
    );
    let triggered = trigger_build(ci, &request).await?;

    match config.mode {
        CompletionMode::Report => {
            if let Some(change_request) = &outcome.decision.change_request {
                let report = StatusReport {
                    status: ReportedStatus::InProgress,
                    key: configuration_id.clone(),
                    name: configuration_id.clone(),
                    url: triggered.web_url.clone(),
                    commit: change_request.latest_commit.clone(),
                    description: "running".to_string(),
                };
                send_report(review, &report).await?;
                outcome.report = Some(report);
            } else {
                warn!(
                    "Branch {} has no change request, build {} is not reported",
                    config.framework_branch, triggered.id
                );
            }
        }
        CompletionMode::Wait => {
            let waiter = BuildWaiter::new(ci, sink, config.wait, cancel);
            let wait = waiter.wait(&triggered.id).await?;
            match &wait {
                WaitOutcome::TimedOut(_) => warn!("Gave up waiting for build {}", triggered.id),
                WaitOutcome::Cancelled(_) => warn!("Wait for build {} cancelled", triggered.id),
                WaitOutcome::Finished(_) => {}
            }
            outcome.wait = Some(wait);
        }
    }

    outcome.triggered = Some(triggered);
    Ok(())
}

async fn skip(
    config: &GateConfig,
    review: &dyn ReviewSystem,
    ci: &dyn CiServer,
    sink: &dyn MessageSink,
    outcome: &mut GateOutcome,
) -> Result<()> {
    match (&config.configuration_id, &config.run_command) {
        (Some(configuration_id), command) => {
            sink.line(&format!(
                "Build [{}] it is possible not to launch",
                configuration_id
            ));
            if let Some(command) = command {
                sink.line(&format!("Command [{}] it is possible not to launch", command));
            }
        }
        (None, Some(command)) => {
            sink.line(&format!("Command [{}] it is possible not to launch", command));
            sink.line("Build it is possible not to launch");
        }
        (None, None) => {}
    }

    if config.mode != CompletionMode::Report {
        return Ok(());
    }

    let Some(change_request) = &outcome.decision.change_request else {
        warn!(
            "Branch {} has no change request, nothing to report",
            config.framework_branch
        );
        return Ok(());
    };

    let Some(configuration_id) = &config.configuration_id else {
        return Ok(());
    };

    let Some(root_build) = &config.root_build else {
        warn!(
            "No root build configured, skipped build {} is not reported",
            configuration_id
        );
        return Ok(());
    };

    let report = skipped_report(ci, configuration_id, root_build, change_request).await?;
    send_report(review, &report).await?;
    outcome.report = Some(report);

    Ok(())
}

/// Successful status for a build that was never launched
async fn skipped_report(
    ci: &dyn CiServer,
    configuration_id: &str,
    root_build: &str,
    change_request: &ChangeRequest,
) -> Result<StatusReport> {
    let locator = BuildLocator::parse(root_build);
    let root = ci
        .get_build_status(&locator)
        .await
        .with_context(|| format!("Failed to fetch root build {}", locator))?;

    Ok(StatusReport {
        status: ReportedStatus::Successful,
        key: configuration_id.to_string(),
        name: configuration_id.to_string(),
        url: root.web_url,
        commit: change_request.latest_commit.clone(),
        description: "auto".to_string(),
    })
}

async fn send_report(review: &dyn ReviewSystem, report: &StatusReport) -> Result<()> {
    review
        .report_build_status(report)
        .await
        .with_context(|| format!("Failed to report {} for {}", report.status, report.key))?;

    info!(
        "Reported {} for {} on commit {}",
        report.status, report.key, report.commit
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WaitPolicy;
    use crate::fakes::{FakeCi, FakeReview, build as build_status, change_request};
    use crate::sink::InMemorySink;
    use buildgate_core::domain::build::{BuildOutcome, BuildState};

    fn gate(branch: &str, mode: CompletionMode) -> GateConfig {
        GateConfig {
            framework_branch: branch.to_string(),
            client_branch: None,
            watched_folders: vec!["Sources".to_string()],
            configuration_id: Some("Framework_Tests".to_string()),
            root_build: Some("Framework_Root".to_string()),
            run_command: None,
            convert_to_merge: true,
            mode,
            wait: WaitPolicy::default(),
        }
    }

    fn matcher() -> PathMatcher {
        PathMatcher::new("/repo")
    }

    fn development_review(paths: &[&str]) -> FakeReview {
        FakeReview::new().with_change_request(change_request("42", "refs/heads/development"), paths)
    }

    #[tokio::test]
    async fn test_skipped_build_in_wait_mode() {
        let review = development_review(&["Docs/readme.md"]);
        let ci = FakeCi::new();
        let sink = InMemorySink::new();
        let mut config = gate("42/from", CompletionMode::Wait);
        config.run_command = Some("make docs".to_string());

        let outcome = run_gate(&config, &review, &ci, &matcher(), &sink, CancellationToken::new())
            .await
            .unwrap();

        assert!(!outcome.decision.required());
        assert!(outcome.triggered.is_none());
        assert!(ci.triggered().is_empty());
        assert_eq!(
            sink.lines(),
            vec![
                "Check depends",
                "Changes do not affect any watched folder",
                "Build [Framework_Tests] it is possible not to launch",
                "Command [make docs] it is possible not to launch",
                "##teamcity[setParameter name='env.build_required' value='false']",
            ]
        );
    }

    #[tokio::test]
    async fn test_command_only_skip_lines() {
        let review = development_review(&[]);
        let ci = FakeCi::new();
        let sink = InMemorySink::new();
        let mut config = gate("42/from", CompletionMode::Wait);
        config.configuration_id = None;
        config.run_command = Some("make docs".to_string());

        run_gate(&config, &review, &ci, &matcher(), &sink, CancellationToken::new())
            .await
            .unwrap();

        assert!(sink.contains("Command [make docs] it is possible not to launch"));
        assert!(sink.contains("Build it is possible not to launch"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_required_build_is_triggered_and_awaited() {
        let review = FakeReview::new();
        let ci = FakeCi::new().with_statuses(
            "id:9001",
            vec![
                build_status("9001", BuildState::Running, None, "Compiling"),
                build_status("9001", BuildState::Finished, Some(BuildOutcome::Success), "Success"),
            ],
        );
        let sink = InMemorySink::new();
        let config = gate("development", CompletionMode::Wait);

        let outcome = run_gate(&config, &review, &ci, &matcher(), &sink, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.triggered.map(|t| t.id).as_deref(), Some("9001"));
        assert!(matches!(outcome.wait, Some(WaitOutcome::Finished(_))));
        assert_eq!(ci.triggered()[0].branch, "development");
        assert!(ci.triggered()[0].queue_at_top());
        assert!(review.calls().is_empty());

        let lines = sink.lines();
        assert_eq!(lines[1], "Build is required, because branch == development");
        assert_eq!(
            lines.last().map(String::as_str),
            Some("##teamcity[setParameter name='env.build_required' value='true']")
        );
    }

    #[tokio::test]
    async fn test_required_build_in_report_mode_is_not_awaited() {
        let review = development_review(&["Sources/Internal/Base/Type.h"]);
        let ci = FakeCi::new();
        let sink = InMemorySink::new();
        let config = gate("pull/42/from", CompletionMode::Report);

        let outcome = run_gate(&config, &review, &ci, &matcher(), &sink, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ci.triggered()[0].branch, "pull/42/merge");
        assert!(ci.status_calls().is_empty());
        assert!(outcome.wait.is_none());

        let reports = review.reports();
        assert_eq!(
            reports,
            vec![StatusReport {
                status: ReportedStatus::InProgress,
                key: "Framework_Tests".to_string(),
                name: "Framework_Tests".to_string(),
                url: "http://tc/viewLog.html?buildId=9001".to_string(),
                commit: "c0ffee42".to_string(),
                description: "running".to_string(),
            }]
        );
        assert!(sink.contains("value='true'"));
    }

    #[tokio::test]
    async fn test_skipped_build_in_report_mode_links_root_build() {
        let review = development_review(&["Docs/readme.md"]);
        let ci = FakeCi::new().with_status(
            "buildType:(id:Framework_Root)",
            build_status("600", BuildState::Finished, Some(BuildOutcome::Success), ""),
        );
        let sink = InMemorySink::new();
        let config = gate("42/from", CompletionMode::Report);

        let outcome = run_gate(&config, &review, &ci, &matcher(), &sink, CancellationToken::new())
            .await
            .unwrap();

        let report = outcome.report.unwrap();
        assert_eq!(report.status, ReportedStatus::Successful);
        assert_eq!(report.url, "http://tc/viewLog.html?buildId=600");
        assert_eq!(report.description, "auto");
        assert_eq!(report.commit, "c0ffee42");
        assert!(ci.triggered().is_empty());
        assert!(sink.contains("value='false'"));
    }

    #[tokio::test]
    async fn test_report_mode_without_root_build() {
        let sink = InMemorySink::new();
        let mut config = gate("pull/42/from", CompletionMode::Report);
        config.root_build = None;
        assert!(config.validate().is_ok());

        // required: triggered and reported as in progress
        let review = development_review(&["Sources/Internal/Base/Type.h"]);
        let ci = FakeCi::new();
        let outcome = run_gate(&config, &review, &ci, &matcher(), &sink, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ci.triggered().len(), 1);
        assert_eq!(
            outcome.report.map(|r| r.status),
            Some(ReportedStatus::InProgress)
        );

        // skipped: nothing to link, nothing reported
        let review = development_review(&["Docs/readme.md"]);
        let ci = FakeCi::new();
        let outcome = run_gate(&config, &review, &ci, &matcher(), &sink, CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.report.is_none());
        assert!(review.calls().iter().all(|c| !c.starts_with("report_build_status")));
        assert!(ci.status_calls().is_empty());
    }

    #[tokio::test]
    async fn test_report_mode_without_change_request_reports_nothing() {
        let review = FakeReview::new();
        let ci = FakeCi::new();
        let sink = InMemorySink::new();
        let config = gate("development", CompletionMode::Report);

        let outcome = run_gate(&config, &review, &ci, &matcher(), &sink, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ci.triggered().len(), 1);
        assert!(outcome.report.is_none());
        assert!(review.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_report_is_an_error() {
        let review = FakeReview::new()
            .with_change_request(change_request("42", "refs/heads/release"), &[])
            .failing_reports_for("Framework_Tests");
        let ci = FakeCi::new();
        let sink = InMemorySink::new();
        let config = gate("42/from", CompletionMode::Report);

        let err = run_gate(&config, &review, &ci, &matcher(), &sink, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Framework_Tests"));
        assert!(!sink.contains("setParameter"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_runs_when_build_is_required() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let review = FakeReview::new();
        let ci = FakeCi::new();
        let sink = InMemorySink::new();
        let mut config = gate("development", CompletionMode::Report);
        config.configuration_id = None;
        config.run_command = Some(format!("touch {}", marker.display()));

        run_gate(&config, &review, &ci, &matcher(), &sink, CancellationToken::new())
            .await
            .unwrap();

        assert!(marker.exists());
        assert!(ci.triggered().is_empty());
    }
}
