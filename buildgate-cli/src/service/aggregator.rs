//! Status aggregator
//!
//! Reports the live status of every dependency of a container build to Stash,
//! one report per dependency, all against the same commit.
//!
//! A "custom dependent build" only launches another build and records its id
//! in the `env.run_build_id` property; it is tracked through that launched
//! build and reported under its configuration's logical path.

use anyhow::{Context, Result};
use buildgate_client::{CiServer, ReviewSystem};
use buildgate_core::domain::build::{
    BuildDependency, BuildLocator, BuildOutcome, BuildState, BuildStatus, FROM_COMMIT_PROPERTY,
    RUN_BUILD_ID_PROPERTY,
};
use buildgate_core::domain::report::{ReportedStatus, StatusReport};
use thiserror::Error;
use tracing::{error, info};

use crate::sink::MessageSink;

/// Fatal misconfigurations of the propagation flow
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregationError {
    /// No commit given and no dependency recorded one
    #[error("no commit given and no dependency of build {container} has an env.from_commit property")]
    MissingCommit { container: String },
}

/// A dependency whose status could not be resolved or reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyFailure {
    pub build_type_id: String,
    pub error: String,
}

/// What one propagation run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationSummary {
    pub commit: Option<String>,
    pub reported: Vec<StatusReport>,
    pub failed: Vec<DependencyFailure>,
}

/// Map a build snapshot to the status shown in Stash
///
/// `running` and `queued` win over any outcome; a finished build without a
/// known outcome is reported as failed with just its branch as description.
pub fn map_build_status(status: &BuildStatus) -> (ReportedStatus, String) {
    let branch = status.branch_name.as_deref().unwrap_or_default();
    let describe = |suffix: &str| {
        if branch.is_empty() {
            suffix.to_string()
        } else {
            format!("{} {}", branch, suffix)
        }
    };

    match (status.state, status.outcome) {
        (BuildState::Running, _) => (ReportedStatus::InProgress, describe("In progress ...")),
        (BuildState::Queued, _) => (ReportedStatus::InProgress, describe("Queued ...")),
        (_, Some(BuildOutcome::Success)) => (ReportedStatus::Successful, describe("Good job !")),
        (_, Some(BuildOutcome::Failure)) => (ReportedStatus::Failed, describe("Need to work !")),
        _ => (ReportedStatus::Failed, branch.to_string()),
    }
}

/// Propagates dependency statuses of a container build
pub struct StatusAggregator<'a> {
    ci: &'a dyn CiServer,
    review: &'a dyn ReviewSystem,
    sink: &'a dyn MessageSink,
    custom_dependent_build: Option<String>,
}

impl<'a> StatusAggregator<'a> {
    pub fn new(
        ci: &'a dyn CiServer,
        review: &'a dyn ReviewSystem,
        sink: &'a dyn MessageSink,
        custom_dependent_build: Option<String>,
    ) -> Self {
        Self {
            ci,
            review,
            sink,
            custom_dependent_build,
        }
    }

    /// Report every dependency of `container`
    ///
    /// Reporting one dependency never depends on another succeeding; failures
    /// are collected in the summary. A missing commit aborts before anything
    /// is reported.
    pub async fn propagate(
        &self,
        container: &BuildLocator,
        commit: Option<&str>,
    ) -> Result<AggregationSummary> {
        let container_status = self
            .ci
            .get_build_status(container)
            .await
            .with_context(|| format!("Failed to fetch container build {}", container))?;

        let dependencies = &container_status.dependencies;
        if dependencies.is_empty() {
            info!("Build {} has no dependencies, nothing to report", container);
            return Ok(AggregationSummary::default());
        }

        let commit = match commit {
            Some(commit) => commit.to_string(),
            None => self.resolve_commit(dependencies).await?.ok_or_else(|| {
                AggregationError::MissingCommit {
                    container: container.to_string(),
                }
            })?,
        };

        info!(
            "Reporting {} dependencies of {} against commit {}",
            dependencies.len(),
            container,
            commit
        );

        let mut summary = AggregationSummary {
            commit: Some(commit.clone()),
            ..Default::default()
        };

        for dependency in dependencies {
            match self.report_dependency(dependency, &commit).await {
                Ok(report) => summary.reported.push(report),
                Err(e) => {
                    error!("Failed to report {}: {:#}", dependency.build_type_id, e);
                    summary.failed.push(DependencyFailure {
                        build_type_id: dependency.build_type_id.clone(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        Ok(summary)
    }

    /// First commit recorded by a dependency, in dependency order
    async fn resolve_commit(&self, dependencies: &[BuildDependency]) -> Result<Option<String>> {
        for dependency in dependencies {
            let properties = self
                .ci
                .get_build_properties(&dependency.id)
                .await
                .with_context(|| format!("Failed to fetch properties of build {}", dependency.id))?;

            if let Some(commit) = properties
                .get(FROM_COMMIT_PROPERTY)
                .filter(|c| !c.is_empty())
            {
                info!("Using commit {} recorded by build {}", commit, dependency.id);
                return Ok(Some(commit.clone()));
            }
        }

        Ok(None)
    }

    fn is_custom(&self, dependency: &BuildDependency) -> bool {
        self.custom_dependent_build.as_deref() == Some(dependency.build_type_id.as_str())
    }

    /// Build whose status stands for `dependency`
    async fn effective_build_id(&self, dependency: &BuildDependency) -> Result<String> {
        if !self.is_custom(dependency) {
            return Ok(dependency.id.clone());
        }

        let properties = self
            .ci
            .get_build_properties(&dependency.id)
            .await
            .with_context(|| format!("Failed to fetch properties of build {}", dependency.id))?;

        Ok(properties
            .get(RUN_BUILD_ID_PROPERTY)
            .filter(|id| !id.is_empty())
            .cloned()
            .unwrap_or_else(|| dependency.id.clone()))
    }

    async fn report_dependency(
        &self,
        dependency: &BuildDependency,
        commit: &str,
    ) -> Result<StatusReport> {
        let build_id = self.effective_build_id(dependency).await?;

        let status = self
            .ci
            .get_build_status(&BuildLocator::Id(build_id.clone()))
            .await
            .with_context(|| format!("Failed to fetch status of build {}", build_id))?;

        let configuration = self
            .ci
            .get_configuration_info(&status.build_type_id)
            .await
            .with_context(|| format!("Failed to fetch configuration {}", status.build_type_id))?;

        let (reported, description) = map_build_status(&status);
        let name = if self.is_custom(dependency) {
            configuration.config_path
        } else {
            configuration.name
        };

        let report = StatusReport {
            status: reported,
            key: status.build_type_id,
            name,
            url: status.web_url,
            commit: commit.to_string(),
            description,
        };

        self.sink.line(&format!(
            "Update: configuration_name[ {} ] status[ {} ] commit[ {} ]",
            report.key, report.status, report.commit
        ));

        self.review
            .report_build_status(&report)
            .await
            .with_context(|| format!("Failed to report status of {}", report.key))?;

        Ok(report)
    }
}
