//! Build decision
//!
//! Single pass, no retries:
//! 1. a branch without a change request id always builds, without asking Stash
//! 2. a change request not targeting `development` always builds
//! 3. otherwise the build runs only if a watched folder changed

use std::fmt;

use anyhow::{Context, Result};
use buildgate_client::ReviewSystem;
use buildgate_core::domain::change::ChangeRequest;
use buildgate_core::policy::{PathMatcher, extract_request_id};
use tracing::{debug, info};

/// Target branch whose change requests are filtered by watched folders
pub const DEVELOPMENT_BRANCH: &str = "development";

/// Why a build is (or is not) required
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionReason {
    /// The branch does not encode a change request id
    NonReviewBranch { branch: String },
    /// The change request merges into something other than `development`
    TargetNotDevelopment { target_ref: String },
    /// A changed path hit this watched folder
    WatchedFolderChanged { folder: String },
    /// No changed path hit any watched folder
    NoWatchedChanges,
}

impl DecisionReason {
    pub fn requires_build(&self) -> bool {
        !matches!(self, DecisionReason::NoWatchedChanges)
    }

    /// Short machine-friendly form
    pub fn code(&self) -> &'static str {
        match self {
            DecisionReason::NonReviewBranch { .. } => "non-review branch",
            DecisionReason::TargetNotDevelopment { .. } => "target branch is not development",
            DecisionReason::WatchedFolderChanged { .. } => "watched folder changed",
            DecisionReason::NoWatchedChanges => "no watched folder changed",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::NonReviewBranch { branch } => {
                write!(f, "Build is required, because branch == {}", branch)
            }
            DecisionReason::TargetNotDevelopment { target_ref } => {
                write!(f, "Build is required, because target branch == {}", target_ref)
            }
            DecisionReason::WatchedFolderChanged { folder } => {
                write!(f, "Build is required because changes affect folder {}", folder)
            }
            DecisionReason::NoWatchedChanges => {
                write!(f, "Changes do not affect any watched folder")
            }
        }
    }
}

/// Outcome of the decision
///
/// The change request is kept whenever one was resolved, whatever the
/// decision, since later status reports need its commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDecision {
    pub reason: DecisionReason,
    pub change_request: Option<ChangeRequest>,
}

impl BuildDecision {
    pub fn required(&self) -> bool {
        self.reason.requires_build()
    }
}

/// Decide whether `framework_branch` needs a build
pub async fn decide(
    review: &dyn ReviewSystem,
    matcher: &PathMatcher,
    framework_branch: &str,
    watched_folders: &[String],
) -> Result<BuildDecision> {
    let Some(request_id) = extract_request_id(framework_branch) else {
        info!("Branch {} carries no change request id", framework_branch);
        return Ok(BuildDecision {
            reason: DecisionReason::NonReviewBranch {
                branch: framework_branch.to_string(),
            },
            change_request: None,
        });
    };

    let change_request = review
        .get_change_request(&request_id)
        .await
        .map_err(|e| {
            let message = if e.is_not_found() {
                format!("Change request {} does not exist", request_id)
            } else {
                format!("Failed to fetch change request {}", request_id)
            };
            anyhow::Error::new(e).context(message)
        })?;

    if change_request.target_branch_name() != DEVELOPMENT_BRANCH {
        return Ok(BuildDecision {
            reason: DecisionReason::TargetNotDevelopment {
                target_ref: change_request.target_ref.clone(),
            },
            change_request: Some(change_request),
        });
    }

    let changed_paths = review
        .get_changed_paths(&request_id)
        .await
        .with_context(|| format!("Failed to fetch changes of change request {}", request_id))?;

    debug!(
        "Change request {} touches {} path(s)",
        request_id,
        changed_paths.len()
    );

    let reason = match matcher.first_match(&changed_paths, watched_folders) {
        Some(folder) => DecisionReason::WatchedFolderChanged {
            folder: folder.to_string(),
        },
        None => DecisionReason::NoWatchedChanges,
    };

    Ok(BuildDecision {
        reason,
        change_request: Some(change_request),
    })
}
