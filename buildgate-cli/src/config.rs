//! Configuration module
//!
//! Settings for both flows, built from the parsed command line and checked
//! with `validate()` before any collaborator is contacted.

use std::time::Duration;

use anyhow::bail;
use buildgate_client::{Credentials, StashRepository};

/// Default Stash REST API version
pub const DEFAULT_STASH_API_VERSION: &str = "1.0";
/// Default Stash project key
pub const DEFAULT_STASH_PROJECT: &str = "DF";
/// Default Stash repository slug
pub const DEFAULT_STASH_REPOSITORY: &str = "dava.framework";
/// Default delay between two build status polls, in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
/// Default timeout of a single Stash or TeamCity request, in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Connection settings shared by both flows
#[derive(Debug, Clone)]
pub struct Config {
    /// Stash base URL
    pub stash_url: String,
    /// Stash project/repository the change requests belong to
    pub stash_repository: StashRepository,
    /// TeamCity base URL
    pub teamcity_url: String,
    /// Login used for both Stash and TeamCity
    pub credentials: Credentials,
    /// Timeout of every single HTTP request
    pub http_timeout: Duration,
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_url("stash_url", &self.stash_url)?;
        validate_url("teamcity_url", &self.teamcity_url)?;

        if self.stash_repository.project.is_empty() {
            bail!("stash project cannot be empty");
        }

        if self.stash_repository.slug.is_empty() {
            bail!("stash repository cannot be empty");
        }

        if self.credentials.login.is_empty() {
            bail!("login cannot be empty");
        }

        if self.credentials.password.is_empty() {
            bail!("password cannot be empty");
        }

        if self.http_timeout.is_zero() {
            bail!("http timeout must be greater than 0");
        }

        Ok(())
    }
}

fn validate_url(name: &str, url: &str) -> anyhow::Result<()> {
    if url.is_empty() {
        bail!("{} cannot be empty", name);
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        bail!("{} must start with http:// or https://", name);
    }

    Ok(())
}

/// How long the waiter may block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitDeadline {
    /// Wait until the build finishes or the run is cancelled
    Unbounded,
    /// Give up after this long
    After(Duration),
}

/// Polling behaviour of the build waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub deadline: WaitDeadline,
}

impl WaitPolicy {
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            interval,
            deadline: match timeout {
                Some(limit) => WaitDeadline::After(limit),
                None => WaitDeadline::Unbounded,
            },
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS), None)
    }
}

/// What flow 1 does after triggering a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// Block until the build finishes
    Wait,
    /// Report the build to Stash as in progress and return
    Report,
}

/// Settings of the conditional-trigger flow
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Framework branch the build runs on; may encode a change request id
    pub framework_branch: String,
    /// Client branch passed to the triggered build
    pub client_branch: Option<String>,
    /// Folders whose changes require a build
    pub watched_folders: Vec<String>,
    /// Build configuration to trigger
    pub configuration_id: Option<String>,
    /// Build whose URL is reported when the build is skipped in report mode;
    /// without it a skipped build is not reported
    pub root_build: Option<String>,
    /// Shell command run when a build is required
    pub run_command: Option<String>,
    /// Rewrite `/from` branches to `/merge`
    pub convert_to_merge: bool,
    pub mode: CompletionMode,
    pub wait: WaitPolicy,
}

impl GateConfig {
    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.framework_branch.is_empty() {
            bail!("framework_branch cannot be empty");
        }

        if self.wait.interval.is_zero() {
            bail!("poll interval must be greater than 0");
        }

        if let WaitDeadline::After(limit) = self.wait.deadline {
            if limit.is_zero() {
                bail!("wait timeout must be greater than 0");
            }
        }

        if self.mode == CompletionMode::Report && self.configuration_id.is_none() {
            bail!("report mode needs a configuration_id to report under");
        }

        Ok(())
    }
}

/// Settings of the status-propagation flow
#[derive(Debug, Clone)]
pub struct PropagateConfig {
    /// Commit to report against; looked up in the dependencies when absent
    pub commit: Option<String>,
    /// Dependency build type tracked through the build it launched
    pub custom_dependent_build: Option<String>,
    /// Container build whose dependencies are reported
    pub container_build: String,
}

impl PropagateConfig {
    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.container_build.trim().is_empty() {
            bail!("container build cannot be empty");
        }

        if matches!(&self.commit, Some(commit) if commit.trim().is_empty()) {
            bail!("commit cannot be empty when given");
        }

        Ok(())
    }
}
