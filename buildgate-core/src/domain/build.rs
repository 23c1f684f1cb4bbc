//! Build domain types
//!
//! Snapshots of CI builds and the requests used to enqueue them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Build property holding the commit a dependent build was started for
pub const FROM_COMMIT_PROPERTY: &str = "env.from_commit";

/// Build property holding the id of the build launched by a custom dependent build
pub const RUN_BUILD_ID_PROPERTY: &str = "env.run_build_id";

/// Property override carrying the client branch to the triggered build
pub const CLIENT_BRANCH_PROPERTY: &str = "client_branch";

/// Lifecycle state of a CI build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildState {
    Queued,
    Running,
    Finished,
}

impl BuildState {
    /// Whether no further state change will happen
    pub fn is_terminal(self) -> bool {
        matches!(self, BuildState::Finished)
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildState::Queued => write!(f, "queued"),
            BuildState::Running => write!(f, "running"),
            BuildState::Finished => write!(f, "finished"),
        }
    }
}

/// Outcome of a build
///
/// Only meaningful once the build is finished. Anything the CI server reports
/// besides success and failure (errors, unknown) lands in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildOutcome {
    Success,
    Failure,
    #[serde(other)]
    Other,
}

/// A dependency edge of a container build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDependency {
    pub build_type_id: String,
    pub id: String,
}

/// Point-in-time snapshot of a build
///
/// Each poll produces a fresh snapshot; nothing is kept between polls except
/// what the caller chooses to remember.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStatus {
    pub id: String,
    pub state: BuildState,
    /// Defined only when the build is finished
    pub outcome: Option<BuildOutcome>,
    pub status_text: String,
    pub web_url: String,
    pub branch_name: Option<String>,
    pub build_type_id: String,
    /// Snapshot dependencies, in the order the CI server lists them
    pub dependencies: Vec<BuildDependency>,
}

impl BuildStatus {
    /// True when the build finished with anything but success
    pub fn is_failed(&self) -> bool {
        self.state.is_terminal() && self.outcome != Some(BuildOutcome::Success)
    }
}

/// Options attached to a queued build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TriggeringOption {
    /// Put the build at the top of the queue
    QueueAtTop,
}

/// Request to enqueue a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub configuration_id: String,
    pub branch: String,
    pub properties: BTreeMap<String, String>,
    pub options: Vec<TriggeringOption>,
}

impl BuildRequest {
    pub fn new(configuration_id: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            configuration_id: configuration_id.into(),
            branch: branch.into(),
            properties: BTreeMap::new(),
            options: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_option(mut self, option: TriggeringOption) -> Self {
        if !self.options.contains(&option) {
            self.options.push(option);
        }
        self
    }

    pub fn queue_at_top(&self) -> bool {
        self.options.contains(&TriggeringOption::QueueAtTop)
    }
}

/// What the CI server hands back after queueing a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredBuild {
    pub id: String,
    pub web_url: String,
}

/// Metadata of a build configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationInfo {
    /// Display name of the configuration
    pub name: String,
    /// Logical path: project followed by configuration name
    pub config_path: String,
}

/// How a build is addressed on the CI server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildLocator {
    /// A concrete build id
    Id(String),
    /// Latest build of a configuration
    LatestOf(String),
    /// A locator passed through verbatim
    Raw(String),
}

impl BuildLocator {
    /// Interpret a user-supplied value
    ///
    /// Digits only is a build id, anything with a `:` is already a locator,
    /// everything else names a build configuration.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
            BuildLocator::Id(value.to_string())
        } else if value.contains(':') {
            BuildLocator::Raw(value.to_string())
        } else {
            BuildLocator::LatestOf(value.to_string())
        }
    }
}

impl fmt::Display for BuildLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildLocator::Id(id) => write!(f, "id:{}", id),
            BuildLocator::LatestOf(build_type) => write!(f, "buildType:(id:{})", build_type),
            BuildLocator::Raw(raw) => write!(f, "{}", raw),
        }
    }
}

impl From<&str> for BuildLocator {
    fn from(s: &str) -> Self {
        BuildLocator::parse(s)
    }
}
