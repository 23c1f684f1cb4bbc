//! Collaborator traits
//!
//! The service layer only sees these traits, so the HTTP clients can be
//! swapped for in-memory fakes in tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use buildgate_core::domain::build::{
    BuildLocator, BuildRequest, BuildStatus, ConfigurationInfo, TriggeredBuild,
};
use buildgate_core::domain::change::{ChangeRequest, ChangedPath};
use buildgate_core::domain::report::StatusReport;

use crate::error::Result;

/// Code-review system holding change requests and per-commit build statuses
#[async_trait]
pub trait ReviewSystem: Send + Sync {
    /// Fetch change request metadata
    ///
    /// # Arguments
    /// * `id` - Change request id as extracted from a branch name
    async fn get_change_request(&self, id: &str) -> Result<ChangeRequest>;

    /// Fetch every changed path of a change request, in diff order
    async fn get_changed_paths(&self, id: &str) -> Result<Vec<ChangedPath>>;

    /// Attach a build status to a commit
    async fn report_build_status(&self, report: &StatusReport) -> Result<()>;
}

/// CI server running the builds
#[async_trait]
pub trait CiServer: Send + Sync {
    /// Enqueue a build
    async fn trigger_build(&self, request: &BuildRequest) -> Result<TriggeredBuild>;

    /// Current snapshot of a build
    async fn get_build_status(&self, locator: &BuildLocator) -> Result<BuildStatus>;

    /// Resulting properties of a build
    async fn get_build_properties(&self, build_id: &str) -> Result<BTreeMap<String, String>>;

    /// Name and logical path of a build configuration
    async fn get_configuration_info(&self, build_type_id: &str) -> Result<ConfigurationInfo>;
}
