//! Build status reporting types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status attached to a commit in the review system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportedStatus {
    #[serde(rename = "INPROGRESS")]
    InProgress,
    #[serde(rename = "SUCCESSFUL")]
    Successful,
    #[serde(rename = "FAILED")]
    Failed,
}

impl fmt::Display for ReportedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportedStatus::InProgress => write!(f, "INPROGRESS"),
            ReportedStatus::Successful => write!(f, "SUCCESSFUL"),
            ReportedStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// One build status report for one commit
///
/// Sent once and forgotten; nothing keeps track of what was reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: ReportedStatus,
    /// Key identifying the build in the review system, usually a build type id
    pub key: String,
    /// Name shown next to the status
    pub name: String,
    pub url: String,
    pub commit: String,
    pub description: String,
}
