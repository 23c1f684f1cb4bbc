//! Change request domain types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A change request (pull request) as seen by the review system
///
/// Resolved once per run from the request id embedded in a branch name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Identifier extracted from the branch reference
    pub id: String,
    /// Source ref, e.g. `refs/heads/feature/foo`
    pub source_ref: String,
    /// Target ref, e.g. `refs/heads/development`
    pub target_ref: String,
    /// Latest commit of the source ref
    pub latest_commit: String,
    /// Link to the change request in the review system UI
    pub web_url: Option<String>,
}

impl ChangeRequest {
    /// Last `/`-separated segment of the target ref
    pub fn target_branch_name(&self) -> &str {
        self.target_ref.rsplit('/').next().unwrap_or_default()
    }
}

/// A single entry of a change request diff, reduced to its containing directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangedPath {
    /// Directory containing the changed file, relative to the repository root
    pub parent: PathBuf,
}

impl ChangedPath {
    pub fn new(parent: impl Into<PathBuf>) -> Self {
        Self {
            parent: parent.into(),
        }
    }

    /// Build from a full file path, keeping only the directory part
    pub fn from_file_path(path: impl AsRef<Path>) -> Self {
        let parent = path
            .as_ref()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self { parent }
    }
}
