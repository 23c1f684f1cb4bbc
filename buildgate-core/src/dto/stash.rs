//! Stash (Bitbucket Server) DTOs

use serde::{Deserialize, Serialize};

use crate::domain::change::{ChangeRequest, ChangedPath};
use crate::domain::report::{ReportedStatus, StatusReport};

/// `GET /rest/api/{version}/projects/{project}/repos/{repo}/pull-requests/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub id: u64,
    pub from_ref: Ref,
    pub to_ref: Ref,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ref {
    pub id: String,
    #[serde(alias = "latestChangeset")]
    pub latest_commit: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(rename = "self", default)]
    pub self_links: Vec<Link>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

impl From<PullRequest> for ChangeRequest {
    fn from(pr: PullRequest) -> Self {
        ChangeRequest {
            id: pr.id.to_string(),
            source_ref: pr.from_ref.id,
            target_ref: pr.to_ref.id,
            latest_commit: pr.from_ref.latest_commit,
            web_url: pr.links.self_links.into_iter().next().map(|l| l.href),
        }
    }
}

/// One page of `GET .../pull-requests/{id}/changes`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesPage {
    #[serde(default)]
    pub values: Vec<Change>,
    #[serde(default = "last_page_default")]
    pub is_last_page: bool,
    pub next_page_start: Option<u32>,
}

fn last_page_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    pub path: ChangePath,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePath {
    /// Directory part; empty for files at the repository root
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub name: String,
}

impl From<Change> for ChangedPath {
    fn from(change: Change) -> Self {
        ChangedPath::new(change.path.parent)
    }
}

/// Body of `POST /rest/build-status/1.0/commits/{commit}`
#[derive(Debug, Clone, Serialize)]
pub struct BuildStatusBody {
    pub state: ReportedStatus,
    pub key: String,
    pub name: String,
    pub url: String,
    pub description: String,
}

impl From<&StatusReport> for BuildStatusBody {
    fn from(report: &StatusReport) -> Self {
        BuildStatusBody {
            state: report.status,
            key: report.key.clone(),
            name: report.name.clone(),
            url: report.url.clone(),
            description: report.description.clone(),
        }
    }
}
