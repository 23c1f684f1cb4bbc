//! Stash (Bitbucket Server) client

use async_trait::async_trait;
use buildgate_core::domain::change::{ChangeRequest, ChangedPath};
use buildgate_core::domain::report::StatusReport;
use buildgate_core::dto::stash::{BuildStatusBody, ChangesPage, PullRequest};
use reqwest::Client;
use tracing::debug;

use crate::api::ReviewSystem;
use crate::error::{ClientError, Result};
use crate::{Credentials, handle_empty_response, handle_response, trim_base_url};

/// Page size requested when listing pull request changes
const CHANGES_PAGE_LIMIT: u32 = 500;

/// Repository coordinates inside a Stash instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashRepository {
    /// REST API version, e.g. "1.0"
    pub api_version: String,
    /// Project key, e.g. "DF"
    pub project: String,
    /// Repository slug
    pub slug: String,
}

/// HTTP client for the Stash REST API
#[derive(Debug, Clone)]
pub struct StashClient {
    base_url: String,
    repository: StashRepository,
    credentials: Credentials,
    client: Client,
}

impl StashClient {
    /// Create a new Stash client
    ///
    /// # Arguments
    /// * `base_url` - Root URL of the Stash instance (e.g., "https://stash.example.com")
    /// * `repository` - Project and repository the pull requests live in
    /// * `credentials` - Basic-auth login
    pub fn new(
        base_url: impl Into<String>,
        repository: StashRepository,
        credentials: Credentials,
    ) -> Self {
        Self::with_client(base_url, repository, credentials, Client::new())
    }

    /// Create a new Stash client with a custom HTTP client
    pub fn with_client(
        base_url: impl Into<String>,
        repository: StashRepository,
        credentials: Credentials,
        client: Client,
    ) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            repository,
            credentials,
            client,
        }
    }

    /// Get the base URL of the Stash instance
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn pull_request_url(&self, id: &str) -> String {
        format!(
            "{}/rest/api/{}/projects/{}/repos/{}/pull-requests/{}",
            self.base_url, self.repository.api_version, self.repository.project, self.repository.slug, id
        )
    }

    fn build_status_url(&self, commit: &str) -> String {
        format!("{}/rest/build-status/1.0/commits/{}", self.base_url, commit)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.credentials.login, Some(&self.credentials.password))
    }
}

/// Start of the page following `page`, fetched from `start`
///
/// A page claiming more results without a `nextPageStart` past `start` ends
/// the listing.
fn next_start(page: &ChangesPage, start: u32) -> Option<u32> {
    match (page.is_last_page, page.next_page_start) {
        (false, Some(next)) if next > start => Some(next),
        _ => None,
    }
}

#[async_trait]
impl ReviewSystem for StashClient {
    async fn get_change_request(&self, id: &str) -> Result<ChangeRequest> {
        let url = self.pull_request_url(id);
        debug!("Fetching pull request {}", url);

        let response = self.get(&url).send().await?;
        let pr: PullRequest = handle_response(response).await?;

        Ok(pr.into())
    }

    async fn get_changed_paths(&self, id: &str) -> Result<Vec<ChangedPath>> {
        let url = format!("{}/changes", self.pull_request_url(id));
        let mut paths = Vec::new();
        let mut start = 0u32;

        loop {
            debug!("Fetching pull request changes {} (start {})", url, start);

            let response = self
                .get(&url)
                .query(&[("start", start), ("limit", CHANGES_PAGE_LIMIT)])
                .send()
                .await?;
            let page: ChangesPage = handle_response(response).await?;

            let next = next_start(&page, start);
            paths.extend(page.values.into_iter().map(ChangedPath::from));

            match next {
                Some(next) => start = next,
                None => break,
            }
        }

        Ok(paths)
    }

    async fn report_build_status(&self, report: &StatusReport) -> Result<()> {
        if report.commit.is_empty() {
            return Err(ClientError::InvalidRequest(
                "build status needs a commit".to_string(),
            ));
        }

        let url = self.build_status_url(&report.commit);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.credentials.login, Some(&self.credentials.password))
            .json(&BuildStatusBody::from(report))
            .send()
            .await?;

        handle_empty_response(response).await
    }
}
