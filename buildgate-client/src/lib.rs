//! Buildgate HTTP Clients
//!
//! Type-safe clients for the two systems buildgate talks to:
//! - [`StashClient`]: Stash (Bitbucket Server) pull requests and commit build statuses
//! - [`TeamCityClient`]: TeamCity build queue, build status and configuration metadata
//!
//! Both implement the collaborator traits in [`api`], which is all the
//! service layer depends on. Clients are constructed once per run and passed
//! around by reference.
//!
//! # Example
//!
//! ```no_run
//! use buildgate_client::{CiServer, Credentials, TeamCityClient};
//! use buildgate_core::domain::build::BuildLocator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let teamcity = TeamCityClient::new(
//!         "http://teamcity:8111",
//!         Credentials::new("builder", "secret"),
//!     );
//!
//!     let status = teamcity.get_build_status(&BuildLocator::parse("5501")).await?;
//!     println!("{} is {}", status.id, status.state);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod error;
mod stash;
mod teamcity;

pub use api::{CiServer, ReviewSystem};
pub use error::{ClientError, Result};
pub use stash::{StashClient, StashRepository};
pub use teamcity::TeamCityClient;

use serde::de::DeserializeOwned;

/// Basic-auth credentials shared by both collaborators
#[derive(Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

fn trim_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

// =============================================================================
// Response Handlers
// =============================================================================

/// Handle an API response and deserialize JSON
///
/// Checks the status code and returns an appropriate error if the request
/// failed, or deserializes the response body if successful.
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Handle an API response that returns no content
async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(())
}
