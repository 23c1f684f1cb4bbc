//! TeamCity client

use std::collections::BTreeMap;

use async_trait::async_trait;
use buildgate_core::domain::build::{
    BuildLocator, BuildRequest, BuildStatus, ConfigurationInfo, TriggeredBuild,
};
use buildgate_core::dto::teamcity::{Build, BuildType, Properties, QueueBuild};
use reqwest::Client;
use reqwest::header::ACCEPT;
use tracing::debug;

use crate::api::CiServer;
use crate::error::{ClientError, Result};
use crate::{Credentials, handle_response, trim_base_url};

/// HTTP client for the TeamCity REST API
#[derive(Debug, Clone)]
pub struct TeamCityClient {
    base_url: String,
    credentials: Credentials,
    client: Client,
}

impl TeamCityClient {
    /// Create a new TeamCity client
    ///
    /// # Arguments
    /// * `base_url` - Root URL of the server (e.g., "http://teamcity:8111")
    /// * `credentials` - Basic-auth login
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self::with_client(base_url, credentials, Client::new())
    }

    /// Create a new TeamCity client with a custom HTTP client
    pub fn with_client(
        base_url: impl Into<String>,
        credentials: Credentials,
        client: Client,
    ) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            credentials,
            client,
        }
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/app/rest/{}", self.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.rest_url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.credentials.login, Some(&self.credentials.password))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        handle_response(response).await
    }
}

#[async_trait]
impl CiServer for TeamCityClient {
    async fn trigger_build(&self, request: &BuildRequest) -> Result<TriggeredBuild> {
        if request.configuration_id.is_empty() {
            return Err(ClientError::InvalidRequest(
                "build configuration id is empty".to_string(),
            ));
        }

        let url = self.rest_url("buildQueue");
        debug!("POST {} ({})", url, request.configuration_id);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.credentials.login, Some(&self.credentials.password))
            .header(ACCEPT, "application/json")
            .json(&QueueBuild::from(request))
            .send()
            .await?;

        let build: Build = handle_response(response).await?;
        Ok(build.into())
    }

    async fn get_build_status(&self, locator: &BuildLocator) -> Result<BuildStatus> {
        let build: Build = self.get_json(&format!("builds/{}", locator)).await?;
        Ok(build.into())
    }

    async fn get_build_properties(&self, build_id: &str) -> Result<BTreeMap<String, String>> {
        let props: Properties = self
            .get_json(&format!("builds/id:{}/resulting-properties", build_id))
            .await?;
        Ok(props.into())
    }

    async fn get_configuration_info(&self, build_type_id: &str) -> Result<ConfigurationInfo> {
        let build_type: BuildType = self
            .get_json(&format!("buildTypes/id:{}", build_type_id))
            .await?;
        Ok(build_type.into())
    }
}
