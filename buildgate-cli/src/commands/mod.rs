//! Commands module
//!
//! Defines the CLI commands and their handlers.

mod propagate;
mod trigger;

pub use propagate::PropagateArgs;
pub use trigger::TriggerArgs;

use std::time::Duration;

use anyhow::{Context, Result};
use buildgate_client::{Credentials, StashClient, StashRepository, TeamCityClient};
use clap::{Args, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{
    Config, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_STASH_API_VERSION, DEFAULT_STASH_PROJECT,
    DEFAULT_STASH_REPOSITORY,
};

/// Collaborator connection options shared by every command
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Stash base URL
    #[arg(long, env = "STASH_URL", global = true, default_value = "")]
    pub stash_url: String,

    /// Stash REST API version
    #[arg(long, env = "STASH_API_VERSION", global = true, default_value = DEFAULT_STASH_API_VERSION)]
    pub stash_api_version: String,

    /// Stash project key
    #[arg(long, env = "STASH_PROJECT", global = true, default_value = DEFAULT_STASH_PROJECT)]
    pub stash_project: String,

    /// Stash repository slug
    #[arg(long, env = "STASH_REPOSITORY", global = true, default_value = DEFAULT_STASH_REPOSITORY)]
    pub stash_repository: String,

    /// TeamCity base URL
    #[arg(long, env = "TEAMCITY_URL", global = true, default_value = "")]
    pub teamcity_url: String,

    /// Login used for Stash and TeamCity
    #[arg(long, env = "BUILDGATE_LOGIN", global = true, default_value = "")]
    pub login: String,

    /// Password used for Stash and TeamCity
    #[arg(long, env = "BUILDGATE_PASSWORD", global = true, default_value = "", hide_env_values = true)]
    pub password: String,

    /// Seconds before a single Stash or TeamCity request is abandoned
    #[arg(long, env = "BUILDGATE_HTTP_TIMEOUT", global = true, default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout: u64,
}

impl ConnectionArgs {
    /// Build and validate the connection settings
    pub fn into_config(self) -> Result<Config> {
        let config = Config {
            stash_url: self.stash_url,
            stash_repository: StashRepository {
                api_version: self.stash_api_version,
                project: self.stash_project,
                slug: self.stash_repository,
            },
            teamcity_url: self.teamcity_url,
            credentials: Credentials::new(self.login, self.password),
            http_timeout: Duration::from_secs(self.http_timeout),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Build the Stash and TeamCity clients sharing one HTTP client
fn connect(config: &Config) -> Result<(StashClient, TeamCityClient)> {
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build the HTTP client")?;

    let review = StashClient::with_client(
        &config.stash_url,
        config.stash_repository.clone(),
        config.credentials.clone(),
        http.clone(),
    );
    let ci = TeamCityClient::with_client(&config.teamcity_url, config.credentials.clone(), http);

    info!("Using Stash at {} and TeamCity at {}", review.base_url(), ci.base_url());
    Ok((review, ci))
}

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Trigger a build only when the change request touches watched folders
    Trigger(TriggerArgs),
    /// Report the status of every dependency of a container build to Stash
    Propagate(PropagateArgs),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - Collaborator connection settings
/// * `cancel` - Fired on Ctrl-C
pub async fn handle_command(
    command: Commands,
    config: &Config,
    cancel: CancellationToken,
) -> Result<()> {
    match command {
        Commands::Trigger(args) => trigger::handle_trigger_command(args, config, cancel).await,
        Commands::Propagate(args) => propagate::handle_propagate_command(args, config).await,
    }
}
