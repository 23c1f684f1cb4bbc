//! Build trigger

use anyhow::{Context, Result};
use buildgate_client::CiServer;
use buildgate_core::domain::build::{
    BuildRequest, CLIENT_BRANCH_PROPERTY, TriggeredBuild, TriggeringOption,
};
use buildgate_core::policy::{DEFAULT_BRANCH_SENTINEL, normalize_branch};
use tracing::info;

/// Build the queue request for `configuration_id`
///
/// Both branches are normalized independently. The client branch becomes a
/// property override unless it is absent or the `<default>` sentinel.
pub fn build_request(
    configuration_id: &str,
    framework_branch: &str,
    client_branch: Option<&str>,
    convert_to_merge: bool,
) -> BuildRequest {
    let mut request = BuildRequest::new(
        configuration_id,
        normalize_branch(framework_branch, convert_to_merge),
    )
    .with_option(TriggeringOption::QueueAtTop);

    if let Some(client_branch) = client_branch.filter(|b| *b != DEFAULT_BRANCH_SENTINEL) {
        request = request.with_property(
            CLIENT_BRANCH_PROPERTY,
            normalize_branch(client_branch, convert_to_merge),
        );
    }

    request
}

/// Submit `request` to the CI server
pub async fn trigger_build(ci: &dyn CiServer, request: &BuildRequest) -> Result<TriggeredBuild> {
    let triggered = ci
        .trigger_build(request)
        .await
        .with_context(|| format!("Failed to trigger build {}", request.configuration_id))?;

    info!(
        "Queued build {} of {} on {}: {}",
        triggered.id, request.configuration_id, request.branch, triggered.web_url
    );

    Ok(triggered)
}
