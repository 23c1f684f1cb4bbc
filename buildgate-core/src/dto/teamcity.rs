//! TeamCity REST DTOs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::build::{
    BuildDependency, BuildOutcome, BuildRequest, BuildState, BuildStatus, ConfigurationInfo,
    TriggeredBuild, TriggeringOption,
};

/// `GET /app/rest/builds/{locator}` and the response of `POST /app/rest/buildQueue`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub id: u64,
    pub build_type_id: String,
    pub state: BuildState,
    pub status: Option<BuildOutcome>,
    pub status_text: Option<String>,
    pub web_url: String,
    pub branch_name: Option<String>,
    #[serde(rename = "snapshot-dependencies")]
    pub snapshot_dependencies: Option<Builds>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Builds {
    #[serde(default)]
    pub build: Vec<BuildRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRef {
    pub id: u64,
    pub build_type_id: String,
}

impl From<Build> for BuildStatus {
    fn from(build: Build) -> Self {
        // TeamCity reports a provisional status while a build runs
        let outcome = if build.state.is_terminal() {
            build.status
        } else {
            None
        };

        BuildStatus {
            id: build.id.to_string(),
            state: build.state,
            outcome,
            status_text: build.status_text.unwrap_or_default(),
            web_url: build.web_url,
            branch_name: build.branch_name,
            build_type_id: build.build_type_id,
            dependencies: build
                .snapshot_dependencies
                .unwrap_or_default()
                .build
                .into_iter()
                .map(|dep| BuildDependency {
                    build_type_id: dep.build_type_id,
                    id: dep.id.to_string(),
                })
                .collect(),
        }
    }
}

impl From<Build> for TriggeredBuild {
    fn from(build: Build) -> Self {
        TriggeredBuild {
            id: build.id.to_string(),
            web_url: build.web_url,
        }
    }
}

/// Property list as used by both build properties and queue requests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Properties {
    #[serde(default)]
    pub property: Vec<Property>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl From<Properties> for BTreeMap<String, String> {
    fn from(props: Properties) -> Self {
        props
            .property
            .into_iter()
            .map(|p| (p.name, p.value))
            .collect()
    }
}

/// `GET /app/rest/buildTypes/id:{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildType {
    pub id: String,
    pub name: String,
    pub project_name: Option<String>,
}

impl From<BuildType> for ConfigurationInfo {
    fn from(bt: BuildType) -> Self {
        let config_path = match &bt.project_name {
            Some(project) if !project.is_empty() => format!("{} :: {}", project, bt.name),
            _ => bt.name.clone(),
        };

        ConfigurationInfo {
            name: bt.name,
            config_path,
        }
    }
}

/// Body of `POST /app/rest/buildQueue`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueBuild {
    pub build_type: BuildTypeRef,
    pub branch_name: String,
    pub properties: Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggering_options: Option<TriggeringOptions>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildTypeRef {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggeringOptions {
    pub queue_at_top: bool,
}

impl From<&BuildRequest> for QueueBuild {
    fn from(req: &BuildRequest) -> Self {
        let triggering_options = if req.options.is_empty() {
            None
        } else {
            Some(TriggeringOptions {
                queue_at_top: req.options.contains(&TriggeringOption::QueueAtTop),
            })
        };

        QueueBuild {
            build_type: BuildTypeRef {
                id: req.configuration_id.clone(),
            },
            branch_name: req.branch.clone(),
            properties: Properties {
                property: req
                    .properties
                    .iter()
                    .map(|(name, value)| Property {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            },
            triggering_options,
        }
    }
}
