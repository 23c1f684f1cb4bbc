//! In-memory collaborators for service tests
//!
//! Both fakes record every call so tests can assert on what was (or was not)
//! asked of the review system and the CI server.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use buildgate_client::{CiServer, ClientError, Result, ReviewSystem};
use buildgate_core::domain::build::{
    BuildDependency, BuildLocator, BuildOutcome, BuildRequest, BuildState, BuildStatus,
    ConfigurationInfo, TriggeredBuild,
};
use buildgate_core::domain::change::{ChangeRequest, ChangedPath};
use buildgate_core::domain::report::StatusReport;

pub fn change_request(id: &str, target_ref: &str) -> ChangeRequest {
    ChangeRequest {
        id: id.to_string(),
        source_ref: format!("refs/heads/feature/{}", id),
        target_ref: target_ref.to_string(),
        latest_commit: format!("c0ffee{}", id),
        web_url: None,
    }
}

pub fn build(id: &str, state: BuildState, outcome: Option<BuildOutcome>, text: &str) -> BuildStatus {
    BuildStatus {
        id: id.to_string(),
        state,
        outcome,
        status_text: text.to_string(),
        web_url: format!("http://tc/viewLog.html?buildId={}", id),
        branch_name: Some("42/merge".to_string()),
        build_type_id: format!("Bt{}", id),
        dependencies: vec![],
    }
}

pub fn dependency(build_type_id: &str, id: &str) -> BuildDependency {
    BuildDependency {
        build_type_id: build_type_id.to_string(),
        id: id.to_string(),
    }
}

#[derive(Default)]
pub struct FakeReview {
    change_requests: HashMap<String, ChangeRequest>,
    changed_paths: HashMap<String, Vec<ChangedPath>>,
    failing_report_keys: HashSet<String>,
    calls: Mutex<Vec<String>>,
    reports: Mutex<Vec<StatusReport>>,
}

impl FakeReview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_change_request(mut self, cr: ChangeRequest, paths: &[&str]) -> Self {
        self.changed_paths.insert(
            cr.id.clone(),
            paths.iter().map(ChangedPath::from_file_path).collect(),
        );
        self.change_requests.insert(cr.id.clone(), cr);
        self
    }

    pub fn failing_reports_for(mut self, key: &str) -> Self {
        self.failing_report_keys.insert(key.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<StatusReport> {
        self.reports.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ReviewSystem for FakeReview {
    async fn get_change_request(&self, id: &str) -> Result<ChangeRequest> {
        self.record(format!("get_change_request {}", id));
        self.change_requests
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::api_error(404, format!("no pull request {}", id)))
    }

    async fn get_changed_paths(&self, id: &str) -> Result<Vec<ChangedPath>> {
        self.record(format!("get_changed_paths {}", id));
        self.changed_paths
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::api_error(404, format!("no pull request {}", id)))
    }

    async fn report_build_status(&self, report: &StatusReport) -> Result<()> {
        self.record(format!("report_build_status {}", report.key));
        if self.failing_report_keys.contains(&report.key) {
            return Err(ClientError::api_error(500, "stash unavailable"));
        }
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeCi {
    statuses: Mutex<HashMap<String, VecDeque<BuildStatus>>>,
    properties: HashMap<String, BTreeMap<String, String>>,
    configurations: HashMap<String, ConfigurationInfo>,
    triggered: Mutex<Vec<BuildRequest>>,
    status_calls: Mutex<Vec<String>>,
}

impl FakeCi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successive snapshots returned for `locator`; the last one repeats
    pub fn with_statuses(self, locator: &str, statuses: Vec<BuildStatus>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(locator.to_string(), statuses.into());
        self
    }

    pub fn with_status(self, locator: &str, status: BuildStatus) -> Self {
        self.with_statuses(locator, vec![status])
    }

    pub fn with_property(mut self, build_id: &str, name: &str, value: &str) -> Self {
        self.properties
            .entry(build_id.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_configuration(mut self, build_type_id: &str, name: &str, path: &str) -> Self {
        self.configurations.insert(
            build_type_id.to_string(),
            ConfigurationInfo {
                name: name.to_string(),
                config_path: path.to_string(),
            },
        );
        self
    }

    pub fn triggered(&self) -> Vec<BuildRequest> {
        self.triggered.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> Vec<String> {
        self.status_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CiServer for FakeCi {
    async fn trigger_build(&self, request: &BuildRequest) -> Result<TriggeredBuild> {
        let mut triggered = self.triggered.lock().unwrap();
        triggered.push(request.clone());
        let id = format!("{}", 9000 + triggered.len());
        Ok(TriggeredBuild {
            web_url: format!("http://tc/viewLog.html?buildId={}", id),
            id,
        })
    }

    async fn get_build_status(&self, locator: &BuildLocator) -> Result<BuildStatus> {
        let key = locator.to_string();
        self.status_calls.lock().unwrap().push(key.clone());

        let mut statuses = self.statuses.lock().unwrap();
        let queue = statuses
            .get_mut(&key)
            .ok_or_else(|| ClientError::api_error(404, format!("no build {}", key)))?;

        let status = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        status.ok_or_else(|| ClientError::api_error(404, format!("no build {}", key)))
    }

    async fn get_build_properties(&self, build_id: &str) -> Result<BTreeMap<String, String>> {
        Ok(self.properties.get(build_id).cloned().unwrap_or_default())
    }

    async fn get_configuration_info(&self, build_type_id: &str) -> Result<ConfigurationInfo> {
        self.configurations
            .get(build_type_id)
            .cloned()
            .ok_or_else(|| ClientError::api_error(404, format!("no build type {}", build_type_id)))
    }
}
