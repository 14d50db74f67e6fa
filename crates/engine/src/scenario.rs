//! The scenario contract and the per-instance context every scenario runs in

use async_trait::async_trait;
use futures::FutureExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use scenario_common::{LogLevel, ScenarioRun, ScenarioStatus, SessionId, Settings};
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use crate::endpoint::EndPoint;
use crate::error::{ScenarioError, ScenarioResult};
use crate::gateway::{ApiResponse, Files, Gateway};
use crate::locks::{GroupLocks, Recorder};

/// One end-to-end script exercising a feature workflow.
///
/// Implementations keep their own workflow state in `self`; everything
/// shared with the engine (headers, step label, run record, HTTP) lives in
/// the [`ScenarioContext`] passed to `run`.
#[async_trait]
pub trait Scenario: Send {
    async fn run(&mut self, cx: &mut ScenarioContext) -> ScenarioResult<()> {
        let _ = cx;
        Err(ScenarioError::NotImplemented(
            std::any::type_name::<Self>().to_string(),
        ))
    }
}

/// Engine services shared by every scenario instance of a batch
#[derive(Clone)]
pub struct Harness {
    pub gateway: Gateway,
    pub recorder: Recorder,
    pub settings: Arc<Settings>,
    pub group_locks: GroupLocks,
}

/// State owned by one scenario instance for the duration of its run
pub struct ScenarioContext {
    base_url: String,
    environment: String,
    headers: HeaderMap,
    step: Option<String>,
    run: Option<ScenarioRun>,
    harness: Harness,
}

impl ScenarioContext {
    pub fn new(base_url: &str, environment: &str, harness: Harness) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            environment: environment.to_string(),
            headers: HeaderMap::new(),
            step: None,
            run: None,
            harness,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn step(&self) -> Option<&str> {
        self.step.as_deref()
    }

    /// Label prefixed onto subsequent log lines
    pub fn set_step(&mut self, step: impl Into<String>) {
        self.step = Some(step.into());
    }

    pub fn run_record(&self) -> Option<&ScenarioRun> {
        self.run.as_ref()
    }

    /// Authenticate as `role` and install the bearer token for later calls.
    ///
    /// Non-200 responses are returned as-is so the scenario can assert on
    /// them; a 200 without an `access` field is a contract error.
    pub async fn login(&mut self, role: &str, endpoint: &EndPoint) -> ScenarioResult<ApiResponse> {
        let credentials = self
            .harness
            .settings
            .credentials(&self.environment, role)
            .cloned()
            .ok_or_else(|| ScenarioError::MissingCredentials {
                environment: self.environment.clone(),
                role: role.to_string(),
            })?;

        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
        });
        let response = self.call(endpoint, Some(&body), None).await?;

        if response.status == 200 {
            let token = match response.json().get("access") {
                Some(Value::String(token)) => token.clone(),
                Some(other) => other.to_string(),
                None => return Err(ScenarioError::MissingToken("access".to_string())),
            };
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ScenarioError::other(format!("invalid access token: {}", e)))?;
            self.headers.insert(AUTHORIZATION, value);
            debug!("Logged in as {} on {}", role, self.environment);
        }

        Ok(response)
    }

    /// Drop the Authorization header; a no-op when not logged in
    pub fn logout(&mut self) {
        self.headers.remove(AUTHORIZATION);
    }

    /// Call an endpoint with the current headers
    pub async fn call(
        &self,
        endpoint: &EndPoint,
        params: Option<&Value>,
        files: Option<&Files>,
    ) -> ScenarioResult<ApiResponse> {
        self.harness
            .gateway
            .call(&self.base_url, endpoint, &self.headers, params, files)
            .await
    }

    /// Shorthand for a call with a JSON/query payload and no files
    pub async fn send(&self, endpoint: &EndPoint, params: &Value) -> ScenarioResult<ApiResponse> {
        self.call(endpoint, Some(params), None).await
    }

    /// Resolve `{placeholder}` segments of an endpoint
    pub fn format_endpoint<V: std::fmt::Display>(
        &self,
        endpoint: &EndPoint,
        substitutions: &[(&str, V)],
    ) -> ScenarioResult<EndPoint> {
        endpoint.format(substitutions)
    }

    /// Hold the named coarse lock until the returned guard drops
    pub async fn group_lock(&self, group: &str) -> OwnedMutexGuard<()> {
        self.harness.group_locks.acquire(group).await
    }

    fn write_log(&self, level: LogLevel, message: &str) -> ScenarioResult<()> {
        let run = self.run.as_ref().ok_or(ScenarioError::NoRunRecord)?;
        let text = match &self.step {
            Some(step) => format!("({}) {}", step, message),
            None => message.to_string(),
        };
        debug!("[{}] {}: {}", run.scenario_name, level, text);
        self.harness.recorder.log(run.id, level, &text)?;
        Ok(())
    }

    pub fn info(&self, message: impl AsRef<str>) -> ScenarioResult<()> {
        self.write_log(LogLevel::Info, message.as_ref())
    }

    pub fn debug(&self, message: impl AsRef<str>) -> ScenarioResult<()> {
        self.write_log(LogLevel::Debug, message.as_ref())
    }

    pub fn warning(&self, message: impl AsRef<str>) -> ScenarioResult<()> {
        self.write_log(LogLevel::Warning, message.as_ref())
    }

    pub fn error(&self, message: impl AsRef<str>) -> ScenarioResult<()> {
        self.write_log(LogLevel::Error, message.as_ref())
    }

    /// Run one scenario to a terminal status inside `session_id`.
    ///
    /// The run record is created, updated and finalized through the shared
    /// [`Recorder`]; `run()` itself executes without holding it. Assertion
    /// failures end as `failed`; any other error, or a panic in the body,
    /// ends as `error`. The record is finalized on every path.
    pub async fn execute(
        &mut self,
        scenario: &mut dyn Scenario,
        session_id: SessionId,
        scenario_name: &str,
    ) -> ScenarioResult<ScenarioRun> {
        let run = self.harness.recorder.open_run(session_id, scenario_name)?;
        let run_id = run.id;
        self.run = Some(run);

        let outcome = match AssertUnwindSafe(scenario.run(self)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(ScenarioError::Panicked(panic_message(payload))),
        };

        let (status, note) = match &outcome {
            Ok(()) => (ScenarioStatus::Passed, None),
            Err(e) if e.is_assertion() => (ScenarioStatus::Failed, Some(format!("Failed: {}", e))),
            Err(e) => (ScenarioStatus::Error, Some(format!("Error: {}", e))),
        };

        let status_written = self.harness.recorder.set_status(run_id, status);
        if let Some(note) = note {
            if let Err(e) = self.error(&note) {
                warn!("Could not record failure of {}: {}", scenario_name, e);
            }
        }
        let finalized = self.harness.recorder.finalize(run_id);

        status_written?;
        let run = finalized?;
        self.run = Some(run.clone());
        Ok(run)
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
