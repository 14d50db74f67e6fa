//! Error types for scenario discovery and execution

use thiserror::Error;

use crate::endpoint::HttpMethod;

/// Errors raised inside a scenario body or its helpers.
///
/// These never escape the per-scenario lifecycle: `Assertion` finishes the
/// run as `failed`, everything else as `error`.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("{0}")]
    Assertion(String),

    #[error("Credentials for role '{role}' in environment '{environment}' are not configured.")]
    MissingCredentials { environment: String, role: String },

    #[error("The response does not contain an '{0}' token.")]
    MissingToken(String),

    #[error("Request failed with error: {reason}\nURL: {url}\nMethod: {method}\nParams: {params}")]
    Request {
        url: String,
        method: HttpMethod,
        params: String,
        reason: String,
    },

    #[error("Failed to parse JSON response.\nURL: {url}\nMethod: {method}\nStatus Code: {status}\nResponse Content: {body}")]
    InvalidJson {
        url: String,
        method: HttpMethod,
        status: u16,
        body: String,
    },

    #[error("Missing substitution for placeholder '{{{placeholder}}}' in '{template}'")]
    MissingPlaceholder { placeholder: String, template: String },

    #[error("No scenario run record is set. Logs cannot be created.")]
    NoRunRecord,

    #[error("Scenario '{0}' does not implement run()")]
    NotImplemented(String),

    #[error("Scenario panicked: {0}")]
    Panicked(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] scenario_common::Error),

    #[error("{0}")]
    Other(String),
}

impl ScenarioError {
    /// Build an `Other` error from any message
    pub fn other(message: impl std::fmt::Display) -> Self {
        Self::Other(message.to_string())
    }

    /// Whether this error marks the scenario `failed` rather than `error`
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion(_))
    }
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// Errors that abort a whole batch before or outside scenario execution
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("scenario_name parameter requires an app_name to be provided.")]
    ScenarioWithoutModule,

    #[error("App '{0}' does not have a 'scenarios' module.")]
    UnknownModule(String),

    #[error("Scenario '{name}' not found in app '{module}'.")]
    ScenarioNotFound { module: String, name: String },

    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("Store error: {0}")]
    Store(#[from] scenario_common::Error),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
