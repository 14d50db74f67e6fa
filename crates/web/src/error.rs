//! Error responses of the HTTP API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures reported to API clients as `{"detail": ..., "code": ...}`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Correct Base URL is required.")]
    InvalidUrl,

    #[error("The 'scenario_name' parameter requires an 'app_name' to be provided.")]
    ScenarioWithoutApp,

    #[error("Not found.")]
    NotFound,

    #[error("An unexpected error occurred")]
    Unexpected,
}

impl ApiError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid-url",
            Self::ScenarioWithoutApp => "invalid-scenario",
            Self::NotFound => "not-found",
            Self::Unexpected => "unexpected-error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidUrl | Self::ScenarioWithoutApp => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({"detail": self.to_string(), "code": self.code()});
        (self.status(), Json(body)).into_response()
    }
}
