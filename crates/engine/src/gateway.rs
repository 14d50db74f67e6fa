//! HTTP call gateway: one request per logical API call
//!
//! Request encoding follows the method:
//! - GET/DELETE send params as a query string
//! - POST with files sends multipart form data (params become text fields)
//! - POST without files, PUT and PATCH send a JSON body
//!
//! Responses are decoded by their declared content type. Failures are never
//! retried.

use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::endpoint::{EndPoint, HttpMethod};
use crate::error::{EngineResult, ScenarioError, ScenarioResult};

static NULL: Value = Value::Null;

/// A file uploaded as one multipart part
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Bytes,
    pub mime: Option<String>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// Multipart attachments keyed by form field name
pub type Files = BTreeMap<String, Attachment>;

/// Decoded response payload
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// `application/json`; `Value::Null` when the body was empty
    Json(Value),
    /// `application/pdf`
    Pdf(Bytes),
    /// Any other content type
    Empty,
}

/// Normalized `(body, status_code)` result of one call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub body: ResponseBody,
    pub status: u16,
}

impl ApiResponse {
    /// JSON body, or `null` for non-JSON responses
    pub fn json(&self) -> &Value {
        match &self.body {
            ResponseBody::Json(value) => value,
            _ => &NULL,
        }
    }

    pub fn into_json(self) -> Value {
        match self.body {
            ResponseBody::Json(value) => value,
            _ => Value::Null,
        }
    }

    pub fn pdf(&self) -> Option<&Bytes> {
        match &self.body {
            ResponseBody::Pdf(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Shared HTTP client used by every scenario instance.
///
/// Header-agnostic: callers pass the headers they own (e.g. the bearer
/// token installed by `login`).
#[derive(Clone)]
pub struct Gateway {
    client: Client,
}

impl Gateway {
    pub fn new() -> EngineResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("scenario-tester/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Issue one request against `base_url + endpoint.url()`
    pub async fn call(
        &self,
        base_url: &str,
        endpoint: &EndPoint,
        headers: &HeaderMap,
        params: Option<&Value>,
        files: Option<&Files>,
    ) -> ScenarioResult<ApiResponse> {
        let url = format!("{}{}", base_url, endpoint.url());
        let method = endpoint.method();
        let request_failed = |reason: String| ScenarioError::Request {
            url: url.clone(),
            method,
            params: params.map(Value::to_string).unwrap_or_else(|| "null".to_string()),
            reason,
        };

        let builder = self
            .client
            .request(method.to_reqwest(), &url)
            .headers(headers.clone());
        let builder = encode(builder, method, params, files).map_err(&request_failed)?;

        let response = builder.send().await.map_err(|e| request_failed(e.to_string()))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        debug!("{} {} -> {} ({})", method, url, status, content_type);

        let body = if content_type.contains("application/json") {
            let raw = response.bytes().await.map_err(|e| request_failed(e.to_string()))?;
            if raw.is_empty() {
                ResponseBody::Json(Value::Null)
            } else {
                let value = serde_json::from_slice(&raw).map_err(|_| ScenarioError::InvalidJson {
                    url: url.clone(),
                    method,
                    status,
                    body: String::from_utf8_lossy(&raw).into_owned(),
                })?;
                ResponseBody::Json(value)
            }
        } else if content_type.contains("application/pdf") {
            let raw = response.bytes().await.map_err(|e| request_failed(e.to_string()))?;
            ResponseBody::Pdf(raw)
        } else {
            ResponseBody::Empty
        };

        Ok(ApiResponse { body, status })
    }
}

fn encode(
    builder: RequestBuilder,
    method: HttpMethod,
    params: Option<&Value>,
    files: Option<&Files>,
) -> Result<RequestBuilder, String> {
    match method {
        HttpMethod::Get | HttpMethod::Delete => {
            let pairs = flatten_params(params)?;
            Ok(if pairs.is_empty() { builder } else { builder.query(&pairs) })
        }
        HttpMethod::Post if files.is_some_and(|f| !f.is_empty()) => {
            let mut form = Form::new();
            for (name, value) in flatten_params(params)? {
                form = form.text(name, value);
            }
            for (field, attachment) in files.into_iter().flatten() {
                let mut part = Part::bytes(attachment.bytes.to_vec()).file_name(attachment.file_name.clone());
                if let Some(mime) = &attachment.mime {
                    part = part.mime_str(mime).map_err(|e| format!("invalid mime type '{}': {}", mime, e))?;
                }
                form = form.part(field.clone(), part);
            }
            Ok(builder.multipart(form))
        }
        HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => Ok(match params {
            Some(body) => builder.json(body),
            None => builder,
        }),
    }
}

/// Flatten a JSON object into `key=value` pairs for query strings and form
/// fields. Arrays repeat the key; nulls are dropped.
fn flatten_params(params: Option<&Value>) -> Result<Vec<(String, String)>, String> {
    let map = match params {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(other) => return Err(format!("params must be a JSON object, got {}", other)),
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    pairs.push((key.clone(), scalar(item)));
                }
            }
            other => pairs.push((key.clone(), scalar(other))),
        }
    }
    Ok(pairs)
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
