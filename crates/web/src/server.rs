//! Web server implementation

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use scenario_common::{Database, LogLevel, ScenarioStatus, SessionDetail, Settings};
use scenario_engine::{Coordinator, ScenarioKind, ScenarioRegistry};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::ApiError;

const NO_DESCRIPTION: &str = "No description available.";

/// Web server state
#[derive(Clone)]
pub struct WebServer {
    state: Arc<WebServerState>,
}

struct WebServerState {
    coordinator: Coordinator,
}

/// Start the API with the scenario modules compiled into this binary
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let addr: SocketAddr = settings.listen_addr.parse()?;
    let db = Database::open(&settings.database_path)?;
    let registry = Arc::new(scenario_suites::registry());
    let coordinator = Coordinator::new(registry, db, Arc::new(settings))?;
    WebServer::new(coordinator).serve(addr).await
}

impl WebServer {
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            state: Arc::new(WebServerState { coordinator }),
        }
    }

    /// Create router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/test-scenarios", get(test_scenarios_handler))
            .route("/test-scenarios/", get(test_scenarios_handler))
            .route("/test-scenarios/options", get(options_handler))
            .route("/sessions/:id", get(session_detail_handler))
            .route("/sessions/:id/", get(session_detail_handler))
            .fallback(not_found_handler)
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the web server
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        info!("Scenario API starting on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
struct SessionView {
    id: i64,
    server: String,
    executed_apps: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    scenarios: Vec<ScenarioView>,
}

#[derive(Debug, Serialize)]
struct ScenarioView {
    id: i64,
    scenario_name: String,
    description: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    status: ScenarioStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    logs: Vec<LogView>,
}

#[derive(Debug, Serialize)]
struct LogView {
    level: LogLevel,
    text: String,
    created_at: DateTime<Utc>,
}

impl SessionView {
    fn build(detail: SessionDetail, registry: &ScenarioRegistry) -> Self {
        let session = detail.session;
        Self {
            id: session.id,
            server: session.server,
            executed_apps: session.executed_apps,
            start_time: session.start_time,
            end_time: session.end_time,
            scenarios: detail
                .scenarios
                .into_iter()
                .map(|scenario| ScenarioView {
                    description: registry
                        .describe(&scenario.run.scenario_name)
                        .unwrap_or(NO_DESCRIPTION)
                        .to_string(),
                    id: scenario.run.id,
                    scenario_name: scenario.run.scenario_name,
                    start_time: scenario.run.start_time,
                    end_time: scenario.run.end_time,
                    status: scenario.run.status,
                    logs: scenario
                        .logs
                        .into_iter()
                        .map(|log| LogView {
                            level: log.level,
                            text: log.text,
                            created_at: log.created_at,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EnvironmentOption {
    key: String,
    configured: bool,
}

#[derive(Debug, Serialize)]
struct ScenarioOption {
    name: String,
    description: Option<String>,
    kind: ScenarioKind,
}

#[derive(Debug, Serialize)]
struct ModuleOption {
    name: String,
    scenarios: Vec<ScenarioOption>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "scenario-web",
        "version": scenario_common::VERSION,
    }))
}

/// Query of the trigger endpoint; empty values count as absent
#[derive(Debug, Default, Deserialize)]
struct TriggerQuery {
    base_url: Option<String>,
    app_name: Option<String>,
    scenario_name: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn test_scenarios_handler(
    State(state): State<Arc<WebServerState>>,
    Query(query): Query<TriggerQuery>,
) -> Result<Response, ApiError> {
    let environment = present(query.base_url).ok_or(ApiError::InvalidUrl)?;
    let app_name = present(query.app_name);
    let scenario_name = present(query.scenario_name);

    let base_url = state
        .coordinator
        .settings()
        .base_url(&environment)
        .ok_or(ApiError::InvalidUrl)?
        .to_string();
    if scenario_name.is_some() && app_name.is_none() {
        return Err(ApiError::ScenarioWithoutApp);
    }

    info!(
        "Running scenarios on {} (app: {}, scenario: {})",
        environment,
        app_name.as_deref().unwrap_or("*"),
        scenario_name.as_deref().unwrap_or("*")
    );
    let session = state
        .coordinator
        .execute_scenarios(&base_url, &environment, app_name.as_deref(), scenario_name.as_deref())
        .await
        .map_err(|e| {
            error!("Scenario run failed: {}", e);
            ApiError::Unexpected
        })?;

    let location = format!("/sessions/{}/", session.id);
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

async fn session_detail_handler(
    State(state): State<Arc<WebServerState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let id: i64 = id.parse().map_err(|_| ApiError::NotFound)?;
    let detail = state
        .coordinator
        .database()
        .session_detail(id)
        .map_err(|e| {
            error!("Failed to load session {}: {}", id, e);
            ApiError::Unexpected
        })?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(SessionView::build(detail, state.coordinator.registry())))
}

async fn options_handler(State(state): State<Arc<WebServerState>>) -> impl IntoResponse {
    let settings = state.coordinator.settings();
    let registry = state.coordinator.registry();

    let environments: Vec<EnvironmentOption> = settings
        .environment_keys()
        .into_iter()
        .map(|key| EnvironmentOption {
            configured: settings.base_url(&key).is_some(),
            key,
        })
        .collect();

    let modules: Vec<ModuleOption> = registry
        .modules()
        .into_iter()
        .map(|module| ModuleOption {
            name: module.to_string(),
            scenarios: registry
                .definitions(module)
                .unwrap_or_default()
                .iter()
                .map(|def| ScenarioOption {
                    name: def.name.clone(),
                    description: def.description.clone(),
                    kind: def.kind,
                })
                .collect(),
        })
        .collect();

    Json(serde_json::json!({
        "environments": environments,
        "modules": modules,
    }))
}

async fn not_found_handler() -> impl IntoResponse {
    ApiError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use scenario_common::EnvironmentConfig;
    use scenario_engine::assertions;
    use scenario_engine::{Scenario, ScenarioContext, ScenarioDef, ScenarioResult};
    use serde_json::Value;
    use tower::ServiceExt;

    #[derive(Default)]
    struct Quiet;

    impl Scenario for Quiet {}

    #[derive(Default)]
    struct Passing;

    #[async_trait]
    impl Scenario for Passing {
        async fn run(&mut self, _cx: &mut ScenarioContext) -> ScenarioResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Failing;

    #[async_trait]
    impl Scenario for Failing {
        async fn run(&mut self, cx: &mut ScenarioContext) -> ScenarioResult<()> {
            cx.set_step("Step 1: Check");
            assertions::equal(400u16, 201u16)
        }
    }

    fn server() -> WebServer {
        let mut registry = ScenarioRegistry::new();
        registry.register(ScenarioDef::abstract_base("demo", "DemoBaseScenario"));
        registry.register(ScenarioDef::concrete::<Passing>("demo", "PassingScenario").with_description("Always passes"));
        registry.register(ScenarioDef::concrete::<Failing>("demo", "FailingScenario"));
        registry.register(ScenarioDef::concrete::<Quiet>("other", "QuietScenario"));

        let mut settings = Settings::default();
        settings.environments.insert(
            "Local".to_string(),
            EnvironmentConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                ..Default::default()
            },
        );
        settings.environments.insert("Development".to_string(), EnvironmentConfig::default());

        let coordinator = Coordinator::new(
            Arc::new(registry),
            Database::open_memory().unwrap(),
            Arc::new(settings),
        )
        .unwrap();
        WebServer::new(coordinator)
    }

    async fn get(server: &WebServer, uri: &str) -> (StatusCode, Option<String>, Value) {
        let response = server
            .router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, location, body)
    }

    #[tokio::test]
    async fn test_invalid_base_url() {
        let server = server();
        for uri in [
            "/test-scenarios/",
            "/test-scenarios/?base_url=",
            "/test-scenarios/?base_url=Nowhere",
            "/test-scenarios/?base_url=Development",
        ] {
            let (status, _, body) = get(&server, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["code"], "invalid-url");
            assert_eq!(body["detail"], "Correct Base URL is required.");
        }
    }

    #[tokio::test]
    async fn test_scenario_name_requires_app_name() {
        let server = server();
        let (status, _, body) = get(&server, "/test-scenarios/?base_url=Local&scenario_name=PassingScenario").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid-scenario");

        let (status, _, body) =
            get(&server, "/test-scenarios/?base_url=Local&app_name=&scenario_name=PassingScenario").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid-scenario");
    }

    #[tokio::test]
    async fn test_run_redirects_to_session_detail() {
        let server = server();
        let (status, location, _) = get(&server, "/test-scenarios/?base_url=Local&app_name=demo").await;
        assert_eq!(status, StatusCode::FOUND);
        let location = location.unwrap();
        assert!(location.starts_with("/sessions/") && location.ends_with('/'));

        let (status, _, session) = get(&server, &location).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["server"], "Local");
        assert_eq!(session["executed_apps"], "demo");
        assert!(!session["end_time"].is_null());

        let scenarios = session["scenarios"].as_array().unwrap();
        assert_eq!(scenarios.len(), 2);
        let passing = scenarios.iter().find(|s| s["scenario_name"] == "PassingScenario").unwrap();
        assert_eq!(passing["status"], "passed");
        assert_eq!(passing["description"], "Always passes");
        assert!(passing.get("logs").is_none());

        let failing = scenarios.iter().find(|s| s["scenario_name"] == "FailingScenario").unwrap();
        assert_eq!(failing["status"], "failed");
        assert_eq!(failing["description"], NO_DESCRIPTION);
        let logs = failing["logs"].as_array().unwrap();
        assert_eq!(logs[0]["level"], "error");
        assert!(logs[0]["text"].as_str().unwrap().starts_with("(Step 1: Check) Failed: "));
    }

    #[tokio::test]
    async fn test_unknown_app_is_unexpected_error() {
        let server = server();
        let (status, _, body) = get(&server, "/test-scenarios/?base_url=Local&app_name=billing").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "unexpected-error");
    }

    #[tokio::test]
    async fn test_missing_session() {
        let server = server();
        for uri in ["/sessions/999/", "/sessions/abc", "/nowhere"] {
            let (status, _, body) = get(&server, uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
            assert_eq!(body["code"], "not-found");
        }
    }

    #[tokio::test]
    async fn test_health_and_options() {
        let server = server();
        let (status, _, body) = get(&server, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, _, body) = get(&server, "/test-scenarios/options").await;
        assert_eq!(status, StatusCode::OK);
        let environments = body["environments"].as_array().unwrap();
        let local = environments.iter().find(|e| e["key"] == "Local").unwrap();
        assert_eq!(local["configured"], true);
        let development = environments.iter().find(|e| e["key"] == "Development").unwrap();
        assert_eq!(development["configured"], false);

        let modules = body["modules"].as_array().unwrap();
        assert_eq!(modules[0]["name"], "demo");
        assert_eq!(modules[0]["scenarios"][0]["kind"], "abstract");
    }
}
