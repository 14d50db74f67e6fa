//! Scenario Tester Engine
//!
//! This crate drives end-to-end scenarios against a deployed REST API:
//! - Describes API operations as `EndPoint` templates
//! - Issues calls through one HTTP gateway (JSON, multipart, PDF)
//! - Runs each scenario through a recorded lifecycle with step-tagged logs
//! - Discovers scenarios from an explicit registry
//! - Executes batches serially or on a fixed pool of async workers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Coordinator                              │
//! │    ├── registry.find_scenarios(module?, name?)              │
//! │    ├── db.create_session(environment)                       │
//! │    ├── Serial | Parallel { workers } over a shared queue    │
//! │    └── db.finalize_session(executed_apps)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioContext (one per instance)                         │
//! │    ├── login(role) / logout()                               │
//! │    ├── call(endpoint, params, files) -> Gateway             │
//! │    ├── set_step(label), info/debug/warning/error            │
//! │    └── execute(scenario) -> ScenarioRun                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Recorder (record lock)     GroupLocks (opt-in, by name)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod assertions;
pub mod coordinator;
pub mod endpoint;
pub mod error;
pub mod gateway;
pub mod locks;
pub mod registry;
pub mod scenario;

pub use coordinator::{Coordinator, Strategy};
pub use endpoint::{EndPoint, HttpMethod};
pub use error::{EngineError, EngineResult, ScenarioError, ScenarioResult};
pub use gateway::{ApiResponse, Attachment, Files, Gateway, ResponseBody};
pub use locks::{GroupLocks, Recorder};
pub use registry::{ScenarioDef, ScenarioKind, ScenarioRegistry};
pub use scenario::{Harness, Scenario, ScenarioContext};

pub use async_trait::async_trait;

/// Local wall-clock time as `YYYY-MM-DD HH:MM:SS`, for unique titles
pub fn current_time() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
