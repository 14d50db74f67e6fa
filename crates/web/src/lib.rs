//! Scenario Tester Web API
//!
//! Triggers scenario runs over HTTP and serves the recorded sessions:
//! - `GET /test-scenarios/?base_url=&app_name=&scenario_name=` runs a batch
//!   and redirects to its session
//! - `GET /sessions/:id/` returns a session with its scenarios and logs
//! - `GET /test-scenarios/options` lists environments and modules
//! - `GET /health`

pub mod error;
pub mod server;

pub use error::ApiError;
pub use server::{serve, WebServer};
