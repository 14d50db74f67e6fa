//! Persisted records: sessions, scenario runs and their logs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session primary key
pub type SessionId = i64;

/// Scenario run primary key
pub type ScenarioRunId = i64;

/// Outcome of one scenario run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Unknown,
    Passed,
    Failed,
    Error,
}

impl Default for ScenarioStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl ScenarioStatus {
    /// Terminal states are reached exactly once from `Unknown`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScenarioStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "passed" => Ok(Self::Passed),
            "failed" => Ok(Self::Failed),
            "error" => Ok(Self::Error),
            _ => Err(format!("unknown scenario status: {}", s)),
        }
    }
}

/// Severity of a persisted scenario log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Debug,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Debug => "debug",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "debug" => Ok(Self::Debug),
            _ => Err(format!("unknown log level: {}", s)),
        }
    }
}

/// One batch execution of scenarios
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub server: String,
    pub executed_apps: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Outcome record of one executed scenario instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioRun {
    pub id: ScenarioRunId,
    pub session_id: SessionId,
    pub scenario_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: ScenarioStatus,
}

/// One diagnostic line attached to a scenario run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: i64,
    pub scenario_id: ScenarioRunId,
    pub level: LogLevel,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A scenario run with its logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDetail {
    pub run: ScenarioRun,
    pub logs: Vec<LogEntry>,
}

/// A session with every run it owns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    pub session: Session,
    pub scenarios: Vec<ScenarioDetail>,
}

impl SessionDetail {
    /// Count runs ending in the given status
    pub fn count(&self, status: ScenarioStatus) -> usize {
        self.scenarios.iter().filter(|s| s.run.status == status).count()
    }
}

/// Join the module names touched by a session the way they are persisted
pub fn join_executed_apps<'a, I>(apps: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut apps: Vec<&str> = apps.into_iter().collect();
    apps.sort_unstable();
    apps.dedup();
    apps.join(", ")
}
