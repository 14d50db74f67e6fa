//! Session report browsing

use anyhow::{anyhow, Result};
use clap::Args;
use serde::Serialize;

use scenario_common::{Database, LogEntry, ScenarioDetail, ScenarioStatus, Session, SessionDetail, Settings};
use scenario_engine::ScenarioRegistry;

use crate::output::{print_list, status_label, timestamp, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct SessionsArgs {
    /// Maximum number of sessions to list
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Session ID
    pub id: i64,

    /// Hide scenario logs
    #[arg(long)]
    pub no_logs: bool,
}

/// Session display wrapper for serialization
#[derive(Serialize)]
pub struct SessionDisplay {
    pub id: i64,
    pub server: String,
    pub executed_apps: String,
    pub start_time: String,
    pub end_time: String,
}

impl From<&Session> for SessionDisplay {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            server: session.server.clone(),
            executed_apps: session.executed_apps.clone(),
            start_time: timestamp(Some(session.start_time)),
            end_time: timestamp(session.end_time),
        }
    }
}

impl TableDisplay for SessionDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Server", "Apps", "Started", "Finished"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.server.clone(),
            self.executed_apps.clone(),
            self.start_time.clone(),
            self.end_time.clone(),
        ]
    }
}

/// Scenario run display wrapper for serialization
#[derive(Serialize)]
pub struct ScenarioRunDisplay {
    pub id: i64,
    pub scenario_name: String,
    pub description: Option<String>,
    pub status: ScenarioStatus,
    pub start_time: String,
    pub end_time: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<LogDisplay>,
}

impl ScenarioRunDisplay {
    fn new(detail: &ScenarioDetail, registry: &ScenarioRegistry) -> Self {
        let run = &detail.run;
        Self {
            id: run.id,
            scenario_name: run.scenario_name.clone(),
            description: registry.describe(&run.scenario_name).map(str::to_string),
            status: run.status,
            start_time: timestamp(Some(run.start_time)),
            end_time: timestamp(run.end_time),
            logs: detail.logs.iter().map(LogDisplay::from).collect(),
        }
    }
}

impl TableDisplay for ScenarioRunDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Scenario", "Status", "Started", "Finished", "Logs"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.scenario_name.clone(),
            status_label(self.status),
            self.start_time.clone(),
            self.end_time.clone(),
            self.logs.len().to_string(),
        ]
    }
}

#[derive(Serialize)]
pub struct LogDisplay {
    pub level: String,
    pub text: String,
    pub created_at: String,
}

impl From<&LogEntry> for LogDisplay {
    fn from(entry: &LogEntry) -> Self {
        Self {
            level: entry.level.as_str().to_string(),
            text: entry.text.clone(),
            created_at: timestamp(Some(entry.created_at)),
        }
    }
}

/// Full report of one session
#[derive(Serialize)]
pub struct SessionReport {
    #[serde(flatten)]
    pub session: SessionDisplay,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub scenarios: Vec<ScenarioRunDisplay>,
}

impl SessionReport {
    pub fn new(detail: &SessionDetail, registry: &ScenarioRegistry) -> Self {
        Self {
            session: SessionDisplay::from(&detail.session),
            passed: detail.count(ScenarioStatus::Passed),
            failed: detail.count(ScenarioStatus::Failed),
            errors: detail.count(ScenarioStatus::Error),
            scenarios: detail
                .scenarios
                .iter()
                .map(|s| ScenarioRunDisplay::new(s, registry))
                .collect(),
        }
    }

    /// True when every run passed
    pub fn succeeded(&self) -> bool {
        self.scenarios.iter().all(|s| s.status == ScenarioStatus::Passed)
    }

    pub fn print(&self, format: OutputFormat, with_logs: bool) {
        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(self).unwrap_or_default());
            }
            OutputFormat::Table => {
                println!("Session {} on {}", self.session.id, self.session.server);
                println!("  Apps:     {}", self.session.executed_apps);
                println!("  Started:  {}", self.session.start_time);
                println!("  Finished: {}", self.session.end_time);
                println!(
                    "  Results:  {} passed, {} failed, {} errors",
                    self.passed, self.failed, self.errors
                );
                println!();
                print_list(&self.scenarios, format);

                if with_logs {
                    for scenario in self.scenarios.iter().filter(|s| !s.logs.is_empty()) {
                        println!();
                        println!("{} ({})", scenario.scenario_name, status_label(scenario.status));
                        for log in &scenario.logs {
                            println!("  {} [{}] {}", log.created_at, log.level, log.text);
                        }
                    }
                }
            }
        }
    }
}

pub fn list(args: SessionsArgs, settings: &Settings, format: OutputFormat) -> Result<()> {
    let db = Database::open(&settings.database_path)?;
    let sessions: Vec<SessionDisplay> = db
        .list_sessions(args.limit)?
        .iter()
        .map(SessionDisplay::from)
        .collect();
    print_list(&sessions, format);
    Ok(())
}

pub fn show(args: ShowArgs, settings: &Settings, format: OutputFormat) -> Result<()> {
    let db = Database::open(&settings.database_path)?;
    let detail = db
        .session_detail(args.id)?
        .ok_or_else(|| anyhow!("Session {} not found", args.id))?;
    let registry = scenario_suites::registry();
    SessionReport::new(&detail, &registry).print(format, !args.no_logs);
    Ok(())
}
