//! Scenario execution from the command line

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use scenario_common::{Database, Settings};
use scenario_engine::Coordinator;

use super::session::SessionReport;
use crate::output::{print_error, print_success, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Environment key from settings, matched exactly (e.g. Development, Staging, Local)
    #[arg(short, long)]
    pub env: String,

    /// App whose scenarios to run; all apps when omitted
    #[arg(short, long)]
    pub app: Option<String>,

    /// Single scenario within `--app`
    #[arg(short, long, requires = "app")]
    pub scenario: Option<String>,

    /// Base URL, overrides the environment's configured URL
    #[arg(long)]
    pub base_url: Option<String>,
}

/// Resolve the base URL of the run
fn base_url(args: &RunArgs, settings: &Settings) -> Result<String> {
    if let Some(url) = &args.base_url {
        return Ok(url.clone());
    }
    settings.base_url(&args.env).map(str::to_string).ok_or_else(|| {
        anyhow!(
            "Environment '{}' has no base URL (configured: {})",
            args.env,
            settings.environment_keys().join(", ")
        )
    })
}

/// Run the selected scenarios; returns whether every run passed
pub async fn execute(args: RunArgs, settings: Settings, format: OutputFormat) -> Result<bool> {
    let base_url = base_url(&args, &settings)?;
    debug!(
        "Running app={:?} scenario={:?} on {} ({})",
        args.app, args.scenario, args.env, base_url
    );

    let db = Database::open(&settings.database_path)?;
    let registry = Arc::new(scenario_suites::registry());
    let coordinator = Coordinator::new(registry, db, Arc::new(settings))?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg} [{elapsed}]")?);
    spinner.set_message(format!("Running scenarios against {}", base_url));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = coordinator
        .execute_scenarios(&base_url, &args.env, args.app.as_deref(), args.scenario.as_deref())
        .await;
    spinner.finish_and_clear();
    let session = result?;

    let detail = coordinator
        .database()
        .session_detail(session.id)?
        .ok_or_else(|| anyhow!("Session {} vanished", session.id))?;
    let report = SessionReport::new(&detail, coordinator.registry());
    report.print(format, false);

    let succeeded = report.succeeded();
    if matches!(format, OutputFormat::Table) {
        println!();
        if succeeded {
            print_success(&format!("Session {} passed", session.id));
        } else {
            print_error(&format!(
                "Session {} has failures, see `scenario show {}`",
                session.id, session.id
            ));
        }
    }
    Ok(succeeded)
}
