//! Scenario CLI - Main Entry Point
//!
//! Runs REST API scenarios against a configured environment and browses the
//! persisted session reports.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use scenario_common::Settings;

mod commands;
mod output;

use commands::{new_module, run, scenarios, serve, session};

/// Scenario CLI - REST API scenario runner
#[derive(Parser)]
#[command(name = "scenario")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file
    #[arg(long, env = "SCENARIO_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios and record a session
    Run(run::RunArgs),

    /// List registered scenarios
    List(scenarios::ListArgs),

    /// Show a session report
    Show(session::ShowArgs),

    /// List recent sessions
    Sessions(session::SessionsArgs),

    /// Start the HTTP API
    Serve(serve::ServeArgs),

    /// Scaffold a new scenario module
    NewModule(new_module::NewModuleArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Commands::Serve(_), false) => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(scenario_common::default_config_path);
    let load = || {
        if !config_path.exists() {
            output::print_warning(&format!(
                "Settings file {} not found, using defaults",
                config_path.display()
            ));
        }
        Settings::load(&config_path)
    };

    match cli.command {
        Commands::Run(args) => {
            if !run::execute(args, load()?, cli.format).await? {
                std::process::exit(1);
            }
        }
        Commands::List(args) => scenarios::execute(args, cli.format)?,
        Commands::Show(args) => session::show(args, &load()?, cli.format)?,
        Commands::Sessions(args) => session::list(args, &load()?, cli.format)?,
        Commands::Serve(args) => serve::execute(args, load()?).await?,
        Commands::NewModule(args) => new_module::execute(args)?,
        Commands::Version => {
            println!("Scenario CLI v{}", scenario_common::VERSION);
        }
    }

    Ok(())
}
