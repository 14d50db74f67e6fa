use std::path::PathBuf;

use tracing::info;

use scenario_common::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::var("SCENARIO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| scenario_common::default_config_path());
    let settings = Settings::load(&config_path)?;
    info!(
        "Loaded settings from {} ({} environments)",
        config_path.display(),
        settings.environments.len()
    );

    scenario_web::serve(settings).await
}
