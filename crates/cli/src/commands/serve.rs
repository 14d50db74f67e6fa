//! Scenario API server

use anyhow::Result;
use clap::Args;

use scenario_common::Settings;

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address, overrides `listen_addr` from settings
    #[arg(short, long)]
    pub listen: Option<String>,
}

pub async fn execute(args: ServeArgs, mut settings: Settings) -> Result<()> {
    if let Some(listen) = args.listen {
        settings.listen_addr = listen;
    }
    scenario_web::serve(settings).await
}
