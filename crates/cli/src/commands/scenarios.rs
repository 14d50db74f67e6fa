//! Registered scenario listing

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use scenario_engine::{ScenarioDef, ScenarioKind, ScenarioRegistry};

use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ListArgs {
    /// Only list scenarios of this app
    #[arg(short, long)]
    pub app: Option<String>,

    /// Include abstract base scenarios
    #[arg(long)]
    pub all: bool,
}

/// Scenario definition display wrapper for serialization
#[derive(Serialize)]
pub struct ScenarioDefDisplay {
    pub app: String,
    pub name: String,
    pub kind: ScenarioKind,
    pub description: Option<String>,
}

impl From<&ScenarioDef> for ScenarioDefDisplay {
    fn from(def: &ScenarioDef) -> Self {
        Self {
            app: def.module.clone(),
            name: def.name.clone(),
            kind: def.kind,
            description: def.description.clone(),
        }
    }
}

impl TableDisplay for ScenarioDefDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["App", "Scenario", "Kind", "Description"]
    }

    fn row(&self) -> Vec<String> {
        let kind = match self.kind {
            ScenarioKind::Abstract => "abstract",
            ScenarioKind::Concrete => "concrete",
        };
        vec![
            self.app.clone(),
            self.name.clone(),
            kind.to_string(),
            self.description.clone().unwrap_or_else(|| "-".to_string()),
        ]
    }
}

/// Collect the definitions selected by `args`
pub fn collect(registry: &ScenarioRegistry, args: &ListArgs) -> Result<Vec<ScenarioDefDisplay>> {
    let modules: Vec<&str> = match args.app.as_deref() {
        Some(app) if !registry.has_module(app) => bail!("Unknown app '{}'", app),
        Some(app) => vec![app],
        None => registry.modules(),
    };

    Ok(modules
        .into_iter()
        .filter_map(|module| registry.definitions(module))
        .flatten()
        .filter(|def| args.all || def.is_concrete())
        .map(ScenarioDefDisplay::from)
        .collect())
}

pub fn execute(args: ListArgs, format: OutputFormat) -> Result<()> {
    let registry = scenario_suites::registry();
    let items = collect(&registry, &args)?;
    print_list(&items, format);
    Ok(())
}
