//! Scaffolding for a new scenario module

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::output::{print_info, print_success};

const TEMPLATES: [(&str, &str); 3] = [
    ("mod.rs", include_str!("../../templates/module/mod.rs.tmpl")),
    ("endpoints.rs", include_str!("../../templates/module/endpoints.rs.tmpl")),
    ("scenarios.rs", include_str!("../../templates/module/scenarios.rs.tmpl")),
];

#[derive(Args)]
pub struct NewModuleArgs {
    /// Module name, snake_case (e.g. sales_forms)
    pub name: String,

    /// Directory the module is created in
    #[arg(short, long, default_value = "crates/suites/src")]
    pub dir: PathBuf,
}

/// `sales_forms` -> `SalesForms`
pub fn title_case(name: &str) -> String {
    name.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn validate(name: &str) -> Result<()> {
    let starts_ok = name.chars().next().map_or(false, |c| c.is_ascii_lowercase());
    let chars_ok = name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !starts_ok || !chars_ok {
        bail!("'{}' is not a valid module name, use lowercase snake_case", name);
    }
    Ok(())
}

pub fn render(template: &str, name: &str) -> String {
    template
        .replace("{{app_name}}", name)
        .replace("{{app_title}}", &title_case(name))
}

/// Write `<dir>/<name>/{mod,endpoints,scenarios}.rs`; never overwrites
pub fn scaffold(name: &str, dir: &Path) -> Result<Vec<PathBuf>> {
    validate(name)?;
    let target = dir.join(name);
    if target.exists() {
        bail!("{} already exists", target.display());
    }
    std::fs::create_dir_all(&target).with_context(|| format!("creating {}", target.display()))?;

    let mut written = Vec::with_capacity(TEMPLATES.len());
    for (file, template) in TEMPLATES {
        let path = target.join(file);
        std::fs::write(&path, render(template, name)).with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

pub fn execute(args: NewModuleArgs) -> Result<()> {
    for path in scaffold(&args.name, &args.dir)? {
        print_success(&format!("Created {}", path.display()));
    }
    print_info(&format!(
        "Wire it into the registry: add `pub mod {name};` and `{name}::register(registry);` to register_all",
        name = args.name
    ));
    Ok(())
}
