//! Scenario modules
//!
//! Each module exposes `register`, which adds its scenario types to a
//! [`ScenarioRegistry`]. Module names are what `app_name` selects.

use scenario_engine::ScenarioRegistry;
use tracing::debug;

pub mod contacts;
pub mod to_do_list;

/// Registry holding every module of this crate, in a stable order
pub fn registry() -> ScenarioRegistry {
    let mut registry = ScenarioRegistry::new();
    register_all(&mut registry);
    registry
}

pub fn register_all(registry: &mut ScenarioRegistry) {
    contacts::register(registry);
    to_do_list::register(registry);
    debug!("Registered scenario modules: {}", registry.modules().join(", "));
}
