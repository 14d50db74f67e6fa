//! Contact management (`/network/contacts/`)

use scenario_engine::{ScenarioDef, ScenarioRegistry};

pub mod endpoints;
mod scenarios;

pub use scenarios::ContactsTestScenario;

pub const MODULE: &str = "contacts";

pub fn register(registry: &mut ScenarioRegistry) {
    registry.register(
        ScenarioDef::concrete::<ContactsTestScenario>(MODULE, "ContactsTestScenario")
            .with_description("Create and test Contact module"),
    );
}
