//! To-do list series (`/todo/`)
//!
//! All scenarios of this module create and delete series visible to the same
//! partners, so each holds the [`GROUP`] lock for its whole body.

use scenario_engine::{Scenario, ScenarioDef, ScenarioRegistry};

mod backoffice;
mod base;
pub mod endpoints;
mod partner;

pub use backoffice::{AssignmentScenario, BackOfficeBadDataScenario, Targeting};
pub use partner::{BadDataScenario, SeriesPlan, SeriesScenario, TeamScenario, UpdateScenario};

pub const MODULE: &str = "to_do_list";

/// Group lock shared by every scenario of this module
pub const GROUP: &str = "to_do_list";

fn scenario<S, F>(name: &str, description: &str, build: F) -> ScenarioDef
where
    S: Scenario + 'static,
    F: Fn() -> S + Send + Sync + 'static,
{
    ScenarioDef::with_factory(MODULE, name, move || Ok(Box::new(build()) as Box<dyn Scenario>))
        .with_description(description)
}

pub fn register(registry: &mut ScenarioRegistry) {
    registry.register(ScenarioDef::abstract_base(MODULE, "BaseToDoListScenario"));
    registry.register(
        ScenarioDef::abstract_base(MODULE, "PartnerBaseScenario")
            .with_description("Base class for Partner To-Do List Scenarios"),
    );
    registry.register(
        ScenarioDef::abstract_base(MODULE, "BackOfficeBaseScenario")
            .with_description("Base class for BackOffice To-Do List Scenarios"),
    );

    let series = [
        ("ToDoListTestScenario", "Test To-Do-List with no frequency", SeriesPlan::ONCE),
        ("ToDoListDailyTestScenario", "Test Daily field for To-Do-List", SeriesPlan::DAILY),
        ("ToDoListWeeklyTestScenario", "Test Weekly field for To-Do-List", SeriesPlan::WEEKLY),
        ("ToDoListMonthlyTestScenario", "Test Monthly field for To-Do-List", SeriesPlan::MONTHLY),
        ("ToDoListYearlyTestScenario", "Test Yearly field for To-Do-List", SeriesPlan::YEARLY),
    ];
    for (name, description, plan) in series {
        registry.register(scenario(name, description, move || SeriesScenario::new(plan)));
    }

    registry.register(scenario("ToDoListUpdateTestScenario", "Test Update for To-Do-List", UpdateScenario::default));
    registry.register(scenario(
        "ToDoListMyTeamTestScenario",
        "Test To-Do-List for My Team",
        TeamScenario::my_team,
    ));
    registry.register(scenario(
        "ToDoListMeAndMyTeamTestScenario",
        "Test To-Do-List for Me and My Team",
        TeamScenario::me_and_my_team,
    ));
    registry.register(scenario(
        "ToDoListBadDataTestScenario",
        "Test bad data for To-Do-List",
        BadDataScenario::default,
    ));

    let assignments = [
        ("ToDoListBackOfficeCareerLevelTestScenario", "Test To-Do-List Backoffice Career Level field", Targeting::CareerLevel),
        ("ToDoListBackOfficePartnerTypeTestScenario", "Test To-Do-List Backoffice Partner type field", Targeting::PartnerType),
        (
            "ToDoListBackOfficePartnerAndCareerLevelTestScenario",
            "Test To-Do-List Backoffice Partner type and Career Level fields",
            Targeting::CareerLevelAndPartnerType,
        ),
        (
            "ToDoListBackOfficeMultipleCareerLevelTestScenario",
            "Test To-Do-List Backoffice with multiple Career Levels",
            Targeting::MultipleCareerLevels,
        ),
        (
            "ToDoListBackOfficeMultiplePartnerTestScenario",
            "Test To-Do-List Backoffice with multiple Partner types",
            Targeting::MultiplePartnerTypes,
        ),
        (
            "ToDoListBackOfficeMultiplePartnerAndCareerLevelTestScenario",
            "Test To-Do-List Backoffice with multiple Partner types and Career Levels",
            Targeting::MultipleCareerLevelsAndPartnerTypes,
        ),
        (
            "ToDoListBackOfficeNotInTheListTestScenario",
            "Test To-Do-List Backoffice assignments that exclude the partner",
            Targeting::NotInTheList,
        ),
    ];
    for (name, description, targeting) in assignments {
        registry.register(scenario(name, description, move || AssignmentScenario::new(targeting)));
    }

    registry.register(scenario(
        "ToDoListBackOfficeBadDataTestScenario",
        "Test bad data for BackOffice To-Do-List with non-empty assignments",
        BackOfficeBadDataScenario::default,
    ));
}
