//! Series assigned by the backoffice to career levels and partner types

use async_trait::async_trait;
use scenario_engine::{Scenario, ScenarioContext, ScenarioResult};
use serde_json::{json, Value};

use super::base::{self, Audience, Portal, SeriesRequest};
use super::partner::{bad_schedules, reject_bad_schedules, SeriesPlan};
use super::GROUP;

/// Which assignments target the reference partner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Targeting {
    CareerLevel,
    PartnerType,
    CareerLevelAndPartnerType,
    /// The partner's level plus levels 1 and 2
    MultipleCareerLevels,
    /// The partner's type plus types "2" and "3"
    MultiplePartnerTypes,
    MultipleCareerLevelsAndPartnerTypes,
    /// Every level and type except the partner's own
    NotInTheList,
}

impl Targeting {
    /// Assignments built from the partner's profile
    fn assignments(self, career_level: Value, partner_type: Value) -> Value {
        let extra_levels = [json!(1), json!(2)];
        let extra_types = [json!("2"), json!("3")];
        let with = |own: Value, extra: &[Value]| -> Vec<Value> {
            let rest: Vec<Value> = extra.iter().filter(|v| **v != own).cloned().collect();
            std::iter::once(own).chain(rest).collect()
        };

        match self {
            Self::CareerLevel => base::assignments(&[career_level], &[]),
            Self::PartnerType => base::assignments(&[], &[partner_type]),
            Self::CareerLevelAndPartnerType => base::assignments(&[career_level], &[partner_type]),
            Self::MultipleCareerLevels => base::assignments(&with(career_level, &extra_levels), &[]),
            Self::MultiplePartnerTypes => base::assignments(&[], &with(partner_type, &extra_types)),
            Self::MultipleCareerLevelsAndPartnerTypes => base::assignments(
                &with(career_level, &extra_levels),
                &with(partner_type, &extra_types),
            ),
            Self::NotInTheList => {
                let levels: Vec<Value> = (1..=8).map(|l| json!(l)).filter(|l| *l != career_level).collect();
                let types: Vec<Value> = extra_types.iter().filter(|t| **t != partner_type).cloned().collect();
                base::assignments(&levels, &types)
            }
        }
    }

    /// Items the reference partner should see
    fn visible_items(self) -> u64 {
        match self {
            Self::NotInTheList => 0,
            _ => SeriesPlan::WEEKLY.expected_items,
        }
    }
}

/// Backoffice creates an assigned weekly series; the partner checks visibility
#[derive(Debug, Clone)]
pub struct AssignmentScenario {
    targeting: Targeting,
}

impl AssignmentScenario {
    pub fn new(targeting: Targeting) -> Self {
        Self { targeting }
    }
}

#[async_trait]
impl Scenario for AssignmentScenario {
    async fn run(&mut self, cx: &mut ScenarioContext) -> ScenarioResult<()> {
        let _group = cx.group_lock(GROUP).await;
        let plan = SeriesPlan::WEEKLY;

        base::login_user(cx, "partner1").await?;
        let (career_level, partner_type) = base::profile(cx).await?;

        base::relogin(cx, "backoffice").await?;
        let title = base::unique_title(cx, Portal::Backoffice).await?;
        cx.set_step("Create assignments list");
        let assignments = self.targeting.assignments(career_level, partner_type);
        cx.debug(format!("Assignments: {}", assignments))?;

        let request = SeriesRequest::new(title.clone(), Audience::Assignments(assignments)).schedule(
            "weekly",
            plan.frequency_coefficient,
            plan.start_date,
            "2025-02-01",
        );
        let series = base::create_series(cx, Portal::Backoffice, &request).await?;
        base::series_items(cx, Portal::Backoffice, &title, plan.expected_items).await?;

        base::relogin(cx, "partner1").await?;
        base::team_items(cx, &title, self.targeting.visible_items(), None).await?;

        base::relogin(cx, "backoffice").await?;
        base::delete_series(cx, Portal::Backoffice, &base::slug_of(&series)?).await
    }
}

/// Invalid schedules with valid assignments must be rejected
#[derive(Debug, Default)]
pub struct BackOfficeBadDataScenario;

#[async_trait]
impl Scenario for BackOfficeBadDataScenario {
    async fn run(&mut self, cx: &mut ScenarioContext) -> ScenarioResult<()> {
        let _group = cx.group_lock(GROUP).await;

        base::login_user(cx, "backoffice").await?;
        let valid = base::assignments(&[json!(1), json!(2), json!(8)], &[json!("2")]);
        reject_bad_schedules(cx, Portal::Backoffice, bad_schedules(), ("todo_assignments", valid)).await
    }
}
