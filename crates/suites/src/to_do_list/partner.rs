//! Series managed by a partner for themselves or their team

use async_trait::async_trait;
use scenario_engine::assertions::{self, AssertionExt};
use scenario_engine::{Scenario, ScenarioContext, ScenarioResult};
use serde_json::{json, Map, Value};

use super::base::{self, Audience, Portal, SeriesRequest};
use super::{endpoints, GROUP};

/// Schedule of a series and the number of items it must generate
#[derive(Debug, Clone, Copy)]
pub struct SeriesPlan {
    pub frequency: Option<&'static str>,
    pub frequency_coefficient: &'static str,
    pub start_date: &'static str,
    pub end_date: Option<&'static str>,
    pub link: &'static str,
    pub expected_items: u64,
}

impl SeriesPlan {
    pub const ONCE: SeriesPlan = SeriesPlan {
        frequency: None,
        frequency_coefficient: "1",
        start_date: "2025-01-01",
        end_date: None,
        link: "events",
        expected_items: 1,
    };

    pub const DAILY: SeriesPlan = SeriesPlan::recurring("daily", "2", "2024-12-29", "2025-01-11", 7);
    pub const WEEKLY: SeriesPlan = SeriesPlan::recurring("weekly", "2", "2025-01-01", "2025-02-01", 3);
    pub const MONTHLY: SeriesPlan = SeriesPlan::recurring("monthly", "6", "2025-01-01", "2030-01-01", 11);
    pub const YEARLY: SeriesPlan = SeriesPlan::recurring("yearly", "3", "2025-01-01", "2035-02-01", 4);

    const fn recurring(
        frequency: &'static str,
        frequency_coefficient: &'static str,
        start_date: &'static str,
        end_date: &'static str,
        expected_items: u64,
    ) -> Self {
        Self {
            frequency: Some(frequency),
            frequency_coefficient,
            start_date,
            end_date: Some(end_date),
            link: "external_link",
            expected_items,
        }
    }

    fn request(&self, title: impl Into<String>, criteria: &'static str) -> SeriesRequest {
        let mut request = SeriesRequest::new(title, Audience::Criteria(criteria));
        request.frequency = self.frequency;
        request.frequency_coefficient = self.frequency_coefficient;
        request.start_date = self.start_date;
        request.end_date = self.end_date;
        request.link = self.link;
        request
    }
}

/// Create a series, check its items, finish some, delete it
#[derive(Debug, Clone)]
pub struct SeriesScenario {
    plan: SeriesPlan,
}

impl SeriesScenario {
    pub fn new(plan: SeriesPlan) -> Self {
        Self { plan }
    }
}

#[async_trait]
impl Scenario for SeriesScenario {
    async fn run(&mut self, cx: &mut ScenarioContext) -> ScenarioResult<()> {
        let _group = cx.group_lock(GROUP).await;

        base::login_user(cx, "partner1").await?;
        let title = base::unique_title(cx, Portal::Partner).await?;
        let series = base::create_series(cx, Portal::Partner, &self.plan.request(title, "my_self")).await?;

        let items = base::series_items(cx, Portal::Partner, &base::title_of(&series)?, self.plan.expected_items).await?;
        base::finish_first_and_last(cx, &items).await?;
        base::delete_series(cx, Portal::Partner, &base::slug_of(&series)?).await
    }
}

/// Reschedule a monthly series as a weekly one
#[derive(Debug, Default)]
pub struct UpdateScenario;

#[async_trait]
impl Scenario for UpdateScenario {
    async fn run(&mut self, cx: &mut ScenarioContext) -> ScenarioResult<()> {
        let _group = cx.group_lock(GROUP).await;

        base::login_user(cx, "partner1").await?;
        let title = base::unique_title(cx, Portal::Partner).await?;
        let series = base::create_series(cx, Portal::Partner, &SeriesPlan::MONTHLY.request(title.clone(), "my_self")).await?;
        let slug = base::slug_of(&series)?;

        let items = base::series_items(cx, Portal::Partner, &title, SeriesPlan::MONTHLY.expected_items).await?;
        base::finish_first_and_last(cx, &items).await?;

        let updated = base::update_series(cx, Portal::Partner, &slug, &SeriesPlan::WEEKLY.request(title, "my_self")).await?;
        cx.info(format!("Series rescheduled: {}", updated["title"]))?;

        base::delete_series(cx, Portal::Partner, &slug).await
    }
}

/// A series shared with the team must reach the second partner
#[derive(Debug, Clone)]
pub struct TeamScenario {
    criteria: &'static str,
    own_items: u64,
}

impl TeamScenario {
    pub fn my_team() -> Self {
        Self {
            criteria: "my_team",
            own_items: 0,
        }
    }

    pub fn me_and_my_team() -> Self {
        Self {
            criteria: "my_team_and_my_self",
            own_items: SeriesPlan::MONTHLY.expected_items,
        }
    }
}

#[async_trait]
impl Scenario for TeamScenario {
    async fn run(&mut self, cx: &mut ScenarioContext) -> ScenarioResult<()> {
        let _group = cx.group_lock(GROUP).await;
        let expected = SeriesPlan::MONTHLY.expected_items;

        base::login_user(cx, "partner1").await?;
        let title = base::unique_title(cx, Portal::Partner).await?;
        let series = base::create_series(cx, Portal::Partner, &SeriesPlan::MONTHLY.request(title.clone(), self.criteria)).await?;

        base::series_items(cx, Portal::Partner, &title, expected).await?;
        base::team_items(cx, &title, self.own_items, Some("my_tasks")).await?;
        base::team_items(cx, &title, expected, Some("my_team_tasks")).await?;

        base::relogin(cx, "partner2").await?;
        base::team_items(cx, &title, expected, None).await?;

        base::relogin(cx, "partner1").await?;
        base::delete_series(cx, Portal::Partner, &base::slug_of(&series)?).await
    }
}

/// Invalid schedules must be rejected with 400
#[derive(Debug, Default)]
pub struct BadDataScenario;

pub(crate) fn bad_schedules() -> Vec<Value> {
    vec![
        json!({"frequency": "invalid_frequency", "frequency_coefficient": "1", "start_date": "2025-01-01", "end_date": "2025-01-10"}),
        json!({"frequency": "daily", "frequency_coefficient": "-1", "start_date": "2025-01-01", "end_date": "2025-01-10"}),
        json!({"frequency": "daily", "frequency_coefficient": "2", "start_date": "2025-01-10", "end_date": "2025-01-01"}),
        json!({"frequency": "weekly", "frequency_coefficient": "1", "start_date": "invalid_date", "end_date": "2025-02-01"}),
        json!({"frequency": "monthly", "frequency_coefficient": "abc", "start_date": "2025-01-01", "end_date": "2025-12-01"}),
        json!({"frequency": "monthly", "frequency_coefficient": "0", "start_date": "2025-01-01", "end_date": "2025-12-01"}),
    ]
}

/// Send each bad schedule merged over `audience` fields; every one must fail
pub(crate) async fn reject_bad_schedules(
    cx: &mut ScenarioContext,
    portal: Portal,
    cases: Vec<Value>,
    audience: (&str, Value),
) -> ScenarioResult<()> {
    let endpoint = match portal {
        Portal::Partner => &endpoints::CREATE_SERIES,
        Portal::Backoffice => &endpoints::CREATE_SERIES_BACKOFFICE,
    };

    for (index, case) in cases.into_iter().enumerate() {
        let index = index + 1;
        let title = base::unique_title(cx, portal).await?;
        cx.set_step(format!("Bad Data Case {}", index));

        let mut body = Map::new();
        body.insert("title".into(), json!(title));
        body.insert("link".into(), json!("external_link"));
        body.insert("external_link".into(), json!("https://somelink.com"));
        body.insert(audience.0.to_string(), audience.1.clone());
        if let Value::Object(fields) = case {
            body.extend(fields);
        }

        let response = cx.send(endpoint, &Value::Object(body)).await?;
        assertions::equal(response.status, 400).or_message(format!(
            "Failed test for Case {}. Expected 400 but got {}",
            index, response.status
        ))?;
    }
    Ok(())
}

#[async_trait]
impl Scenario for BadDataScenario {
    async fn run(&mut self, cx: &mut ScenarioContext) -> ScenarioResult<()> {
        let _group = cx.group_lock(GROUP).await;

        base::login_user(cx, "partner1").await?;
        let mut cases = bad_schedules();
        // Missing coefficient
        cases.push(json!({"frequency": "monthly", "start_date": "2025-01-01", "end_date": "2025-12-01"}));
        reject_bad_schedules(cx, Portal::Partner, cases, ("criteria", json!("my_self"))).await
    }
}
