//! Steps shared by every to-do list scenario

use scenario_engine::assertions;
use scenario_engine::{current_time, EndPoint, ScenarioContext, ScenarioError, ScenarioResult};
use serde_json::{json, Map, Value};

use super::endpoints;

/// Which side of the application manages the series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Portal {
    Partner,
    Backoffice,
}

impl Portal {
    fn create(self) -> &'static EndPoint {
        match self {
            Self::Partner => &endpoints::CREATE_SERIES,
            Self::Backoffice => &endpoints::CREATE_SERIES_BACKOFFICE,
        }
    }

    fn items(self) -> &'static EndPoint {
        match self {
            Self::Partner => &endpoints::ITEMS_BY_TITLE,
            Self::Backoffice => &endpoints::ITEMS_BY_TITLE_BACKOFFICE,
        }
    }

    fn update(self) -> &'static EndPoint {
        match self {
            Self::Partner => &endpoints::UPDATE_SERIES,
            Self::Backoffice => &endpoints::UPDATE_SERIES_BACKOFFICE,
        }
    }

    fn delete(self) -> &'static EndPoint {
        match self {
            Self::Partner => &endpoints::DELETE_SERIES,
            Self::Backoffice => &endpoints::DELETE_SERIES_BACKOFFICE,
        }
    }
}

/// Who receives the generated items
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Audience {
    /// Partner series: `my_self`, `my_team` or `my_team_and_my_self`
    Criteria(&'static str),
    /// Backoffice series: explicit career level / partner type assignments
    Assignments(Value),
}

/// Body of a create or update request
#[derive(Debug, Clone)]
pub(crate) struct SeriesRequest {
    pub title: String,
    pub frequency: Option<&'static str>,
    pub frequency_coefficient: &'static str,
    pub start_date: &'static str,
    pub end_date: Option<&'static str>,
    pub link: &'static str,
    pub external_link: Option<&'static str>,
    pub audience: Audience,
}

impl SeriesRequest {
    pub fn new(title: impl Into<String>, audience: Audience) -> Self {
        Self {
            title: title.into(),
            frequency: None,
            frequency_coefficient: "1",
            start_date: "2025-01-01",
            end_date: None,
            link: "external_link",
            external_link: Some("https://somelink.com"),
            audience,
        }
    }

    pub fn schedule(
        mut self,
        frequency: &'static str,
        frequency_coefficient: &'static str,
        start_date: &'static str,
        end_date: &'static str,
    ) -> Self {
        self.frequency = Some(frequency);
        self.frequency_coefficient = frequency_coefficient;
        self.start_date = start_date;
        self.end_date = Some(end_date);
        self
    }

    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("frequency".into(), json!(self.frequency));
        body.insert("frequency_coefficient".into(), json!(self.frequency_coefficient));
        body.insert("link".into(), json!(self.link));
        body.insert("title".into(), json!(self.title));
        body.insert("start_date".into(), json!(self.start_date));
        match &self.audience {
            Audience::Criteria(criteria) => body.insert("criteria".into(), json!(criteria)),
            Audience::Assignments(assignments) => body.insert("todo_assignments".into(), assignments.clone()),
        };
        if let Some(end_date) = self.end_date {
            body.insert("end_date".into(), json!(end_date));
        }
        if let (Some(external_link), "external_link") = (self.external_link, self.link) {
            body.insert("external_link".into(), json!(external_link));
        }
        Value::Object(body)
    }
}

/// One assignment per career level, then one per partner type
pub(crate) fn assignments(career_levels: &[Value], partner_types: &[Value]) -> Value {
    let by_level = career_levels
        .iter()
        .map(|level| json!({"partner_type_key": null, "career_level_key": level}));
    let by_type = partner_types
        .iter()
        .map(|partner| json!({"partner_type_key": partner, "career_level_key": null}));
    Value::Array(by_level.chain(by_type).collect())
}

pub(crate) async fn login_user(cx: &mut ScenarioContext, role: &str) -> ScenarioResult<()> {
    cx.set_step("Login");
    let response = cx.login(role, &endpoints::LOGIN).await?;
    assertions::equal(response.status, 200)
}

/// Switch the authenticated user
pub(crate) async fn relogin(cx: &mut ScenarioContext, role: &str) -> ScenarioResult<()> {
    cx.logout();
    login_user(cx, role).await
}

/// A `[To Do List] <timestamp>` title no existing item uses
pub(crate) async fn unique_title(cx: &mut ScenarioContext, portal: Portal) -> ScenarioResult<String> {
    cx.set_step("Unique Title");
    let base = format!("[To Do List] {}", current_time());
    let mut title = base.clone();
    let mut suffix = 0;
    loop {
        let response = cx.send(portal.items(), &json!({"text": title})).await?;
        assertions::equal(response.status, 200)?;
        if response.json()["count"].as_u64().unwrap_or(0) == 0 {
            return Ok(title);
        }
        cx.warning(format!("Duplicate To Do List found with text: '{}'", title))?;
        suffix += 1;
        title = format!("{} ({})", base, suffix);
    }
}

pub(crate) async fn create_series(
    cx: &mut ScenarioContext,
    portal: Portal,
    request: &SeriesRequest,
) -> ScenarioResult<Value> {
    cx.set_step("Create Series");
    let response = cx.send(portal.create(), &request.to_json()).await?;
    assertions::equal(response.status, 201)?;
    let series = response.into_json();
    assertions::contains("title", &series)?;
    Ok(series)
}

pub(crate) async fn update_series(
    cx: &mut ScenarioContext,
    portal: Portal,
    slug: &str,
    request: &SeriesRequest,
) -> ScenarioResult<Value> {
    cx.set_step("Update Series");
    let endpoint = cx.format_endpoint(portal.update(), &[("slug", slug)])?;
    let response = cx.send(&endpoint, &request.to_json()).await?;
    assertions::equal(response.status, 200)?;
    let series = response.into_json();
    assertions::contains("title", &series)?;
    Ok(series)
}

pub(crate) async fn delete_series(cx: &mut ScenarioContext, portal: Portal, slug: &str) -> ScenarioResult<()> {
    cx.set_step("Delete Series");
    let endpoint = cx.format_endpoint(portal.delete(), &[("slug", slug)])?;
    let response = cx.call(&endpoint, None, None).await?;
    assertions::equal(response.status, 204)
}

/// Items generated for a series title; exactly `expected` of them
pub(crate) async fn series_items(
    cx: &mut ScenarioContext,
    portal: Portal,
    title: &str,
    expected: u64,
) -> ScenarioResult<Vec<Value>> {
    cx.set_step("Get Series Items");
    let response = cx.send(portal.items(), &json!({"text": title})).await?;
    assertions::equal(response.status, 200)?;
    let items = response.into_json();
    assertions::equal(&items["count"], &json!(expected))?;
    Ok(results(items))
}

/// Items visible to the logged-in partner, optionally filtered by origin
pub(crate) async fn team_items(
    cx: &mut ScenarioContext,
    title: &str,
    expected: u64,
    origin: Option<&str>,
) -> ScenarioResult<Vec<Value>> {
    cx.set_step("Get Series Items for Team");
    let mut params = json!({"text": title});
    if let Some(origin) = origin {
        params["origin"] = json!(origin);
    }
    let response = cx.send(&endpoints::TEAM_ITEMS_BY_TITLE, &params).await?;
    assertions::equal(response.status, 200)?;
    let items = response.into_json();
    assertions::contains("count", &items)?;
    assertions::equal(&items["count"], &json!(expected))?;
    assertions::contains("results", &items)?;
    Ok(results(items))
}

pub(crate) async fn finish_task(cx: &mut ScenarioContext, item: &Value) -> ScenarioResult<()> {
    let body = json!({"todo_item": id_text(&item["id"])?, "comment": "Comment"});
    let response = cx.send(&endpoints::FINISH_TASK, &body).await?;
    assertions::equal(response.status, 201)
}

/// Finish the first and, when different, the last item
pub(crate) async fn finish_first_and_last(cx: &mut ScenarioContext, items: &[Value]) -> ScenarioResult<()> {
    cx.set_step("Finish Tasks");
    if let Some(first) = items.first() {
        finish_task(cx, first).await?;
    }
    if items.len() > 1 {
        if let Some(last) = items.last() {
            finish_task(cx, last).await?;
        }
    }
    Ok(())
}

/// `(career_level, partner_type)` of the logged-in partner
pub(crate) async fn profile(cx: &mut ScenarioContext) -> ScenarioResult<(Value, Value)> {
    cx.set_step("Get Details from profile");
    let response = cx.call(&endpoints::PROFILE, None, None).await?;
    assertions::equal(response.status, 200)?;
    let profile = response.into_json();
    assertions::contains("career_level", &profile)?;
    assertions::contains("partner_type", &profile)?;
    Ok((profile["career_level"].clone(), profile["partner_type"].clone()))
}

pub(crate) fn slug_of(series: &Value) -> ScenarioResult<String> {
    series["slug"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ScenarioError::other("series response has no slug"))
}

pub(crate) fn title_of(series: &Value) -> ScenarioResult<String> {
    series["title"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ScenarioError::other("series response has no title"))
}

fn results(mut items: Value) -> Vec<Value> {
    match items["results"].take() {
        Value::Array(results) => results,
        _ => Vec::new(),
    }
}

fn id_text(id: &Value) -> ScenarioResult<String> {
    match id {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(ScenarioError::other(format!("unexpected item id: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partner_request_body() {
        let body = SeriesRequest::new("T", Audience::Criteria("my_self"))
            .schedule("monthly", "6", "2025-01-01", "2030-01-01")
            .to_json();
        assert_eq!(
            body,
            json!({
                "frequency": "monthly",
                "frequency_coefficient": "6",
                "link": "external_link",
                "title": "T",
                "start_date": "2025-01-01",
                "criteria": "my_self",
                "end_date": "2030-01-01",
                "external_link": "https://somelink.com",
            })
        );
    }

    #[test]
    fn test_event_link_without_frequency() {
        let mut request = SeriesRequest::new("T", Audience::Criteria("my_self"));
        request.link = "events";
        let body = request.to_json();
        assert_eq!(body["frequency"], Value::Null);
        assert!(body.get("end_date").is_none());
        assert!(body.get("external_link").is_none());
    }

    #[test]
    fn test_assignments_order() {
        let value = assignments(&[json!(3)], &[json!("2")]);
        assert_eq!(
            value,
            json!([
                {"partner_type_key": null, "career_level_key": 3},
                {"partner_type_key": "2", "career_level_key": null},
            ])
        );
    }

    #[test]
    fn test_id_text() {
        assert_eq!(id_text(&json!(12)).unwrap(), "12");
        assert_eq!(id_text(&json!("ab")).unwrap(), "ab");
        assert!(id_text(&Value::Null).is_err());
    }
}
