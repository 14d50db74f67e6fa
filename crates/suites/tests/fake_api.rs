//! Scenario modules run end to end against an in-process stand-in of the
//! application under test.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{Days, Months, NaiveDate};
use parking_lot::Mutex;
use scenario_common::{Credentials, Database, EnvironmentConfig, ScenarioStatus, Settings};
use scenario_engine::Coordinator;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Fake {
    next_id: u64,
    /// Accept any contact payload
    lenient_contacts: bool,
    contacts: HashMap<String, Value>,
    series: HashMap<String, Series>,
    finished: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Portal {
    Partner,
    Backoffice,
}

struct Series {
    title: String,
    items: Vec<u64>,
    portal: Portal,
    owner: String,
    criteria: Option<String>,
    assignments: Vec<Value>,
}

/// Partners share one team; the second element is the career level, the
/// third the partner type
const PARTNERS: [(&str, u64, &str); 2] = [("partner1", 3, "1"), ("partner2", 5, "1")];

fn partner(name: &str) -> Option<(u64, &'static str)> {
    PARTNERS
        .iter()
        .find(|(user, _, _)| *user == name)
        .map(|(_, level, kind)| (*level, *kind))
}

impl Series {
    fn criteria_has(&self, wanted: &[&str]) -> bool {
        self.portal == Portal::Partner && self.criteria.as_deref().map_or(false, |c| wanted.contains(&c))
    }

    fn assigned_to(&self, user: &str) -> bool {
        let Some((level, kind)) = partner(user) else {
            return false;
        };
        self.portal == Portal::Backoffice
            && self
                .assignments
                .iter()
                .any(|a| a["career_level_key"] == json!(level) || a["partner_type_key"] == json!(kind))
    }

    /// Items the user owns as a task
    fn is_own_task(&self, user: &str) -> bool {
        (self.owner == user && self.criteria_has(&["my_self", "my_team_and_my_self"])) || self.assigned_to(user)
    }

    /// Items the user handed to the team
    fn is_team_task(&self, user: &str) -> bool {
        self.owner == user && self.criteria_has(&["my_team", "my_team_and_my_self"])
    }

    /// Items a teammate handed to the user
    fn is_from_team(&self, user: &str) -> bool {
        self.owner != user
            && partner(&self.owner).is_some()
            && partner(user).is_some()
            && self.criteria_has(&["my_team", "my_team_and_my_self"])
    }
}

type Shared = Arc<Mutex<Fake>>;
type Reply = (StatusCode, Json<Value>);

fn reply(status: StatusCode, body: Value) -> Reply {
    (status, Json(body))
}

/// User behind the bearer token
fn user(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer token-"))
        .map(str::to_string)
}

fn authorized(headers: &HeaderMap) -> bool {
    user(headers).is_some()
}

async fn token(Json(body): Json<Value>) -> Reply {
    match (body["username"].as_str(), body["password"].as_str()) {
        (Some(user), Some("secret")) => reply(StatusCode::OK, json!({"access": format!("token-{}", user)})),
        _ => reply(StatusCode::UNAUTHORIZED, json!({"detail": "No active account"})),
    }
}

fn contact_is_valid(contact: &Value) -> bool {
    let country_ok = contact["country"]
        .as_str()
        .map_or(false, |c| c.len() == 2 && c.chars().all(|ch| ch.is_ascii_uppercase()));
    let flags_ok = ["is_prospect_customer", "is_prospect_partner", "is_customer", "is_business_partner"]
        .iter()
        .all(|flag| contact[*flag].is_boolean());
    let emails_ok = contact["emails"]
        .as_array()
        .map_or(false, |emails| emails.iter().all(|e| e["email"].as_str().map_or(false, |s| s.contains('@'))));
    let phones_ok = contact["phones"].as_array().map_or(false, |phones| {
        phones.iter().all(|p| {
            p["number"]
                .as_str()
                .and_then(|n| n.strip_prefix('+'))
                .map_or(false, |digits| digits.chars().all(|c| c.is_ascii_digit()))
        })
    });
    let type_ok = matches!(contact["message_type"].as_str(), Some("I") | Some("F"));
    let zip_ok = contact["zip_code"]
        .as_str()
        .map_or(false, |z| !z.is_empty() && z.chars().all(|c| c.is_ascii_digit()));
    country_ok && flags_ok && emails_ok && phones_ok && type_ok && zip_ok
}

async fn profile(headers: HeaderMap) -> Reply {
    match user(&headers).as_deref().and_then(partner) {
        Some((level, kind)) => reply(StatusCode::OK, json!({"career_level": level, "partner_type": kind})),
        None => reply(StatusCode::UNAUTHORIZED, json!({})),
    }
}

async fn create_contact(State(fake): State<Shared>, headers: HeaderMap, Json(mut body): Json<Value>) -> Reply {
    if !authorized(&headers) {
        return reply(StatusCode::UNAUTHORIZED, json!({}));
    }
    let mut fake = fake.lock();
    if !fake.lenient_contacts && !contact_is_valid(&body) {
        return reply(StatusCode::BAD_REQUEST, json!({"detail": "invalid"}));
    }
    fake.next_id += 1;
    let slug = format!("contact-{}", fake.next_id);
    body["id"] = json!(fake.next_id);
    body["slug"] = json!(slug);
    fake.contacts.insert(slug, body.clone());
    reply(StatusCode::CREATED, body)
}

async fn get_contact(State(fake): State<Shared>, Path(slug): Path<String>) -> Reply {
    match fake.lock().contacts.get(&slug) {
        Some(contact) => reply(StatusCode::OK, contact.clone()),
        None => reply(StatusCode::NOT_FOUND, json!({})),
    }
}

async fn update_contact(State(fake): State<Shared>, Path(slug): Path<String>, Json(body): Json<Value>) -> Reply {
    let mut fake = fake.lock();
    let Some(contact) = fake.contacts.get_mut(&slug) else {
        return reply(StatusCode::NOT_FOUND, json!({}));
    };
    let mut merged = contact.clone();
    if let (Some(target), Some(fields)) = (merged.as_object_mut(), body.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    if !contact_is_valid(&merged) {
        return reply(StatusCode::BAD_REQUEST, json!({"detail": "invalid"}));
    }
    *contact = merged.clone();
    reply(StatusCode::OK, merged)
}

async fn delete_contact(State(fake): State<Shared>, Path(slug): Path<String>) -> StatusCode {
    match fake.lock().contacts.remove(&slug) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// Number of items a schedule generates, `None` when the schedule is invalid
fn occurrences(body: &Value) -> Option<usize> {
    let coefficient: u32 = body["frequency_coefficient"].as_str()?.parse().ok()?;
    if coefficient == 0 {
        return None;
    }
    let start = NaiveDate::parse_from_str(body["start_date"].as_str()?, "%Y-%m-%d").ok()?;
    let end = match body["end_date"].as_str() {
        Some(end) => Some(NaiveDate::parse_from_str(end, "%Y-%m-%d").ok()?),
        None => None,
    };
    if end.map_or(false, |end| end < start) {
        return None;
    }

    let step = |date: NaiveDate| -> Option<NaiveDate> {
        match body["frequency"].as_str() {
            Some("daily") => date.checked_add_days(Days::new(coefficient as u64)),
            Some("weekly") => date.checked_add_days(Days::new(7 * coefficient as u64)),
            Some("monthly") => date.checked_add_months(Months::new(coefficient)),
            Some("yearly") => date.checked_add_months(Months::new(12 * coefficient)),
            _ => None,
        }
    };

    match (body["frequency"].as_str(), end) {
        (None, _) if body["frequency"].is_null() => Some(1),
        (Some("daily" | "weekly" | "monthly" | "yearly"), Some(end)) => {
            let mut count = 0;
            let mut date = start;
            while date <= end {
                count += 1;
                date = step(date)?;
            }
            Some(count)
        }
        _ => None,
    }
}

fn create_series(fake: &Shared, portal: Portal, headers: &HeaderMap, body: &Value) -> Reply {
    let Some(owner) = user(headers) else {
        return reply(StatusCode::UNAUTHORIZED, json!({}));
    };
    let assignments = body["todo_assignments"].as_array().cloned().unwrap_or_default();
    let audience_ok = match portal {
        Portal::Partner => body["criteria"].is_string(),
        Portal::Backoffice => !assignments.is_empty(),
    };
    let (Some(count), Some(title), true) = (occurrences(body), body["title"].as_str(), audience_ok) else {
        return reply(StatusCode::BAD_REQUEST, json!({"detail": "invalid schedule"}));
    };
    let mut fake = fake.lock();
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        fake.next_id += 1;
        items.push(fake.next_id);
    }
    fake.next_id += 1;
    let slug = format!("series-{}", fake.next_id);
    fake.series.insert(
        slug.clone(),
        Series {
            title: title.to_string(),
            items,
            portal,
            owner,
            criteria: body["criteria"].as_str().map(str::to_string),
            assignments,
        },
    );
    reply(StatusCode::CREATED, json!({"slug": slug, "title": title}))
}

async fn create_partner_series(State(fake): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    create_series(&fake, Portal::Partner, &headers, &body)
}

async fn create_backoffice_series(
    State(fake): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    create_series(&fake, Portal::Backoffice, &headers, &body)
}

async fn update_series(State(fake): State<Shared>, Path(slug): Path<String>, Json(body): Json<Value>) -> Reply {
    let Some(count) = occurrences(&body) else {
        return reply(StatusCode::BAD_REQUEST, json!({"detail": "invalid schedule"}));
    };
    let mut fake = fake.lock();
    let start = fake.next_id;
    fake.next_id += count as u64;
    match fake.series.get_mut(&slug) {
        Some(series) => {
            series.items = (start + 1..=start + count as u64).collect();
            reply(StatusCode::OK, json!({"slug": slug, "title": series.title}))
        }
        None => reply(StatusCode::NOT_FOUND, json!({})),
    }
}

async fn delete_series(State(fake): State<Shared>, Path(slug): Path<String>) -> StatusCode {
    match fake.lock().series.remove(&slug) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

fn item_list<'a>(series: impl Iterator<Item = &'a Series>) -> Reply {
    let results: Vec<Value> = series
        .flat_map(|s| s.items.iter().map(move |id| json!({"id": id, "title": s.title})))
        .collect();
    reply(StatusCode::OK, json!({"count": results.len(), "results": results}))
}

fn managed_items(fake: &Shared, portal: Portal, query: &HashMap<String, String>) -> Reply {
    let text = query.get("text").cloned().unwrap_or_default();
    let fake = fake.lock();
    item_list(fake.series.values().filter(|s| s.portal == portal && s.title == text))
}

async fn partner_managed_items(State(fake): State<Shared>, Query(query): Query<HashMap<String, String>>) -> Reply {
    managed_items(&fake, Portal::Partner, &query)
}

async fn backoffice_managed_items(
    State(fake): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    managed_items(&fake, Portal::Backoffice, &query)
}

/// Items visible to the requesting partner, optionally narrowed by origin
async fn visible_items(
    State(fake): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    let Some(user) = user(&headers) else {
        return reply(StatusCode::UNAUTHORIZED, json!({}));
    };
    let text = query.get("text").cloned().unwrap_or_default();
    let origin = query.get("origin").map(String::as_str);
    let fake = fake.lock();
    item_list(fake.series.values().filter(|s| {
        s.title == text
            && match origin {
                Some("my_tasks") => s.is_own_task(&user),
                Some("my_team_tasks") => s.is_team_task(&user),
                _ => s.is_own_task(&user) || s.is_from_team(&user),
            }
    }))
}

async fn finish(State(fake): State<Shared>, Json(body): Json<Value>) -> Reply {
    match body["todo_item"].as_str() {
        Some(item) => {
            fake.lock().finished.push(item.to_string());
            reply(StatusCode::CREATED, json!({"todo_item": item}))
        }
        None => reply(StatusCode::BAD_REQUEST, json!({})),
    }
}

async fn spawn_fake() -> (String, Shared) {
    spawn_with(Fake::default()).await
}

async fn spawn_with(fake: Fake) -> (String, Shared) {
    let fake = Arc::new(Mutex::new(fake));
    let router = Router::new()
        .route("/auths/token/", post(token))
        .route("/auths/profile/", get(profile))
        .route("/network/contacts/", post(create_contact))
        .route(
            "/network/contacts/:slug/",
            get(get_contact).patch(update_contact).delete(delete_contact),
        )
        .route("/todo/series/partner/", post(create_partner_series))
        .route("/todo/series/partner/:slug/", put(update_series).delete(delete_series))
        .route("/todo/series/backoffice/", post(create_backoffice_series))
        .route("/todo/series/backoffice/:slug/", put(update_series).delete(delete_series))
        .route("/todo/items/manage/partner/", get(partner_managed_items))
        .route("/todo/items/manage/backoffice/", get(backoffice_managed_items))
        .route("/todo/items/partner/", get(visible_items))
        .route("/todo/logs/partner", post(finish))
        .with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}/", addr), fake)
}

fn coordinator(base_url: &str) -> Coordinator {
    let mut environment = EnvironmentConfig {
        base_url: base_url.to_string(),
        ..Default::default()
    };
    for role in ["partner1", "partner2", "backoffice"] {
        environment.credentials.insert(
            role.to_string(),
            Credentials {
                username: role.to_string(),
                password: "secret".to_string(),
            },
        );
    }
    let mut settings = Settings::default();
    settings.environments.insert("Test".to_string(), environment);

    Coordinator::new(
        Arc::new(scenario_suites::registry()),
        Database::open_memory().unwrap(),
        Arc::new(settings),
    )
    .unwrap()
}

async fn run_single(coordinator: &Coordinator, base_url: &str, module: &str, name: &str) -> ScenarioStatus {
    let session = coordinator
        .execute_scenarios(base_url, "Test", Some(module), Some(name))
        .await
        .unwrap();
    let detail = coordinator.database().session_detail(session.id).unwrap().unwrap();
    assert_eq!(detail.scenarios.len(), 1);
    let scenario = &detail.scenarios[0];
    if scenario.run.status != ScenarioStatus::Passed {
        for log in &scenario.logs {
            eprintln!("{} {}: {}", scenario.run.scenario_name, log.level, log.text);
        }
    }
    scenario.run.status
}

#[tokio::test]
async fn test_contacts_scenario_passes() {
    let (base_url, fake) = spawn_fake().await;
    let coordinator = coordinator(&base_url);

    let status = run_single(&coordinator, &base_url, "contacts", "ContactsTestScenario").await;
    assert_eq!(status, ScenarioStatus::Passed);
    assert!(fake.lock().contacts.is_empty());
}

#[tokio::test]
async fn test_partner_series_scenarios_pass() {
    let (base_url, fake) = spawn_fake().await;
    let coordinator = coordinator(&base_url);

    for name in [
        "ToDoListTestScenario",
        "ToDoListDailyTestScenario",
        "ToDoListWeeklyTestScenario",
        "ToDoListMonthlyTestScenario",
        "ToDoListYearlyTestScenario",
        "ToDoListUpdateTestScenario",
        "ToDoListBadDataTestScenario",
    ] {
        let status = run_single(&coordinator, &base_url, "to_do_list", name).await;
        assert_eq!(status, ScenarioStatus::Passed, "{}", name);
    }

    let fake = fake.lock();
    assert!(fake.series.is_empty());
    assert!(!fake.finished.is_empty());
}

#[tokio::test]
async fn test_team_scenarios_pass() {
    let (base_url, fake) = spawn_fake().await;
    let coordinator = coordinator(&base_url);

    for name in ["ToDoListMyTeamTestScenario", "ToDoListMeAndMyTeamTestScenario"] {
        let status = run_single(&coordinator, &base_url, "to_do_list", name).await;
        assert_eq!(status, ScenarioStatus::Passed, "{}", name);
    }
    assert!(fake.lock().series.is_empty());
}

#[tokio::test]
async fn test_backoffice_scenarios_pass() {
    let (base_url, fake) = spawn_fake().await;
    let coordinator = coordinator(&base_url);

    for name in [
        "ToDoListBackOfficeCareerLevelTestScenario",
        "ToDoListBackOfficePartnerTypeTestScenario",
        "ToDoListBackOfficePartnerAndCareerLevelTestScenario",
        "ToDoListBackOfficeMultipleCareerLevelTestScenario",
        "ToDoListBackOfficeMultiplePartnerTestScenario",
        "ToDoListBackOfficeMultiplePartnerAndCareerLevelTestScenario",
        "ToDoListBackOfficeNotInTheListTestScenario",
        "ToDoListBackOfficeBadDataTestScenario",
    ] {
        let status = run_single(&coordinator, &base_url, "to_do_list", name).await;
        assert_eq!(status, ScenarioStatus::Passed, "{}", name);
    }
    assert!(fake.lock().series.is_empty());
}

#[tokio::test]
async fn test_wrong_expectation_is_recorded_as_failed() {
    let (base_url, _fake) = spawn_with(Fake {
        lenient_contacts: true,
        ..Fake::default()
    })
    .await;
    let coordinator = coordinator(&base_url);

    let session = coordinator
        .execute_scenarios(&base_url, "Test", Some("contacts"), Some("ContactsTestScenario"))
        .await
        .unwrap();
    let detail = coordinator.database().session_detail(session.id).unwrap().unwrap();
    let scenario = &detail.scenarios[0];
    assert_eq!(scenario.run.status, ScenarioStatus::Failed);

    let last = scenario.logs.last().unwrap();
    assert!(last.text.starts_with("(Step 4: Bad Data tests) Failed: "), "{}", last.text);
}

#[tokio::test]
async fn test_unreachable_application_is_an_error() {
    let coordinator = coordinator("http://127.0.0.1:9");
    let status = run_single(&coordinator, "http://127.0.0.1:9", "contacts", "ContactsTestScenario").await;
    assert_eq!(status, ScenarioStatus::Error);
}
