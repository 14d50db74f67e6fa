use async_trait::async_trait;
use scenario_engine::assertions::{self, AssertionExt};
use scenario_engine::{current_time, Scenario, ScenarioContext, ScenarioError, ScenarioResult};
use serde_json::{json, Value};

use super::endpoints;

/// Create, update, validate and delete one contact
#[derive(Debug, Default)]
pub struct ContactsTestScenario;

#[async_trait]
impl Scenario for ContactsTestScenario {
    async fn run(&mut self, cx: &mut ScenarioContext) -> ScenarioResult<()> {
        cx.set_step("Step 1: Login");
        let response = cx.login("partner1", &endpoints::LOGIN).await?;
        assertions::equal(response.status, 200)?;

        cx.set_step("Step 2: Create Contact");
        let contact_data = new_contact();
        let response = cx.send(&endpoints::CREATE_CONTACT, &contact_data).await?;
        assertions::equal(response.status, 201)?;
        let contact = response.into_json();
        assertions::contains("id", &contact)?;
        assertions::contains("slug", &contact)?;
        let slug = contact["slug"]
            .as_str()
            .ok_or_else(|| ScenarioError::other("contact slug is not a string"))?
            .to_string();

        cx.set_step("Step 3: Update Contact");
        let mut updated = contact_data;
        merge_existing(
            &mut updated,
            &json!({
                "message_type": "F",
                "country": "DE",
                "city": "City",
                "potential": 5,
            }),
        );
        let update = cx.format_endpoint(&endpoints::UPDATE_CONTACT, &[("contact_slug", &slug)])?;
        let response = cx.send(&update, &updated).await?;
        assertions::equal(response.status, 200)?;

        let fetch = cx.format_endpoint(&endpoints::GET_CONTACT, &[("contact_slug", &slug)])?;
        let response = cx.call(&fetch, None, None).await?;
        assertions::equal(response.status, 200)?;
        assertions::equal(&response.json()["city"], &json!("City"))?;

        cx.set_step("Step 4: Bad Data tests");
        for bad in bad_data_cases() {
            let mut candidate = updated.clone();
            merge_existing(&mut candidate, &bad);
            let response = cx.send(&update, &candidate).await?;
            let fields: Vec<&String> = bad.as_object().map(|m| m.keys().collect()).unwrap_or_default();
            assertions::equal(response.status, 400).or_message(format!(
                "Mismatch in {:?}. Expected 400, but got {}",
                fields, response.status
            ))?;
            updated = candidate;
        }

        cx.set_step("Step 5: Delete Contact");
        let delete = cx.format_endpoint(&endpoints::DELETE_CONTACT, &[("contact_slug", &slug)])?;
        let response = cx.call(&delete, None, None).await?;
        assertions::equal(response.status, 204)?;

        Ok(())
    }
}

fn new_contact() -> Value {
    json!({
        "message_type": "I",
        "is_prospect_customer": true,
        "is_prospect_partner": true,
        "is_customer": false,
        "is_business_partner": true,
        "potential": null,
        "country": "AE",
        "first_name": "[Contact]",
        "last_name": current_time(),
        "phones": [
            {"type": "40_OTHER", "number": "+684685", "error": false},
            {"type": "40_OTHER", "number": "+6151651668", "error": false},
            {"type": "40_OTHER", "number": "+4688165168", "error": false}
        ],
        "emails": [
            {"type": "Other", "email": "1th@email.com", "error": false},
            {"type": "Work", "email": "2th@email.com"},
            {"type": "Private", "email": "3th@email.com", "error": false}
        ],
        "street": "Street",
        "zip_code": "11111",
        "city": "awdawd",
        "source": "Rc",
        "interests": [
            {"title": "Interest 1"},
            {"title": "Interest 2"},
            {"title": "Interest 3"},
            {"title": "Interest 4"}
        ],
        "note": "Some Note"
    })
}

/// Invalid field values, applied cumulatively
fn bad_data_cases() -> Vec<Value> {
    vec![
        json!({"country": "InvalidCountry"}),
        json!({"emails": [{"type": "Work", "email": "invalid-email"}]}),
        json!({"is_business_partner": "not-a-boolean"}),
        json!({"is_customer": "invalid-boolean"}),
        json!({"is_prospect_customer": null}),
        json!({"is_prospect_partner": 123}),
        json!({"message_type": "InvalidType"}),
        json!({"phones": [{"type": "40_OTHER", "number": "invalid-phone"}]}),
        json!({"zip_code": "invalid-zip"}),
    ]
}

/// Overwrite keys of `base` that also appear in `updates`; new keys are ignored
fn merge_existing(base: &mut Value, updates: &Value) {
    let (Some(base), Some(updates)) = (base.as_object_mut(), updates.as_object()) else {
        return;
    };
    for (key, value) in updates {
        if let Some(slot) = base.get_mut(key) {
            *slot = value.clone();
        }
    }
}
