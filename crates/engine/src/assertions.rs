//! Expectation helpers for scenario bodies.
//!
//! Each check returns `ScenarioResult<()>` so a scenario can `?` it; a
//! violated expectation becomes `ScenarioError::Assertion`, which the
//! lifecycle records as `failed`. Messages carry the caller location.
//!
//! ```
//! use scenario_engine::assertions::{self, AssertionExt};
//!
//! fn check(status: u16) -> scenario_engine::ScenarioResult<()> {
//!     assertions::equal(status, 201).or_message("series was not created")?;
//!     Ok(())
//! }
//! assert!(check(201).is_ok());
//! assert!(check(400).unwrap_err().is_assertion());
//! ```

use serde_json::Value;
use std::fmt::Debug;
use std::panic::Location;

use crate::error::{ScenarioError, ScenarioResult};

#[track_caller]
fn fail(detail: String) -> ScenarioError {
    let caller = Location::caller();
    ScenarioError::Assertion(format!("{}:{} - {}", caller.file(), caller.line(), detail))
}

/// Replace the generated message of a failed check
pub trait AssertionExt {
    fn or_message(self, message: impl Into<String>) -> Self;
}

impl AssertionExt for ScenarioResult<()> {
    fn or_message(self, message: impl Into<String>) -> Self {
        match self {
            Err(ScenarioError::Assertion(_)) => Err(ScenarioError::Assertion(message.into())),
            other => other,
        }
    }
}

#[track_caller]
pub fn equal<A, E>(actual: A, expected: E) -> ScenarioResult<()>
where
    A: PartialEq<E> + Debug,
    E: Debug,
{
    if actual == expected {
        Ok(())
    } else {
        Err(fail(format!("Expected {:?}, but got {:?}.", expected, actual)))
    }
}

#[track_caller]
pub fn not_equal<A, E>(actual: A, unexpected: E) -> ScenarioResult<()>
where
    A: PartialEq<E> + Debug,
    E: Debug,
{
    if actual != unexpected {
        Ok(())
    } else {
        Err(fail(format!("Did not expect {:?}, but got it.", unexpected)))
    }
}

#[track_caller]
pub fn greater_than<T>(value: T, bound: T) -> ScenarioResult<()>
where
    T: PartialOrd + Debug,
{
    if value > bound {
        Ok(())
    } else {
        Err(fail(format!("Expected {:?} to be greater than {:?}.", value, bound)))
    }
}

#[track_caller]
pub fn less_than<T>(value: T, bound: T) -> ScenarioResult<()>
where
    T: PartialOrd + Debug,
{
    if value < bound {
        Ok(())
    } else {
        Err(fail(format!("Expected {:?} to be less than {:?}.", value, bound)))
    }
}

/// Containers that answer membership questions
pub trait Membership<Item: ?Sized> {
    fn has(&self, item: &Item) -> bool;
}

/// Object keys, array elements, or substrings
impl Membership<str> for Value {
    fn has(&self, item: &str) -> bool {
        match self {
            Value::Object(map) => map.contains_key(item),
            Value::Array(items) => items.iter().any(|v| v.as_str() == Some(item)),
            Value::String(s) => s.contains(item),
            _ => false,
        }
    }
}

impl Membership<Value> for Value {
    fn has(&self, item: &Value) -> bool {
        match (self, item) {
            (Value::Array(items), _) => items.contains(item),
            (_, Value::String(s)) => Membership::<str>::has(self, s.as_str()),
            _ => false,
        }
    }
}

impl Membership<str> for str {
    fn has(&self, item: &str) -> bool {
        self.contains(item)
    }
}

impl Membership<str> for String {
    fn has(&self, item: &str) -> bool {
        self.contains(item)
    }
}

impl<T: PartialEq> Membership<T> for [T] {
    fn has(&self, item: &T) -> bool {
        self.contains(item)
    }
}

impl<T: PartialEq> Membership<T> for Vec<T> {
    fn has(&self, item: &T) -> bool {
        self.contains(item)
    }
}

#[track_caller]
pub fn contains<I, C>(item: &I, collection: &C) -> ScenarioResult<()>
where
    I: Debug + ?Sized,
    C: Membership<I> + Debug + ?Sized,
{
    if collection.has(item) {
        Ok(())
    } else {
        Err(fail(format!("Expected {:?} to be in {:?}.", item, collection)))
    }
}

#[track_caller]
pub fn not_contains<I, C>(item: &I, collection: &C) -> ScenarioResult<()>
where
    I: Debug + ?Sized,
    C: Membership<I> + Debug + ?Sized,
{
    if collection.has(item) {
        Err(fail(format!("Did not expect {:?} to be in {:?}.", item, collection)))
    } else {
        Ok(())
    }
}

/// Values that can be absent
pub trait Nullable {
    fn is_null_value(&self) -> bool;
}

impl Nullable for Value {
    fn is_null_value(&self) -> bool {
        self.is_null()
    }
}

impl<T> Nullable for Option<T> {
    fn is_null_value(&self) -> bool {
        self.is_none()
    }
}

#[track_caller]
pub fn not_null<T: Nullable + ?Sized>(value: &T) -> ScenarioResult<()> {
    if value.is_null_value() {
        Err(fail("Expected value to not be null, but got None.".to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_reports_location_and_values() {
        assert!(equal(201u16, 201u16).is_ok());

        let err = equal(400u16, 201u16).unwrap_err();
        let message = err.to_string();
        assert!(err.is_assertion());
        assert!(message.contains("assertions.rs"));
        assert!(message.contains("Expected 201, but got 400."));
    }

    #[test]
    fn test_or_message_replaces_only_assertions() {
        let err = equal(1, 2).or_message("custom").unwrap_err();
        assert_eq!(err.to_string(), "custom");
        assert!(equal(1, 1).or_message("custom").is_ok());
    }

    #[test]
    fn test_json_membership() {
        let body = json!({"id": 7, "slug": "s", "tags": ["a", "b"]});
        assert!(contains("slug", &body).is_ok());
        assert!(contains("missing", &body).is_err());
        assert!(contains("a", &body["tags"]).is_ok());
        assert!(not_contains("c", &body["tags"]).is_ok());
        assert!(contains(&json!("id"), &body).is_ok());
        assert!(contains(&json!(7), &json!([1, 7])).is_ok());
    }

    #[test]
    fn test_slice_and_string_membership() {
        let statuses = vec![200u16, 201];
        assert!(contains(&201u16, &statuses).is_ok());
        assert!(not_contains(&204u16, statuses.as_slice()).is_ok());
        assert!(contains("List", "[To Do List] 2025").is_ok());
    }

    #[test]
    fn test_ordering_and_null() {
        assert!(greater_than(3, 2).is_ok());
        assert!(greater_than(2, 2).is_err());
        assert!(less_than(1, 2).is_ok());
        assert!(not_null(&json!({"a": 1})).is_ok());
        assert!(not_null(&Value::Null).is_err());
        assert!(not_null(&Some(1)).is_ok());
        assert!(not_null(&None::<u8>).is_err());
        assert!(not_equal(1, 2).is_ok());
        assert!(not_equal(1, 1).is_err());
    }
}
