//! Field rule functions
//!
//! A rule receives the incoming value (absent for removals) and the implied
//! action, and either accepts it or returns a [`RuleViolation`] message.
//! Closures with the same signature are rules too.

use std::sync::Arc;

use chrono::DateTime;
use thiserror::Error;

use crate::item::Value;

use super::Action;

/// Message explaining why a rule rejected a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RuleViolation(pub String);

impl RuleViolation {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Validates one field change
pub trait FieldValidator: Send + Sync {
    fn validate(&self, value: Option<&Value>, action: Action) -> Result<(), RuleViolation>;
}

impl<F> FieldValidator for F
where
    F: Fn(Option<&Value>, Action) -> Result<(), RuleViolation> + Send + Sync,
{
    fn validate(&self, value: Option<&Value>, action: Action) -> Result<(), RuleViolation> {
        self(value, action)
    }
}

// =============================================================================
// Type Rules
// =============================================================================

/// Expected value shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Number,
    Integer,
    Bool,
    List,
    Map,
}

impl ValueType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            ValueType::String => matches!(value, Value::String(_)),
            ValueType::Number => value.is_number(),
            ValueType::Integer => value.as_i64().is_some(),
            ValueType::Bool => matches!(value, Value::Bool(_)),
            ValueType::List => matches!(value, Value::List(_)),
            ValueType::Map => matches!(value, Value::Map(_)),
        }
    }

    fn name(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Integer => "integer",
            ValueType::Bool => "boolean",
            ValueType::List => "list",
            ValueType::Map => "map",
        }
    }
}

/// Checks the value's type; `add` is only legal on numbers and lists
#[derive(Debug, Clone, Copy)]
pub struct TypeRule(pub ValueType);

impl FieldValidator for TypeRule {
    fn validate(&self, value: Option<&Value>, action: Action) -> Result<(), RuleViolation> {
        let Some(value) = value else {
            return Ok(());
        };
        match (action, self.0) {
            // Appending a single element to a list is allowed
            (Action::Add, ValueType::List) => Ok(()),
            (Action::Add, ValueType::Number | ValueType::Integer) if self.0.accepts(value) => {
                Ok(())
            }
            (Action::Add, expected) => Err(RuleViolation(format!(
                "cannot add to a {} field",
                expected.name()
            ))),
            (_, expected) if expected.accepts(value) => Ok(()),
            (_, expected) => Err(RuleViolation(format!(
                "expected {}, got {}",
                expected.name(),
                value.type_name()
            ))),
        }
    }
}

pub fn expect_string() -> TypeRule {
    TypeRule(ValueType::String)
}

pub fn expect_number() -> TypeRule {
    TypeRule(ValueType::Number)
}

pub fn expect_integer() -> TypeRule {
    TypeRule(ValueType::Integer)
}

pub fn expect_bool() -> TypeRule {
    TypeRule(ValueType::Bool)
}

pub fn expect_list() -> TypeRule {
    TypeRule(ValueType::List)
}

pub fn expect_map() -> TypeRule {
    TypeRule(ValueType::Map)
}

// =============================================================================
// Value Rules
// =============================================================================

/// Value must be one of a fixed set
#[derive(Debug, Clone)]
pub struct OneOf(pub Vec<Value>);

impl FieldValidator for OneOf {
    fn validate(&self, value: Option<&Value>, _action: Action) -> Result<(), RuleViolation> {
        match value {
            None => Ok(()),
            Some(v) if self.0.iter().any(|allowed| allowed.loosely_equals(v)) => Ok(()),
            Some(v) => Err(RuleViolation(format!("{} is not an allowed value", v))),
        }
    }
}

pub fn expect_one_of<I, V>(allowed: I) -> OneOf
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    OneOf(allowed.into_iter().map(Into::into).collect())
}

/// String must parse as an RFC 3339 / ISO-8601 timestamp
#[derive(Debug, Clone, Copy)]
pub struct IsoDate;

impl FieldValidator for IsoDate {
    fn validate(&self, value: Option<&Value>, _action: Action) -> Result<(), RuleViolation> {
        match value {
            None => Ok(()),
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|_| ())
                .map_err(|e| RuleViolation(format!("'{}' is not an ISO-8601 date: {}", s, e))),
            Some(other) => Err(RuleViolation(format!(
                "expected ISO-8601 date string, got {}",
                other.type_name()
            ))),
        }
    }
}

pub fn expect_iso_date() -> IsoDate {
    IsoDate
}

// =============================================================================
// Combinators
// =============================================================================

/// Only the listed actions are legal, then defer to the inner rule
pub struct ActionsOnly<R> {
    allowed: Vec<Action>,
    inner: R,
}

impl<R: FieldValidator> FieldValidator for ActionsOnly<R> {
    fn validate(&self, value: Option<&Value>, action: Action) -> Result<(), RuleViolation> {
        if !self.allowed.contains(&action) {
            return Err(RuleViolation(format!("action '{}' is not allowed", action)));
        }
        self.inner.validate(value, action)
    }
}

/// Only `set` is legal
pub fn set_only<R: FieldValidator>(inner: R) -> ActionsOnly<R> {
    ActionsOnly {
        allowed: vec![Action::Set],
        inner,
    }
}

/// Restrict to the given actions
pub fn actions_only<R: FieldValidator>(allowed: &[Action], inner: R) -> ActionsOnly<R> {
    ActionsOnly {
        allowed: allowed.to_vec(),
        inner,
    }
}

/// Every rule must pass, checked in order
pub struct AllOf(pub Vec<Arc<dyn FieldValidator>>);

impl FieldValidator for AllOf {
    fn validate(&self, value: Option<&Value>, action: Action) -> Result<(), RuleViolation> {
        self.0.iter().try_for_each(|rule| rule.validate(value, action))
    }
}

pub fn all_of(rules: Vec<Arc<dyn FieldValidator>>) -> AllOf {
    AllOf(rules)
}

/// Removal is explicitly fine; otherwise the inner rule decides
pub struct Nullable<R>(pub R);

impl<R: FieldValidator> FieldValidator for Nullable<R> {
    fn validate(&self, value: Option<&Value>, action: Action) -> Result<(), RuleViolation> {
        if action == Action::Remove {
            return Ok(());
        }
        self.0.validate(value, action)
    }
}

pub fn nullable<R: FieldValidator>(inner: R) -> Nullable<R> {
    Nullable(inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_rule() {
        let rule = expect_string();
        assert!(rule.validate(Some(&Value::from("x")), Action::Set).is_ok());
        let err = rule.validate(Some(&Value::Int(1)), Action::Set).unwrap_err();
        assert_eq!(err.0, "expected string, got number");
        assert!(rule.validate(None, Action::Remove).is_ok());
        assert!(rule.validate(Some(&Value::from("x")), Action::Add).is_err());
    }

    #[test]
    fn test_list_accepts_single_append() {
        let rule = expect_list();
        assert!(rule.validate(Some(&Value::from("tag")), Action::Add).is_ok());
        assert!(rule.validate(Some(&Value::from("tag")), Action::Set).is_err());
    }

    #[test]
    fn test_set_only() {
        let rule = set_only(expect_integer());
        assert!(rule.validate(Some(&Value::Int(3)), Action::Set).is_ok());
        assert!(rule.validate(None, Action::Remove).is_err());
        assert!(rule.validate(Some(&Value::Int(1)), Action::Add).is_err());
    }

    #[test]
    fn test_one_of_and_iso_date() {
        let rule = expect_one_of(["open", "closed"]);
        assert!(rule.validate(Some(&Value::from("open")), Action::Set).is_ok());
        assert!(rule.validate(Some(&Value::from("ajar")), Action::Set).is_err());

        let date = expect_iso_date();
        assert!(date
            .validate(Some(&Value::from("2024-05-01T12:00:00.000Z")), Action::Set)
            .is_ok());
        assert!(date.validate(Some(&Value::from("May 1st")), Action::Set).is_err());
    }

    #[test]
    fn test_number_rules_allow_increment() {
        let rule = expect_number();
        assert!(rule.validate(Some(&Value::Float(1.5)), Action::Add).is_ok());
        assert!(rule.validate(Some(&Value::from("1")), Action::Add).is_err());
        assert!(expect_bool().validate(Some(&Value::Bool(true)), Action::Set).is_ok());
        assert!(expect_map().validate(Some(&Value::Bool(true)), Action::Set).is_err());
    }

    #[test]
    fn test_nullable_and_actions_only() {
        let rule = nullable(actions_only(&[Action::Set, Action::Add], expect_integer()));
        assert!(rule.validate(None, Action::Remove).is_ok());
        assert!(rule.validate(Some(&Value::Int(2)), Action::Add).is_ok());
        assert!(rule.validate(Some(&Value::from("2")), Action::Set).is_err());

        let strict = actions_only(&[Action::Set], expect_integer());
        assert!(strict.validate(None, Action::Remove).is_err());
    }

    #[test]
    fn test_all_of_stops_at_first_failure() {
        let rules: Vec<Arc<dyn FieldValidator>> =
            vec![Arc::new(expect_string()), Arc::new(expect_one_of(["a"]))];
        let rule = all_of(rules);
        let err = rule.validate(Some(&Value::Int(1)), Action::Set).unwrap_err();
        assert!(err.0.starts_with("expected string"));
    }
}
