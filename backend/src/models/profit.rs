//! Request shapes for profit writes and the rules that validate them.
//!
//! Request bodies are decoded into loosely-typed drafts first so that a
//! missing or mistyped field becomes a [`ValidationIssue`] naming the field
//! instead of an opaque decoding failure.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::parse_timestamp;

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every issue found while validating one request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{}", join_issues(.issues))]
pub struct ValidationErrors {
    pub issues: Vec<ValidationIssue>,
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.field, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![ValidationIssue::new(field, message)],
        }
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether any issue concerns `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

/// A validated profit that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProfit {
    pub amount: f64,
    pub name: String,
    pub year: DateTime<Utc>,
}

/// Validated partial update. `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfitChanges {
    pub amount: Option<f64>,
    pub name: Option<String>,
    pub year: Option<DateTime<Utc>>,
}

impl ProfitChanges {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.name.is_none() && self.year.is_none()
    }
}

/// Create or update request body before validation.
///
/// Unknown keys, `_id` included, are ignored. A `null` value counts as not
/// supplied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfitBody {
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub year: Option<Value>,
}

impl ProfitBody {
    /// Check a create body. Every field is required; all issues are collected.
    pub fn validate_new(&self) -> Result<NewProfit, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let amount = required(&self.amount, "amount", &mut errors, parse_amount);
        let name = required(&self.name, "name", &mut errors, parse_name);
        let year = required(&self.year, "year", &mut errors, parse_year);

        match (amount, name, year) {
            (Some(amount), Some(name), Some(year)) if errors.is_empty() => {
                Ok(NewProfit { amount, name, year })
            }
            _ => Err(errors),
        }
    }

    /// Check an update body. Only supplied fields are validated.
    pub fn validate_changes(&self) -> Result<ProfitChanges, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let amount = optional(&self.amount, "amount", &mut errors, parse_amount);
        let name = optional(&self.name, "name", &mut errors, parse_name);
        let year = optional(&self.year, "year", &mut errors, parse_year);

        if errors.is_empty() {
            Ok(ProfitChanges { amount, name, year })
        } else {
            Err(errors)
        }
    }
}

fn required<T>(
    value: &Option<Value>,
    field: &str,
    errors: &mut ValidationErrors,
    parse: fn(&Value) -> Result<T, String>,
) -> Option<T> {
    match value {
        None | Some(Value::Null) => {
            errors.push(field, "is required");
            None
        }
        Some(value) => check(value, field, errors, parse),
    }
}

fn optional<T>(
    value: &Option<Value>,
    field: &str,
    errors: &mut ValidationErrors,
    parse: fn(&Value) -> Result<T, String>,
) -> Option<T> {
    match value {
        None | Some(Value::Null) => None,
        Some(value) => check(value, field, errors, parse),
    }
}

fn check<T>(
    value: &Value,
    field: &str,
    errors: &mut ValidationErrors,
    parse: fn(&Value) -> Result<T, String>,
) -> Option<T> {
    match parse(value) {
        Ok(parsed) => Some(parsed),
        Err(message) => {
            errors.push(field, message);
            None
        }
    }
}

fn parse_amount(value: &Value) -> Result<f64, String> {
    let amount = match value {
        Value::Number(number) => number.as_f64(),
        // Numeric strings are cast, as the document store's schema layer does.
        Value::String(text) if !text.trim().is_empty() => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match amount {
        Some(amount) if amount.is_finite() => Ok(amount),
        _ => Err(format!("must be a finite number, got {}", value)),
    }
}

fn parse_name(value: &Value) -> Result<String, String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Ok(text.clone()),
        Value::String(_) => Err("must not be empty".to_string()),
        other => Err(format!("must be a string, got {}", other)),
    }
}

/// Years a Postgres `timestamptz` can hold.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = -4712..=294_276;

fn parse_year(value: &Value) -> Result<DateTime<Utc>, String> {
    let parsed = match value {
        Value::String(text) => parse_timestamp(text),
        Value::Number(number) => number.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    };
    match parsed {
        Some(year) if YEAR_RANGE.contains(&year.year()) => Ok(year),
        Some(year) => Err(format!(
            "must fall between years {} and {}, got {}",
            YEAR_RANGE.start(),
            YEAR_RANGE.end(),
            year.year()
        )),
        None => Err(format!(
            "must be an ISO-8601 date or epoch milliseconds, got {}",
            value
        )),
    }
}
