//! Caller-supplied passthrough fields for dry-run reports.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::InvocationError;

/// A JSON primitive. Reports accept nothing richer than this as an extra
/// field, so every report stays flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

pub type PassthroughFields = BTreeMap<String, FieldValue>;

impl FieldValue {
    /// Interpret a command-line value: `true`/`false`, `null`, integers and
    /// finite floats keep their JSON type; anything else is a string.
    pub fn parse_cli(raw: &str) -> Self {
        match raw {
            "true" => return FieldValue::Bool(true),
            "false" => return FieldValue::Bool(false),
            "null" => return FieldValue::Null,
            _ => {}
        }
        if let Ok(n) = raw.parse::<i64>() {
            return FieldValue::Integer(n);
        }
        match raw.parse::<f64>() {
            Ok(f) if f.is_finite() && raw.contains(|c: char| c.is_ascii_digit()) => {
                FieldValue::Float(f)
            }
            _ => FieldValue::String(raw.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Parse a `KEY=VALUE` assignment.
pub fn parse_assignment(raw: &str) -> Result<(String, FieldValue), InvocationError> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        InvocationError::Config(format!("field `{raw}` is not of the form KEY=VALUE"))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(InvocationError::Config(format!(
            "field `{raw}` has an empty key"
        )));
    }
    Ok((key.to_string(), FieldValue::parse_cli(value)))
}
