//! Schema Validator — parses sanitized text and checks the plan's top-level structure.
//!
//! Checks short-circuit in a fixed order, so the first violated invariant is the one
//! reported: root is an object → routine name present → training days present and a
//! list → training days non-empty → nutrition present. Two structural checks follow
//! that the normalizer and typed assembly depend on: nutrition is an object, and every
//! training day is an object with at least one exercise object.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::plan::models::{
    FIELD_EXERCISES, FIELD_NUTRITION, FIELD_ROUTINE_NAME, FIELD_TRAINING_DAYS,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),

    #[error("invalid shape: {0}")]
    InvalidShape(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("response is not valid JSON (line {line}, column {column}): {message}")]
    Malformed {
        line: usize,
        column: usize,
        message: String,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        ValidationError::Malformed {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        }
    }
}

/// Parses `sanitized` and validates its structure, returning the parsed tree.
pub fn parse_and_validate(sanitized: &str) -> Result<Value, ValidationError> {
    let value: Value = serde_json::from_str(sanitized)?;
    validate_structure(&value)?;
    Ok(value)
}

pub fn validate_structure(value: &Value) -> Result<(), SchemaError> {
    let root = value
        .as_object()
        .ok_or_else(|| SchemaError::InvalidShape("response root is not a JSON object".to_string()))?;

    let has_name = root
        .get(FIELD_ROUTINE_NAME)
        .and_then(Value::as_str)
        .is_some_and(|name| !name.trim().is_empty());
    if !has_name {
        return Err(SchemaError::MissingField(FIELD_ROUTINE_NAME));
    }

    let days = match root.get(FIELD_TRAINING_DAYS) {
        None | Some(Value::Null) => return Err(SchemaError::MissingField(FIELD_TRAINING_DAYS)),
        Some(Value::Array(days)) => days,
        Some(_) => {
            return Err(SchemaError::InvalidShape(format!(
                "'{FIELD_TRAINING_DAYS}' must be a list"
            )))
        }
    };
    if days.is_empty() {
        return Err(SchemaError::InvalidShape(format!(
            "'{FIELD_TRAINING_DAYS}' must not be empty"
        )));
    }

    match root.get(FIELD_NUTRITION) {
        None | Some(Value::Null) => return Err(SchemaError::MissingField(FIELD_NUTRITION)),
        Some(Value::Object(_)) => {}
        Some(_) => {
            return Err(SchemaError::InvalidShape(format!(
                "'{FIELD_NUTRITION}' must be an object"
            )))
        }
    }

    for (index, day) in days.iter().enumerate() {
        validate_day(index, day.as_object())?;
    }

    Ok(())
}

fn validate_day(index: usize, day: Option<&Map<String, Value>>) -> Result<(), SchemaError> {
    let day = day.ok_or_else(|| {
        SchemaError::InvalidShape(format!("training day {} is not an object", index + 1))
    })?;
    match day.get(FIELD_EXERCISES) {
        Some(Value::Array(exercises)) if exercises.iter().any(Value::is_object) => Ok(()),
        _ => Err(SchemaError::InvalidShape(format!(
            "training day {} has no exercises",
            index + 1
        ))),
    }
}
