//! Shared type definitions.

use serde_json::Value;

use crate::error::CoreError;

/// A document body: an arbitrary JSON object.
pub type Body = Value;

/// Check that a body is a JSON object.
pub fn ensure_object(body: &Body) -> Result<(), CoreError> {
    match body {
        Value::Object(_) => Ok(()),
        Value::Null => Err(CoreError::NotAnObject("null")),
        Value::Bool(_) => Err(CoreError::NotAnObject("boolean")),
        Value::Number(_) => Err(CoreError::NotAnObject("number")),
        Value::String(_) => Err(CoreError::NotAnObject("string")),
        Value::Array(_) => Err(CoreError::NotAnObject("array")),
    }
}
