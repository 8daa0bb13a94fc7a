//! Parameter extraction for the built-in commands.
//!
//! Missing optional parameters fall back to the supplied default; a present
//! parameter of the wrong type is an error.

use cadence_protocol::Params;
use serde_json::Value;

use crate::routes::CommandError;

use super::session::Note;

fn present<'a>(params: &'a Params, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|value| !value.is_null())
}

pub(super) fn integer(params: &Params, key: &str, default: Option<i64>) -> Result<i64, CommandError> {
    match present(params, key) {
        None => default.ok_or_else(|| CommandError::missing(key)),
        Some(value) => value
            .as_i64()
            .ok_or_else(|| CommandError::invalid_params(format!("'{key}' must be an integer"))),
    }
}

pub(super) fn float(params: &Params, key: &str, default: Option<f64>) -> Result<f64, CommandError> {
    match present(params, key) {
        None => default.ok_or_else(|| CommandError::missing(key)),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| CommandError::invalid_params(format!("'{key}' must be a number"))),
    }
}

pub(super) fn text(params: &Params, key: &str) -> Result<String, CommandError> {
    match present(params, key) {
        None => Err(CommandError::missing(key)),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(CommandError::invalid_params(format!("'{key}' must be a string"))),
    }
}

pub(super) fn notes(params: &Params, key: &str) -> Result<Vec<Note>, CommandError> {
    match present(params, key) {
        None => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|error| CommandError::invalid_params(format!("'{key}' is invalid: {error}"))),
    }
}
