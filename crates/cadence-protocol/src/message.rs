//! Request and response documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Opaque parameter mapping forwarded to a command handler.
pub type Params = Map<String, Value>;

/// A command issued by the client.
///
/// The field names match the established peer: `type` names the command and
/// `params` carries its arguments. A missing `params` object is treated as
/// empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Name of the command to run.
    #[serde(rename = "type")]
    pub command: String,
    /// Arguments for the command handler.
    #[serde(default)]
    pub params: Params,
}

impl Request {
    /// Builds a request for `command` with the given parameters.
    pub fn new(command: impl Into<String>, params: Params) -> Self {
        Self {
            command: command.into(),
            params,
        }
    }

    /// Converts a decoded document into a request.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidRequest`] when the document does not
    /// have the request shape, or [`ProtocolError::EmptyCommand`] when the
    /// command name is blank.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let request: Self =
            serde_json::from_value(value).map_err(|source| ProtocolError::InvalidRequest {
                message: source.to_string(),
                source,
            })?;
        if request.command.trim().is_empty() {
            return Err(ProtocolError::EmptyCommand);
        }
        Ok(request)
    }
}

/// Outcome of a single request, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    /// The command ran and produced a result.
    Success {
        /// Handler output; `null` when the handler returns nothing.
        #[serde(default)]
        result: Value,
    },
    /// The command could not be routed or failed while running.
    Error {
        /// Human-readable description of the failure.
        message: String,
    },
}

impl Response {
    /// Wraps a handler result.
    #[must_use]
    pub fn success(result: Value) -> Self {
        Self::Success { result }
    }

    /// Builds an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Returns `true` for the success variant.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Converts a decoded document into a response.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidResponse`] when the document is not a
    /// tagged response.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        serde_json::from_value(value).map_err(|source| ProtocolError::InvalidResponse {
            message: source.to_string(),
            source,
        })
    }

    /// Splits the response into the handler result or the error message.
    ///
    /// # Errors
    ///
    /// Returns the carried message for the error variant.
    pub fn into_result(self) -> Result<Value, String> {
        match self {
            Self::Success { result } => Ok(result),
            Self::Error { message } => Err(message),
        }
    }
}

/// A well-formed document that does not have the expected message shape.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Document could not be read as a request.
    #[error("invalid request: {message}")]
    InvalidRequest {
        message: String,
        #[source]
        source: serde_json::Error,
    },
    /// Request named no command.
    #[error("invalid request: command name is empty")]
    EmptyCommand,
    /// Document could not be read as a response.
    #[error("invalid response: {message}")]
    InvalidResponse {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}
