//! Compiled command handlers and the errors they raise.

use std::sync::Arc;

use cadence_protocol::Params;
use serde_json::Value;
use thiserror::Error;

/// A command implementation. Handlers may be invoked from any thread.
pub type CommandHandler = Arc<dyn Fn(&Params) -> Result<Value, CommandError> + Send + Sync>;

/// Wraps a closure as a [`CommandHandler`].
pub fn handler<F>(function: F) -> CommandHandler
where
    F: Fn(&Params) -> Result<Value, CommandError> + Send + Sync + 'static,
{
    Arc::new(function)
}

/// Failure reported by a command handler.
///
/// The display text is returned to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// A required parameter was absent.
    #[error("missing parameter '{name}'")]
    MissingParam { name: String },
    /// A parameter was present but unusable.
    #[error("{message}")]
    InvalidParams { message: String },
    /// The command could not be carried out.
    #[error("{message}")]
    Failed { message: String },
}

impl CommandError {
    /// Creates a missing parameter error.
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParam { name: name.into() }
    }

    /// Creates an invalid parameters error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Creates a generic failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}
