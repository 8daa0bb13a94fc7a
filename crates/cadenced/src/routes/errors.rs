//! Errors raised while building or reloading route tables.

use std::io;

use thiserror::Error;

/// Errors surfaced while loading route definitions.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Two handlers were registered under one name.
    #[error("handler '{name}' is already registered")]
    DuplicateHandler { name: String },
    /// A manifest names the same command twice.
    #[error("command '{name}' is routed more than once")]
    DuplicateCommand { name: String },
    /// A manifest refers to a handler that was never registered.
    #[error("command '{command}' refers to unknown handler '{handler}'")]
    UnknownHandler { command: String, handler: String },
    /// The manifest could not be parsed.
    #[error("invalid route manifest: {source}")]
    Manifest {
        #[source]
        source: serde_json::Error,
    },
    /// The manifest file could not be read.
    #[error("failed to read route manifest {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
}
