//! Error types for the bridge client and the CLI runtime.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use cadence_protocol::{CodecError, ProtocolError};
use thiserror::Error;

/// Failures surfaced by [`crate::BridgeClient::call`].
///
/// Every variant except [`ClientError::Command`] means the cached connection
/// was discarded.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The endpoint host could not be resolved.
    #[error("failed to resolve bridge address {endpoint}: {source}")]
    Resolve {
        /// Endpoint being dialled.
        endpoint: String,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// Every connection attempt failed.
    #[error("failed to connect to bridge at {endpoint} after {attempts} attempts: {source}")]
    Connect {
        /// Endpoint being dialled.
        endpoint: String,
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        #[source]
        source: Box<ClientError>,
    },
    /// The connectivity check on a fresh connection was rejected.
    #[error("connectivity check '{command}' failed: {message}")]
    Probe {
        /// Probe command name.
        command: String,
        /// Error message returned by the bridge.
        message: String,
    },
    /// A socket operation failed.
    #[error("bridge connection failed: {source}")]
    Transport {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The bridge closed the connection before a response arrived.
    #[error("bridge closed the connection before responding")]
    Closed,
    /// No complete response arrived before the deadline.
    #[error("timed out after {} ms waiting for a response", timeout.as_millis())]
    Timeout {
        /// Deadline that elapsed.
        timeout: Duration,
    },
    /// The response bytes could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The response document had the wrong shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The bridge answered with `status = error`.
    #[error("{message}")]
    Command {
        /// Message reported by the bridge.
        message: String,
    },
}

impl ClientError {
    /// Builds an error reported by the bridge for one command.
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }

    pub(crate) fn transport(source: io::Error) -> Self {
        Self::Transport { source }
    }

    /// Returns `true` when the connection can no longer be trusted.
    #[must_use]
    pub fn invalidates_connection(&self) -> bool {
        !matches!(self, Self::Command { .. })
    }
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("parameters must be a JSON object: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to render result: {0}")]
    Render(serde_json::Error),
    #[error("failed to write result: {0}")]
    WriteOutput(io::Error),
}
