//! Error types for request dispatch failures.
//!
//! Every variant except the transport ones is attributable to a single
//! request and is returned to its caller as an error response.

use std::io;
use std::time::Duration;

use cadence_protocol::{CodecError, ProtocolError};
use thiserror::Error;

use crate::host::ScheduleError;
use crate::routes::CommandError;

/// Errors surfaced while serving a connection.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No route exists for the command.
    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    /// The document did not have the request shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The handler reported a failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The handler panicked.
    #[error("command '{command}' failed: {message}")]
    HandlerPanicked { command: String, message: String },

    /// The host thread did not finish the task in time.
    #[error("timeout waiting for operation to complete")]
    Timeout { command: String, timeout: Duration },

    /// The host thread refused the task.
    #[error("host is unavailable: {source}")]
    HostUnavailable {
        #[source]
        source: ScheduleError,
    },

    /// The host thread dropped the task without running it.
    #[error("host discarded command '{command}' before it ran")]
    TaskDropped { command: String },

    /// Buffered bytes could not be framed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The peer stopped sending partway through a request.
    #[error("incomplete request: no data for {} ms with {buffered} bytes buffered", waited.as_millis())]
    IncompleteRequest { buffered: usize, waited: Duration },

    /// IO error during read or write.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DispatchError {
    /// Creates an unknown command error.
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Creates a handler panic error.
    pub fn handler_panicked(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HandlerPanicked {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates an incomplete request error.
    pub fn incomplete_request(buffered: usize, waited: Duration) -> Self {
        Self::IncompleteRequest { buffered, waited }
    }

    /// Returns `true` for errors that leave the connection's byte stream
    /// unusable; the peer gets one error response before the close.
    pub fn is_framing(&self) -> bool {
        matches!(self, Self::Codec(_) | Self::IncompleteRequest { .. })
    }

    /// Creates a timeout error.
    pub fn timeout(command: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            command: command.into(),
            timeout,
        }
    }
}
