//! Bridge client: one cached connection, validated on connect and probed
//! before reuse.
//!
//! The client is a small state machine. It starts disconnected; the first
//! [`BridgeClient::call`] dials the endpoint, validates the socket with a
//! read-only probe command and caches it. Later calls reuse the cached socket
//! after a liveness check. Any transport or framing failure discards the
//! socket so the next call dials again. There is no background reconnection.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use cadence_config::{Config, Endpoint};
use cadence_protocol::{FrameDecoder, Params, Request, Response, encode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::ClientError;
use crate::transport::{connect, is_alive};

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");
const READ_CHUNK_BYTES: usize = 8 * 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection and deadline settings for a [`BridgeClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Dial attempts per fresh connection.
    pub connect_attempts: u32,
    /// Pause between failed attempts.
    pub retry_delay: Duration,
    /// Deadline for the TCP handshake.
    pub connect_timeout: Duration,
    /// Receive deadline for read-only commands and the probe.
    pub receive_timeout: Duration,
    /// Receive deadline for commands that mutate host state.
    pub mutating_timeout: Duration,
    /// Read-only command used to validate fresh connections.
    pub probe_command: String,
    /// Largest response the client will buffer.
    pub max_message_bytes: usize,
}

impl ClientSettings {
    /// Reads the settings from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            connect_attempts: config.connect_attempts(),
            retry_delay: config.retry_delay(),
            connect_timeout: CONNECT_TIMEOUT,
            receive_timeout: config.receive_timeout(),
            mutating_timeout: config.mutating_timeout(),
            probe_command: config.probe_command().to_owned(),
            max_message_bytes: config.max_message_bytes(),
        }
    }

    /// Receive deadline for a command.
    #[must_use]
    pub fn timeout_for(&self, mutating: bool) -> Duration {
        if mutating {
            self.mutating_timeout
        } else {
            self.receive_timeout
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Issues commands to the bridge over a lazily established connection.
///
/// Instances are independent; each owns at most one socket and expects one
/// call in flight at a time.
#[derive(Debug)]
pub struct BridgeClient {
    endpoint: Endpoint,
    settings: ClientSettings,
    connection: Option<TcpStream>,
}

impl BridgeClient {
    /// Creates a disconnected client.
    #[must_use]
    pub fn new(endpoint: Endpoint, settings: ClientSettings) -> Self {
        Self {
            endpoint,
            settings,
            connection: None,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    #[must_use]
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Returns `true` while a connection is cached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Sends `command` and waits up to `timeout` for its result.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Command`] when the bridge reports a failure for
    /// this command; the connection stays cached. Any other error means the
    /// connection was discarded.
    pub fn call(
        &mut self,
        command: &str,
        params: Params,
        timeout: Duration,
    ) -> Result<Value, ClientError> {
        let request = Request::new(command, params);
        let max_message_bytes = self.settings.max_message_bytes;
        let outcome = self
            .connection()
            .and_then(|stream| exchange(stream, &request, timeout, max_message_bytes));
        if let Err(error) = &outcome {
            if error.invalidates_connection() && self.connection.take().is_some() {
                debug!(target: CLIENT_TARGET, command, %error, "discarding connection");
            }
        }
        outcome
    }

    /// Returns the cached connection, dialling a fresh one when there is none
    /// or the cached one fails its liveness check.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] when every attempt fails.
    pub fn connection(&mut self) -> Result<&mut TcpStream, ClientError> {
        let cached = match self.connection.take() {
            Some(stream) if is_alive(&stream) => Some(stream),
            Some(_) => {
                debug!(target: CLIENT_TARGET, endpoint = %self.endpoint, "cached connection is stale");
                None
            }
            None => None,
        };
        let stream = match cached {
            Some(stream) => stream,
            None => self.connect()?,
        };
        Ok(self.connection.insert(stream))
    }

    /// Closes the cached connection, if any.
    pub fn disconnect(&mut self) {
        if let Some(stream) = self.connection.take() {
            // The peer may already be gone.
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn connect(&self) -> Result<TcpStream, ClientError> {
        let attempts = self.settings.connect_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.open_validated() {
                Ok(stream) => {
                    debug!(target: CLIENT_TARGET, endpoint = %self.endpoint, attempt, "connected");
                    return Ok(stream);
                }
                Err(error) if attempt < attempts => {
                    warn!(
                        target: CLIENT_TARGET,
                        endpoint = %self.endpoint,
                        attempt,
                        attempts,
                        %error,
                        "connection attempt failed; retrying"
                    );
                    thread::sleep(self.settings.retry_delay);
                    attempt += 1;
                }
                Err(error) => {
                    return Err(ClientError::Connect {
                        endpoint: self.endpoint.to_string(),
                        attempts,
                        source: Box::new(error),
                    });
                }
            }
        }
    }

    fn open_validated(&self) -> Result<TcpStream, ClientError> {
        let mut stream = connect(&self.endpoint, self.settings.connect_timeout)?;
        let probe = Request::new(self.settings.probe_command.as_str(), Params::new());
        match exchange(
            &mut stream,
            &probe,
            self.settings.receive_timeout,
            self.settings.max_message_bytes,
        ) {
            Ok(_) => Ok(stream),
            Err(ClientError::Command { message }) => Err(ClientError::Probe {
                command: self.settings.probe_command.clone(),
                message,
            }),
            Err(error) => Err(error),
        }
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Writes `request` in one send and reads back exactly one response.
fn exchange(
    stream: &mut TcpStream,
    request: &Request,
    timeout: Duration,
    max_message_bytes: usize,
) -> Result<Value, ClientError> {
    let bytes = encode(request)?;
    stream
        .write_all(&bytes)
        .and_then(|()| stream.flush())
        .map_err(ClientError::transport)?;

    let deadline = Instant::now() + timeout;
    let mut decoder = FrameDecoder::new(max_message_bytes);
    let mut chunk = [0_u8; READ_CHUNK_BYTES];
    loop {
        if let Some(document) = decoder.next_frame()? {
            return Response::from_value(document)?
                .into_result()
                .map_err(ClientError::command);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ClientError::Timeout { timeout });
        }
        stream
            .set_read_timeout(Some(remaining))
            .map_err(ClientError::transport)?;
        match stream.read(&mut chunk) {
            Ok(0) => return Err(ClientError::Closed),
            Ok(read) => decoder.push(chunk.get(..read).unwrap_or_default())?,
            Err(error)
                if matches!(
                    error.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) => {}
            Err(error) => return Err(ClientError::transport(error)),
        }
    }
}
