//! Connection handler that serves request documents.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use cadence_config::DEFAULT_PARTIAL_FRAME_TIMEOUT_MS;
use cadence_protocol::{FrameDecoder, Request, Response, encode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::transport::{Connection, ConnectionHandler};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::router::CommandRouter;

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Serves one request at a time per connection until the peer disconnects.
#[derive(Debug, Clone)]
pub struct DispatchConnectionHandler {
    router: CommandRouter,
    max_message_bytes: usize,
    partial_frame_timeout: Duration,
}

impl DispatchConnectionHandler {
    /// Creates a handler that buffers at most `max_message_bytes` per request.
    #[must_use]
    pub fn new(router: CommandRouter, max_message_bytes: usize) -> Self {
        Self {
            router,
            max_message_bytes,
            partial_frame_timeout: Duration::from_millis(DEFAULT_PARTIAL_FRAME_TIMEOUT_MS),
        }
    }

    /// Sets how long a partially received request may go without new bytes
    /// before the connection is failed.
    #[must_use]
    pub fn with_partial_frame_timeout(mut self, timeout: Duration) -> Self {
        self.partial_frame_timeout = timeout;
        self
    }

    fn serve(&self, mut connection: Connection) {
        let peer = connection.peer();
        let mut decoder = FrameDecoder::new(self.max_message_bytes);
        loop {
            let frame = match read_frame(&mut connection, &mut decoder, self.partial_frame_timeout)
            {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!(target: DISPATCH_TARGET, %peer, "connection closed");
                    return;
                }
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %peer, %error, "closing connection");
                    if error.is_framing() {
                        // Best effort: the peer may already be gone.
                        let _ = write_response(&mut connection, &Response::error(error.to_string()));
                    }
                    return;
                }
            };

            let response = match Request::from_value(frame) {
                Ok(request) => self.router.respond(&request),
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %peer, %error, "invalid request");
                    Response::error(DispatchError::from(error).to_string())
                }
            };

            if let Err(error) = write_response(&mut connection, &response) {
                warn!(target: DISPATCH_TARGET, %peer, %error, "failed to write response");
                return;
            }
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, connection: Connection) {
        self.serve(connection);
    }
}

/// Reads until the decoder yields a document.
///
/// Returns `Ok(None)` when the peer closes the connection, or when shutdown
/// has been requested and no request is partially buffered. A partial request
/// that receives no bytes for `partial_timeout` fails with
/// [`DispatchError::IncompleteRequest`], during shutdown as well.
fn read_frame(
    connection: &mut Connection,
    decoder: &mut FrameDecoder,
    partial_timeout: Duration,
) -> Result<Option<Value>, DispatchError> {
    let mut chunk = [0_u8; READ_CHUNK_BYTES];
    let mut last_progress = Instant::now();
    loop {
        if let Some(frame) = decoder.next_frame()? {
            return Ok(Some(frame));
        }
        match connection.read(&mut chunk) {
            Ok(0) => {
                if !decoder.is_idle() {
                    debug!(
                        target: DISPATCH_TARGET,
                        buffered = decoder.buffered(),
                        "peer closed mid-request"
                    );
                }
                return Ok(None);
            }
            Ok(read) => {
                decoder.push(chunk.get(..read).unwrap_or_default())?;
                last_progress = Instant::now();
            }
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                if decoder.is_idle() {
                    if connection.shutdown_requested() {
                        return Ok(None);
                    }
                    continue;
                }
                let waited = last_progress.elapsed();
                if waited >= partial_timeout {
                    return Err(DispatchError::incomplete_request(decoder.buffered(), waited));
                }
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error.into()),
        }
    }
}

fn write_response(connection: &mut Connection, response: &Response) -> Result<(), DispatchError> {
    let bytes = encode(response)?;
    connection.write_all(&bytes)?;
    connection.flush()?;
    Ok(())
}
