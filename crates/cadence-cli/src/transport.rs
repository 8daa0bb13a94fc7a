//! Socket helpers for dialling the bridge and checking cached connections.

use std::io::{ErrorKind, Write};
use std::net::TcpStream;
use std::time::Duration;

use cadence_config::Endpoint;

use crate::ClientError;

pub(crate) fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<TcpStream, ClientError> {
    let address = endpoint.resolve().map_err(|source| ClientError::Resolve {
        endpoint: endpoint.to_string(),
        source,
    })?;
    let stream = TcpStream::connect_timeout(&address, timeout).map_err(ClientError::transport)?;
    stream.set_nodelay(true).map_err(ClientError::transport)?;
    Ok(stream)
}

/// Liveness check for an idle cached connection.
///
/// A zero-byte write catches a locally torn-down socket; a non-blocking peek
/// then catches a peer that has closed (EOF) or sent bytes nobody asked for.
/// Either way the connection is not safe to reuse.
pub(crate) fn is_alive(stream: &TcpStream) -> bool {
    let mut writer = stream;
    if writer.write(&[]).is_err() {
        return false;
    }
    if stream.set_nonblocking(true).is_err() {
        return false;
    }
    let mut byte = [0_u8; 1];
    let idle = matches!(stream.peek(&mut byte), Err(error) if error.kind() == ErrorKind::WouldBlock);
    stream.set_nonblocking(false).is_ok() && idle
}
