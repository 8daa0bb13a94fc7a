//! Connection handling abstractions for the command listener.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// An accepted connection, owned by exactly one worker.
///
/// Reads time out after the server's poll interval so the worker can notice
/// [`Connection::shutdown_requested`] between requests.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    shutdown: Arc<AtomicBool>,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream, peer: SocketAddr, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            stream,
            peer,
            shutdown,
        }
    }

    /// Remote address of the client.
    #[must_use]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Returns `true` once the server has begun shutting down.
    #[must_use]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Handles accepted connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Serves a connection until the peer leaves, an IO error occurs or
    /// shutdown is requested. Implementations should avoid panicking.
    fn handle(&self, connection: Connection);
}
