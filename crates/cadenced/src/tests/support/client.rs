//! Minimal socket client that speaks raw bytes to the daemon.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use cadence_protocol::FrameDecoder;
use serde_json::{Value, json};

const READ_LIMIT: usize = 1024 * 1024;

/// Outcome of waiting for a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Document(Value),
    Closed,
    TimedOut,
}

pub struct RawClient {
    stream: TcpStream,
    decoder: FrameDecoder,
}

impl RawClient {
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect to daemon");
        stream
            .set_read_timeout(Some(Duration::from_millis(50)))
            .expect("set read timeout");
        Self {
            stream,
            decoder: FrameDecoder::new(READ_LIMIT),
        }
    }

    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).expect("write request");
        self.stream.flush().expect("flush request");
    }

    /// Writes `bytes`, returning `false` when the daemon already hung up.
    pub fn send_lossy(&mut self, bytes: &[u8]) -> bool {
        self.stream.write_all(bytes).and_then(|()| self.stream.flush()).is_ok()
    }

    /// Sends `{"type": command, "params": params}` and returns the reply.
    pub fn call(&mut self, command: &str, params: Value) -> Value {
        let request = json!({ "type": command, "params": params });
        self.send_raw(&serde_json::to_vec(&request).expect("encode request"));
        match self.receive(Duration::from_secs(5)) {
            Reply::Document(value) => value,
            other => panic!("expected a response to {command}, got {other:?}"),
        }
    }

    pub fn receive(&mut self, timeout: Duration) -> Reply {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0_u8; 4096];
        loop {
            if let Some(value) = self.decoder.next_frame().expect("decode response") {
                return Reply::Document(value);
            }
            if Instant::now() >= deadline {
                return Reply::TimedOut;
            }
            match self.stream.read(&mut chunk) {
                Ok(0) => return Reply::Closed,
                Ok(read) => self
                    .decoder
                    .push(&chunk[..read])
                    .expect("response within limit"),
                Err(error)
                    if matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(error) if error.kind() == ErrorKind::ConnectionReset => return Reply::Closed,
                Err(error) => panic!("read failed: {error}"),
            }
        }
    }
}
