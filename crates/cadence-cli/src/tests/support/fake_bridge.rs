//! Fake bridge server for client tests.
//!
//! Accepts any number of connections, answers each request through a
//! scripted reply function and records every command it saw. It can be
//! stopped, which closes live connections, and restarted on the same port.

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use cadence_protocol::{FrameDecoder, Request, Response, encode};
use serde_json::json;

const POLL: Duration = Duration::from_millis(10);

/// How the fake bridge answers one command.
#[derive(Debug, Clone)]
pub(in crate::tests) enum Reply {
    Success(serde_json::Value),
    Error(String),
    Silence,
}

#[derive(Default)]
struct Shared {
    scripted: Mutex<HashMap<String, Reply>>,
    commands: Mutex<Vec<String>>,
    connections: AtomicUsize,
}

pub(in crate::tests) struct FakeBridge {
    shared: Arc<Shared>,
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    accept: Option<thread::JoinHandle<()>>,
}

impl FakeBridge {
    /// Starts on an ephemeral port, answering every command with success.
    pub fn spawn() -> Result<Self> {
        Self::start(Arc::new(Shared::default()), (Ipv4Addr::LOCALHOST, 0).into())
    }

    fn start(shared: Arc<Shared>, addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).context("bind fake bridge")?;
        listener
            .set_nonblocking(true)
            .context("fake bridge nonblocking")?;
        let addr = listener.local_addr().context("fake bridge address")?;
        let stop = Arc::new(AtomicBool::new(false));
        let accept = {
            let shared = Arc::clone(&shared);
            let stop = Arc::clone(&stop);
            thread::spawn(move || accept_loop(&listener, &shared, &stop))
        };
        Ok(Self {
            shared,
            addr,
            stop,
            accept: Some(accept),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn script(&self, command: &str, reply: Reply) {
        self.shared
            .scripted
            .lock()
            .expect("script mutex poisoned")
            .insert(command.to_owned(), reply);
    }

    pub fn commands(&self) -> Vec<String> {
        self.shared
            .commands
            .lock()
            .expect("command mutex poisoned")
            .clone()
    }

    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Stops accepting and closes every live connection.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(accept) = self.accept.take() {
            let _ = accept.join();
        }
    }

    /// Stops, then listens again on the same port with the same script.
    pub fn restart(&mut self) -> Result<()> {
        self.stop();
        let restarted = Self::start(Arc::clone(&self.shared), self.addr)?;
        *self = restarted;
        Ok(())
    }
}

impl Drop for FakeBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(listener: &TcpListener, shared: &Arc<Shared>, stop: &Arc<AtomicBool>) {
    let mut workers = Vec::new();
    while !stop.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                shared.connections.fetch_add(1, Ordering::SeqCst);
                let shared = Arc::clone(shared);
                let stop = Arc::clone(stop);
                workers.push(thread::spawn(move || serve(stream, &shared, &stop)));
            }
            Err(error) if error.kind() == ErrorKind::WouldBlock => thread::sleep(POLL),
            Err(_) => break,
        }
    }
    for worker in workers {
        let _ = worker.join();
    }
}

fn serve(mut stream: TcpStream, shared: &Shared, stop: &AtomicBool) {
    if stream.set_nonblocking(false).is_err() || stream.set_read_timeout(Some(POLL)).is_err() {
        return;
    }
    let mut decoder = FrameDecoder::new(1024 * 1024);
    let mut chunk = [0_u8; 4096];
    while !stop.load(Ordering::SeqCst) {
        match decoder.next_frame() {
            Ok(Some(document)) => {
                let Ok(request) = Request::from_value(document) else {
                    return;
                };
                if !answer(&mut stream, shared, &request) {
                    return;
                }
                continue;
            }
            Ok(None) => {}
            Err(_) => return,
        }
        match stream.read(&mut chunk) {
            Ok(0) => return,
            Ok(read) => {
                if decoder.push(&chunk[..read]).is_err() {
                    return;
                }
            }
            Err(error) if matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(_) => return,
        }
    }
}

fn answer(stream: &mut TcpStream, shared: &Shared, request: &Request) -> bool {
    shared
        .commands
        .lock()
        .expect("command mutex poisoned")
        .push(request.command.clone());
    let reply = shared
        .scripted
        .lock()
        .expect("script mutex poisoned")
        .get(&request.command)
        .cloned()
        .unwrap_or_else(|| Reply::Success(json!({ "echo": request.command })));
    let response = match reply {
        Reply::Success(result) => Response::success(result),
        Reply::Error(message) => Response::error(message),
        Reply::Silence => return true,
    };
    let Ok(bytes) = encode(&response) else {
        return false;
    };
    stream.write_all(&bytes).and_then(|()| stream.flush()).is_ok()
}
