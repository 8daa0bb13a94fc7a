//! Listener implementation for the command channel.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use cadence_config::Endpoint;

use super::{Connection, ConnectionHandler, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const JOIN_POLL: Duration = Duration::from_millis(10);

/// Listener bound to a TCP endpoint.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: Endpoint,
    listener: TcpListener,
}

impl SocketListener {
    pub(crate) fn bind(endpoint: &Endpoint) -> Result<Self, ListenerError> {
        let addr = endpoint.resolve().map_err(|source| ListenerError::Resolve {
            host: endpoint.host().to_owned(),
            port: endpoint.port(),
            source,
        })?;
        let listener =
            TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })?;
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    pub(crate) fn local_addr(&self) -> Result<SocketAddr, ListenerError> {
        self.listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })
    }

    /// Starts the accept loop.
    ///
    /// Accepted sockets get `poll_interval` as their read timeout.
    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
        poll_interval: Duration,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name(String::from("cadence-accept"))
            .spawn(move || run_accept_loop(&self, &shutdown_flag, &handler, poll_interval))
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background accept thread.
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<Vec<JoinHandle<()>>>>,
}

impl ListenerHandle {
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Joins the accept loop and then the connection workers.
    ///
    /// Workers still running after `grace` are detached and reported.
    /// Returns the number of detached workers.
    pub(crate) fn join(mut self, grace: Duration) -> Result<usize, ListenerError> {
        self.shutdown();
        let Some(handle) = self.handle.take() else {
            return Ok(0);
        };
        let workers = handle.join().map_err(|_| ListenerError::ThreadPanic)?;
        Ok(join_workers(workers, grace))
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn join_workers(mut workers: Vec<JoinHandle<()>>, grace: Duration) -> usize {
    let deadline = Instant::now() + grace;
    loop {
        let (finished, running): (Vec<_>, Vec<_>) =
            workers.into_iter().partition(JoinHandle::is_finished);
        for worker in finished {
            if worker.join().is_err() {
                warn!(target: LISTENER_TARGET, "connection worker panicked");
            }
        }
        workers = running;
        if workers.is_empty() {
            return 0;
        }
        if Instant::now() >= deadline {
            warn!(
                target: LISTENER_TARGET,
                workers = workers.len(),
                grace_ms = grace.as_millis(),
                "connection workers still running after grace period; detaching"
            );
            return workers.len();
        }
        thread::sleep(JOIN_POLL);
    }
}

fn run_accept_loop(
    listener: &SocketListener,
    shutdown: &Arc<AtomicBool>,
    handler: &Arc<dyn ConnectionHandler>,
    poll_interval: Duration,
) -> Vec<JoinHandle<()>> {
    info!(
        target: LISTENER_TARGET,
        endpoint = %listener.endpoint,
        "command listener active"
    );
    let mut workers: Vec<JoinHandle<()>> = Vec::new();
    let mut next_worker = 0_u64;
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(listener, poll_interval) {
            Ok(Some((stream, peer))) => {
                last_error = None;
                workers.retain(|worker| !worker.is_finished());
                next_worker = next_worker.wrapping_add(1);
                let connection = Connection::new(stream, peer, Arc::clone(shutdown));
                let handler = Arc::clone(handler);
                match thread::Builder::new()
                    .name(format!("cadence-conn-{next_worker}"))
                    .spawn(move || handler.handle(connection))
                {
                    Ok(worker) => {
                        debug!(target: LISTENER_TARGET, %peer, "connection accepted");
                        workers.push(worker);
                    }
                    Err(error) => {
                        warn!(
                            target: LISTENER_TARGET,
                            %peer,
                            error = %error,
                            "failed to spawn connection worker"
                        );
                    }
                }
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(
        target: LISTENER_TARGET,
        endpoint = %listener.endpoint,
        "command listener stopped"
    );
    workers
}

fn accept_connection(
    listener: &SocketListener,
    poll_interval: Duration,
) -> io::Result<Option<(std::net::TcpStream, SocketAddr)>> {
    match listener.listener.accept() {
        Ok((stream, peer)) => {
            stream.set_nonblocking(false)?;
            stream.set_read_timeout(Some(poll_interval))?;
            stream.set_nodelay(true)?;
            Ok(Some((stream, peer)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}
