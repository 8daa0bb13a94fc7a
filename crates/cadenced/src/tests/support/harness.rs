//! Command server assembled from test routes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

use cadence_config::Endpoint;

use crate::dispatch::{AffinityDispatcher, CommandRouter, DispatchConnectionHandler};
use crate::host::{HostScheduler, HostThread};
use crate::routes::{HandlerCatalog, RouteManifest, RoutingTable, StaticRoutes, handler};
use crate::transport::{CommandServer, ServerTuning};

use super::RawClient;

const MAX_MESSAGE_BYTES: usize = 64 * 1024;
const PARTIAL_FRAME_TIMEOUT: Duration = Duration::from_millis(300);

/// Manifest exposing the probe handlers on both execution paths.
pub const PROBE_MANIFEST: &str = r#"{
    "commands": [
        { "name": "read_whoami", "handler": "whoami" },
        { "name": "write_whoami", "handler": "whoami", "main_thread": true },
        { "name": "slow_write", "handler": "slow", "main_thread": true },
        { "name": "echo" }
    ]
}"#;

/// Handlers reporting where and how they ran.
#[derive(Debug, Default)]
pub struct CommandProbe {
    active: AtomicBool,
    overlaps: AtomicUsize,
    completed: AtomicUsize,
}

impl CommandProbe {
    /// Catalog with `whoami`, `slow` and `echo` registered.
    pub fn catalog(self: &Arc<Self>) -> HandlerCatalog {
        let mut catalog = HandlerCatalog::new();
        catalog
            .register(
                "whoami",
                handler(|_| Ok(json!({ "thread": thread::current().name() }))),
            )
            .expect("register whoami");
        let probe = Arc::clone(self);
        catalog
            .register(
                "slow",
                handler(move |params| {
                    let delay = params.get("delay_ms").and_then(Value::as_u64).unwrap_or(50);
                    probe.run_exclusive(Duration::from_millis(delay));
                    Ok(json!({ "slept_ms": delay }))
                }),
            )
            .expect("register slow");
        catalog
            .register("echo", handler(|params| Ok(Value::Object(params.clone()))))
            .expect("register echo");
        catalog
    }

    fn run_exclusive(&self, delay: Duration) {
        if self.active.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        thread::sleep(delay);
        self.active.store(false, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of slow handlers that started while another was running.
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

/// Running command server backed by its own host thread.
pub struct ServerHarness {
    server: Option<CommandServer>,
    host: Arc<HostThread>,
    addr: SocketAddr,
}

impl ServerHarness {
    /// Starts a server for the probe routes.
    pub fn probe(probe: &Arc<CommandProbe>, handoff_timeout: Duration) -> Self {
        let manifest = RouteManifest::parse(PROBE_MANIFEST).expect("parse probe manifest");
        let table = probe.catalog().bind(&manifest).expect("bind probe manifest");
        Self::with_routes(Arc::new(StaticRoutes::new(table)), handoff_timeout)
    }

    pub fn with_routes(routes: Arc<dyn RoutingTable>, handoff_timeout: Duration) -> Self {
        let host = Arc::new(HostThread::spawn().expect("spawn host thread"));
        let dispatcher = AffinityDispatcher::new(
            Arc::clone(&host) as Arc<dyn HostScheduler>,
            handoff_timeout,
        );
        let handler = Arc::new(
            DispatchConnectionHandler::new(CommandRouter::new(routes, dispatcher), MAX_MESSAGE_BYTES)
                .with_partial_frame_timeout(PARTIAL_FRAME_TIMEOUT),
        );
        let tuning = ServerTuning {
            poll_interval: Duration::from_millis(20),
            shutdown_grace: Duration::from_millis(500),
        };
        let server = CommandServer::start(&Endpoint::new("127.0.0.1", 0), handler, tuning)
            .expect("start command server");
        let addr = server.local_addr();
        Self {
            server: Some(server),
            host,
            addr,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn client(&self) -> RawClient {
        RawClient::connect(self.addr)
    }

    pub fn max_message_bytes(&self) -> usize {
        MAX_MESSAGE_BYTES
    }
}

impl Drop for ServerHarness {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            let _ = server.stop();
        }
        self.host.stop(Duration::from_millis(500));
    }
}
