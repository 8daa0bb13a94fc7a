//! Test double for [`HealthReporter`] that records lifecycle events.

use std::net::SocketAddr;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use cadence_config::Config;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Lifecycle events captured during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded { routes: usize },
    BootstrapFailed(String),
    ServerListening(SocketAddr),
    ServerStopped,
}

/// Records health events and lets tests wait for the listening address.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
    changed: Condvar,
}

impl RecordingHealthReporter {
    /// Copy of the events recorded so far.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Blocks until the server reports its address or `timeout` elapses.
    pub fn wait_for_listening(&self, timeout: Duration) -> Option<SocketAddr> {
        let events = self.events.lock().expect("health reporter mutex poisoned");
        let (events, _) = self
            .changed
            .wait_timeout_while(events, timeout, |events| listening(events).is_none())
            .expect("health reporter mutex poisoned");
        listening(&events)
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
        self.changed.notify_all();
    }
}

fn listening(events: &[HealthEvent]) -> Option<SocketAddr> {
    events.iter().find_map(|event| match event {
        HealthEvent::ServerListening(addr) => Some(*addr),
        _ => None,
    })
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config, routes: usize) {
        self.record(HealthEvent::BootstrapSucceeded { routes });
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn server_listening(&self, addr: SocketAddr) {
        self.record(HealthEvent::ServerListening(addr));
    }

    fn server_stopped(&self) {
        self.record(HealthEvent::ServerStopped);
    }
}
