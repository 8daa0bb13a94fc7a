//! Host-side process of the Cadence command bridge.
//!
//! The daemon owns a simulated single-threaded host (a music session driven
//! from one privileged thread) and exposes it over a localhost TCP channel.
//! Each accepted connection is served by its own worker thread. Requests are
//! routed through a hot-reloadable [`routes::RoutingTable`]; commands marked
//! `main_thread` are handed to the host thread and awaited with a deadline,
//! while read-only queries run directly on the worker.
//!
//! The bootstrap sequence loads configuration, installs structured telemetry,
//! starts the host thread, binds the handler catalog to the route manifest and
//! finally starts the [`CommandServer`]. Health reporting hooks emit a
//! structured event at each stage.

mod bootstrap;
mod dispatch;
mod health;
pub mod host;
mod process;
pub mod routes;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use dispatch::{AffinityDispatcher, CommandRouter, DispatchConnectionHandler, DispatchError};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{
    CommandServer, Connection, ConnectionHandler, ListenerError, ServerTuning,
};

#[cfg(test)]
mod tests;
