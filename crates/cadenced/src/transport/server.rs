//! Command server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use cadence_config::{Config, Endpoint};

use super::{ConnectionHandler, LISTENER_TARGET, ListenerError, ListenerHandle, SocketListener};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Timing knobs for the command server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerTuning {
    /// Read timeout on accepted sockets; bounds how long a worker takes to
    /// notice shutdown while idle.
    pub poll_interval: Duration,
    /// How long [`CommandServer::stop`] waits for workers before detaching
    /// them.
    pub shutdown_grace: Duration,
}

impl ServerTuning {
    /// Reads the tuning from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            shutdown_grace: config.shutdown_grace(),
        }
    }
}

impl Default for ServerTuning {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Accepts connections and serves each on its own worker thread.
pub struct CommandServer {
    handle: ListenerHandle,
    local_addr: SocketAddr,
    tuning: ServerTuning,
}

impl CommandServer {
    /// Binds `endpoint` and starts accepting connections.
    ///
    /// # Errors
    ///
    /// Returns a [`ListenerError`] when the endpoint cannot be resolved or
    /// bound, or the accept thread cannot be started.
    pub fn start(
        endpoint: &Endpoint,
        handler: Arc<dyn ConnectionHandler>,
        tuning: ServerTuning,
    ) -> Result<Self, ListenerError> {
        let listener = SocketListener::bind(endpoint)?;
        let local_addr = listener.local_addr()?;
        let handle = listener.start(handler, tuning.poll_interval.max(MIN_POLL_INTERVAL))?;
        Ok(Self {
            handle,
            local_addr,
            tuning,
        })
    }

    /// Address the server is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting, then waits up to the grace period for workers to
    /// finish their current request.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the accept thread panicked.
    pub fn stop(self) -> Result<(), ListenerError> {
        let detached = self.handle.join(self.tuning.shutdown_grace)?;
        info!(
            target: LISTENER_TARGET,
            addr = %self.local_addr,
            detached,
            "command server stopped"
        );
        Ok(())
    }
}

impl std::fmt::Debug for CommandServer {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CommandServer")
            .field("local_addr", &self.local_addr)
            .field("tuning", &self.tuning)
            .finish_non_exhaustive()
    }
}
