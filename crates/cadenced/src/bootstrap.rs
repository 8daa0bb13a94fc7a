//! Daemon bootstrap orchestration.

use std::io;
use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use cadence_config::{Config, OrthoConfig};

use crate::dispatch::{AffinityDispatcher, CommandRouter, DispatchConnectionHandler};
use crate::health::HealthReporter;
use crate::host::{HostScheduler, HostThread, Session, register_builtin_commands};
use crate::routes::{
    FileRouteSource, HandlerCatalog, HotRoutes, RouteError, RouteManifest, RoutingTable,
    StaticRoutes,
};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{CommandServer, ListenerError, ServerTuning};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that reads defaults, configuration files, the environment and the
/// process arguments.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The host thread could not be started.
    #[error("failed to start host thread: {source}")]
    Host {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The route table could not be built.
    #[error("failed to load command routes: {source}")]
    Routes {
        /// Underlying routing error.
        #[source]
        source: RouteError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    telemetry: TelemetryHandle,
    host: Arc<HostThread>,
    session: Arc<Session>,
    routes: Arc<dyn RoutingTable>,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Session mutated by the built-in commands.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The privileged host thread.
    #[must_use]
    pub fn host(&self) -> &Arc<HostThread> {
        &self.host
    }

    /// Routing table shared by every connection.
    #[must_use]
    pub fn routes(&self) -> &Arc<dyn RoutingTable> {
        &self.routes
    }

    /// Builds the per-request router.
    #[must_use]
    pub fn router(&self) -> CommandRouter {
        let dispatcher = AffinityDispatcher::new(
            Arc::clone(&self.host) as Arc<dyn HostScheduler>,
            self.config.main_thread_timeout(),
        );
        CommandRouter::new(Arc::clone(&self.routes), dispatcher)
    }

    /// Starts the command server on the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns a [`ListenerError`] when the endpoint cannot be bound.
    pub fn serve(&self) -> Result<CommandServer, ListenerError> {
        let handler = Arc::new(
            DispatchConnectionHandler::new(self.router(), self.config.max_message_bytes())
                .with_partial_frame_timeout(self.config.partial_frame_timeout()),
        );
        let server = CommandServer::start(
            &self.config.endpoint(),
            handler,
            ServerTuning::from_config(&self.config),
        )?;
        self.reporter.server_listening(server.local_addr());
        Ok(server)
    }

    /// Stops `server`, then drains and stops the host thread. Both get the
    /// configured shutdown grace period.
    ///
    /// # Errors
    ///
    /// Returns a [`ListenerError`] when the accept thread panicked.
    pub fn shutdown(self, server: CommandServer) -> Result<(), ListenerError> {
        let stopped = server.stop();
        self.host.stop(self.config.shutdown_grace());
        self.reporter.server_stopped();
        stopped
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Daemon")
            .field("config", &self.config)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns a [`BootstrapError`] describing the first stage that failed. The
/// reporter is told about the failure before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    match assemble(loader, &reporter) {
        Ok(daemon) => {
            reporter.bootstrap_succeeded(&daemon.config, daemon.routes.snapshot().len());
            Ok(daemon)
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn assemble(
    loader: &dyn ConfigLoader,
    reporter: &Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    let session = Arc::new(Session::new());
    let mut catalog = HandlerCatalog::new();
    register_builtin_commands(&mut catalog, &session)
        .map_err(|source| BootstrapError::Routes { source })?;
    let routes =
        build_routes(&config, catalog).map_err(|source| BootstrapError::Routes { source })?;

    let host = HostThread::spawn().map_err(|source| BootstrapError::Host { source })?;

    Ok(Daemon {
        config,
        telemetry,
        host: Arc::new(host),
        session,
        routes,
        reporter: Arc::clone(reporter),
    })
}

fn build_routes(
    config: &Config,
    catalog: HandlerCatalog,
) -> Result<Arc<dyn RoutingTable>, RouteError> {
    match config.routes_path() {
        Some(path) => {
            let source = FileRouteSource::new(path, Arc::new(catalog));
            Ok(Arc::new(HotRoutes::load(source)?))
        }
        None => {
            let table = catalog.bind(&RouteManifest::embedded()?)?;
            Ok(Arc::new(StaticRoutes::new(table)))
        }
    }
}
