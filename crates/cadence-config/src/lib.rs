//! Shared configuration for the Cadence command bridge.
//!
//! Both the host-side daemon (`cadenced`) and the client (`cadence`) read the
//! same [`Config`]. Values are layered by `ortho_config`: built-in defaults,
//! then a configuration file (`--config-path`), then `CADENCE_*` environment
//! variables, then command-line flags. The channel address always has a value;
//! the remaining fields are optional and resolved through an accessor that
//! applies the matching `DEFAULT_*` constant.

mod defaults;
mod endpoint;
mod logging;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
pub use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CONNECT_ATTEMPTS, DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_MAIN_THREAD_TIMEOUT_MS,
    DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_MUTATING_TIMEOUT_MS, DEFAULT_PARTIAL_FRAME_TIMEOUT_MS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_PORT, DEFAULT_PROBE_COMMAND, DEFAULT_RECEIVE_TIMEOUT_MS,
    DEFAULT_RETRY_DELAY_MS, DEFAULT_SHUTDOWN_GRACE_MS, default_host, default_log_filter,
    default_log_format,
};
pub use endpoint::{Endpoint, EndpointParseError};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration for the bridge binaries.
///
/// Load it with [`OrthoConfig::load`] (process arguments) or
/// [`OrthoConfig::load_from_iter`] (explicit arguments).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CADENCE")]
#[serde(default)]
pub struct Config {
    /// Host the command channel binds to (daemon) or dials (client).
    #[ortho_config(default = default_host())]
    pub host: String,
    /// TCP port of the command channel.
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// Tracing filter expression.
    pub log_filter: Option<String>,
    /// Log output format.
    pub log_format: Option<LogFormat>,
    /// Route manifest watched for hot reload. The embedded manifest is used
    /// when unset.
    pub routes_path: Option<Utf8PathBuf>,
    /// Read poll interval in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Worker join grace period on shutdown, in milliseconds.
    pub shutdown_grace_ms: Option<u64>,
    /// Main-thread handoff deadline in milliseconds.
    pub main_thread_timeout_ms: Option<u64>,
    /// Deadline for the rest of a partially received request, in milliseconds.
    pub partial_frame_timeout_ms: Option<u64>,
    /// Maximum buffered message size in bytes.
    pub max_message_bytes: Option<usize>,
    /// Client connection attempts per fresh connect.
    pub connect_attempts: Option<u32>,
    /// Client delay between connection attempts, in milliseconds.
    pub retry_delay_ms: Option<u64>,
    /// Client receive deadline for read-only commands, in milliseconds.
    pub receive_timeout_ms: Option<u64>,
    /// Client receive deadline for mutating commands, in milliseconds.
    pub mutating_timeout_ms: Option<u64>,
    /// Command used by the client to validate a fresh connection.
    pub probe_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            log_filter: None,
            log_format: None,
            routes_path: None,
            poll_interval_ms: None,
            shutdown_grace_ms: None,
            main_thread_timeout_ms: None,
            partial_frame_timeout_ms: None,
            max_message_bytes: None,
            connect_attempts: None,
            retry_delay_ms: None,
            receive_timeout_ms: None,
            mutating_timeout_ms: None,
            probe_command: None,
        }
    }
}

impl Config {
    /// Address of the command channel.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.as_str(), self.port)
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }

    /// Route manifest path, when one is configured.
    #[must_use]
    pub fn routes_path(&self) -> Option<&Utf8Path> {
        self.routes_path.as_deref()
    }

    /// Granularity at which blocked operations observe shutdown.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        millis(self.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS)
    }

    /// Grace period granted to connection workers on shutdown.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        millis(self.shutdown_grace_ms, DEFAULT_SHUTDOWN_GRACE_MS)
    }

    /// Deadline for a main-thread handoff.
    #[must_use]
    pub fn main_thread_timeout(&self) -> Duration {
        millis(self.main_thread_timeout_ms, DEFAULT_MAIN_THREAD_TIMEOUT_MS)
    }

    /// Time a worker waits for the remainder of a partially received request
    /// before failing the connection.
    #[must_use]
    pub fn partial_frame_timeout(&self) -> Duration {
        millis(self.partial_frame_timeout_ms, DEFAULT_PARTIAL_FRAME_TIMEOUT_MS)
    }

    /// Largest message either peer buffers before failing the connection.
    #[must_use]
    pub fn max_message_bytes(&self) -> usize {
        self.max_message_bytes.unwrap_or(DEFAULT_MAX_MESSAGE_BYTES)
    }

    /// Connection attempts per fresh connect; never less than one.
    #[must_use]
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
            .unwrap_or(DEFAULT_CONNECT_ATTEMPTS)
            .max(1)
    }

    /// Delay between connection attempts.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        millis(self.retry_delay_ms, DEFAULT_RETRY_DELAY_MS)
    }

    /// Receive deadline for read-only commands.
    #[must_use]
    pub fn receive_timeout(&self) -> Duration {
        millis(self.receive_timeout_ms, DEFAULT_RECEIVE_TIMEOUT_MS)
    }

    /// Receive deadline for state-mutating commands.
    #[must_use]
    pub fn mutating_timeout(&self) -> Duration {
        millis(self.mutating_timeout_ms, DEFAULT_MUTATING_TIMEOUT_MS)
    }

    /// Command issued to validate a fresh connection.
    #[must_use]
    pub fn probe_command(&self) -> &str {
        self.probe_command.as_deref().unwrap_or(DEFAULT_PROBE_COMMAND)
    }
}

fn millis(value: Option<u64>, default: u64) -> Duration {
    Duration::from_millis(value.unwrap_or(default))
}
