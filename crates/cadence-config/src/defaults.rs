//! Built-in defaults shared by the daemon and the client.

use crate::logging::LogFormat;

/// Host the command channel binds to and connects to.
pub const DEFAULT_HOST: &str = "localhost";

/// Well-known TCP port of the command channel.
pub const DEFAULT_PORT: u16 = 9877;

/// Deadline for the remainder of a request once its first bytes arrived.
pub const DEFAULT_PARTIAL_FRAME_TIMEOUT_MS: u64 = 10_000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Granularity at which blocked reads and the accept loop observe shutdown.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Time granted to connection workers to finish after shutdown is requested.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 5_000;

/// Deadline for a main-thread handoff before the caller gives up waiting.
pub const DEFAULT_MAIN_THREAD_TIMEOUT_MS: u64 = 10_000;

/// Largest single message either peer will buffer.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 8 * 1024 * 1024;

/// Fresh-connect attempts made by the client before giving up.
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 3;

/// Pause between fresh-connect attempts.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Overall receive deadline for read-only commands.
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 10_000;

/// Overall receive deadline for state-mutating commands.
pub const DEFAULT_MUTATING_TIMEOUT_MS: u64 = 15_000;

/// Read-only command used to validate a freshly opened connection.
pub const DEFAULT_PROBE_COMMAND: &str = "get_session_info";

/// Owned default host, used where the configuration layer needs a value.
#[must_use]
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}
