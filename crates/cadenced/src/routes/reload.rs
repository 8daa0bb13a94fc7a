//! Routing tables consumed by the dispatcher.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::SystemTime;

use tracing::{info, warn};

use super::ROUTES_TARGET;
use super::errors::RouteError;
use super::source::RouteSource;
use super::table::RouteTable;

/// Outcome of a reload check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The backing source has not changed since it was last seen.
    Unchanged,
    /// A new table was swapped in.
    Reloaded,
    /// The source changed but could not be loaded; the previous table stays
    /// active.
    Failed,
}

/// Routing collaborator used once per request.
///
/// Callers invoke [`RoutingTable::maybe_reload`] before taking a
/// [`RoutingTable::snapshot`]. Reload failures are logged and never reach the
/// request that triggered them.
pub trait RoutingTable: Send + Sync {
    /// Reloads the table if its backing source changed.
    fn maybe_reload(&self) -> ReloadOutcome;

    /// Table currently in force.
    fn snapshot(&self) -> Arc<RouteTable>;
}

impl<T> RoutingTable for Arc<T>
where
    T: RoutingTable + ?Sized,
{
    fn maybe_reload(&self) -> ReloadOutcome {
        (**self).maybe_reload()
    }

    fn snapshot(&self) -> Arc<RouteTable> {
        (**self).snapshot()
    }
}

/// Table that never changes.
#[derive(Debug, Clone)]
pub struct StaticRoutes {
    table: Arc<RouteTable>,
}

impl StaticRoutes {
    /// Wraps a fixed table.
    #[must_use]
    pub fn new(table: RouteTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }
}

impl RoutingTable for StaticRoutes {
    fn maybe_reload(&self) -> ReloadOutcome {
        ReloadOutcome::Unchanged
    }

    fn snapshot(&self) -> Arc<RouteTable> {
        Arc::clone(&self.table)
    }
}

#[derive(Debug)]
struct ReloadState {
    seen: SystemTime,
    last_probe_error: Option<String>,
}

/// Table rebuilt from a [`RouteSource`] whenever its modification time moves.
///
/// Reload checks serialise on an internal mutex so concurrent requests that
/// observe the same change reload once. A failed revision is remembered and
/// not retried until the source changes again.
#[derive(Debug)]
pub struct HotRoutes<S> {
    source: S,
    current: RwLock<Arc<RouteTable>>,
    state: Mutex<ReloadState>,
}

impl<S> HotRoutes<S>
where
    S: RouteSource,
{
    /// Performs the initial load.
    ///
    /// # Errors
    ///
    /// Returns the source's error when the first table cannot be built.
    pub fn load(source: S) -> Result<Self, RouteError> {
        let seen = source.modified()?;
        let table = source.load()?;
        info!(
            target: ROUTES_TARGET,
            source = %source.describe(),
            routes = table.len(),
            "route table loaded"
        );
        Ok(Self {
            source,
            current: RwLock::new(Arc::new(table)),
            state: Mutex::new(ReloadState {
                seen,
                last_probe_error: None,
            }),
        })
    }

    fn swap(&self, table: RouteTable) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(table);
    }
}

impl<S> RoutingTable for HotRoutes<S>
where
    S: RouteSource,
{
    fn maybe_reload(&self) -> ReloadOutcome {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let modified = match self.source.modified() {
            Ok(modified) => {
                state.last_probe_error = None;
                modified
            }
            Err(error) => {
                let message = error.to_string();
                if state.last_probe_error.as_deref() != Some(message.as_str()) {
                    warn!(
                        target: ROUTES_TARGET,
                        source = %self.source.describe(),
                        error = %message,
                        "route source unavailable; keeping current table"
                    );
                    state.last_probe_error = Some(message);
                }
                return ReloadOutcome::Failed;
            }
        };
        if modified == state.seen {
            return ReloadOutcome::Unchanged;
        }
        state.seen = modified;

        match self.source.load() {
            Ok(table) => {
                let routes = table.len();
                self.swap(table);
                info!(
                    target: ROUTES_TARGET,
                    source = %self.source.describe(),
                    routes,
                    "route table reloaded"
                );
                ReloadOutcome::Reloaded
            }
            Err(error) => {
                warn!(
                    target: ROUTES_TARGET,
                    source = %self.source.describe(),
                    error = %error,
                    "route reload failed; keeping current table"
                );
                ReloadOutcome::Failed
            }
        }
    }

    fn snapshot(&self) -> Arc<RouteTable> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }
}
