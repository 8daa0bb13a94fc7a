//! Immutable command routing snapshots.

use std::collections::HashMap;
use std::fmt;

use cadence_protocol::Params;
use serde_json::Value;

use super::handler::{CommandError, CommandHandler};

/// A routable command: its handler and whether it must run on the host thread.
#[derive(Clone)]
pub struct Route {
    name: String,
    handler: CommandHandler,
    main_thread: bool,
}

impl Route {
    /// Builds a route.
    pub fn new(name: impl Into<String>, handler: CommandHandler, main_thread: bool) -> Self {
        Self {
            name: name.into(),
            handler,
            main_thread,
        }
    }

    /// Command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` when the handler must run on the host thread.
    #[must_use]
    pub const fn main_thread(&self) -> bool {
        self.main_thread
    }

    /// Runs the handler on the calling thread.
    ///
    /// # Errors
    ///
    /// Propagates the handler's [`CommandError`].
    pub fn invoke(&self, params: &Params) -> Result<Value, CommandError> {
        (*self.handler)(params)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Route")
            .field("name", &self.name)
            .field("main_thread", &self.main_thread)
            .finish_non_exhaustive()
    }
}

/// Snapshot of the command routes in force.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    routes: HashMap<String, Route>,
}

impl RouteTable {
    /// Builds a table from routes; later routes replace earlier ones of the
    /// same name.
    pub fn from_routes(routes: impl IntoIterator<Item = Route>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|route| (route.name.clone(), route))
                .collect(),
        }
    }

    /// Finds the route for `name`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Route> {
        self.routes.get(name)
    }

    /// Number of routed commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` when no commands are routed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routed command names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
