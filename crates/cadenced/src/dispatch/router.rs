//! Command routing for parsed requests.

use std::sync::Arc;

use cadence_protocol::{Request, Response};
use serde_json::Value;
use tracing::{debug, warn};

use crate::routes::RoutingTable;

use super::DISPATCH_TARGET;
use super::affinity::AffinityDispatcher;
use super::errors::DispatchError;

/// Resolves requests against the routing table and executes them.
#[derive(Clone)]
pub struct CommandRouter {
    routes: Arc<dyn RoutingTable>,
    dispatcher: AffinityDispatcher,
}

impl CommandRouter {
    /// Builds a router over `routes`.
    #[must_use]
    pub fn new(routes: Arc<dyn RoutingTable>, dispatcher: AffinityDispatcher) -> Self {
        Self { routes, dispatcher }
    }

    /// Runs `request` and returns its result or the error for the caller.
    ///
    /// The routing table gets one reload check before the lookup. The snapshot
    /// taken afterwards is used for the rest of the request.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownCommand`] when no route matches, or the
    /// dispatcher's failure.
    pub fn route(&self, request: &Request) -> Result<Value, DispatchError> {
        self.routes.maybe_reload();
        let table = self.routes.snapshot();
        let route = table
            .lookup(&request.command)
            .ok_or_else(|| DispatchError::unknown_command(&request.command))?;
        debug!(
            target: DISPATCH_TARGET,
            command = %request.command,
            main_thread = route.main_thread(),
            "dispatching request"
        );
        self.dispatcher.execute(route, &request.params)
    }

    /// Runs `request` and wraps the outcome as a response.
    #[must_use]
    pub fn respond(&self, request: &Request) -> Response {
        match self.route(request) {
            Ok(result) => Response::success(result),
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    command = %request.command,
                    %error,
                    "request failed"
                );
                Response::error(error.to_string())
            }
        }
    }
}

impl std::fmt::Debug for CommandRouter {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CommandRouter")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
