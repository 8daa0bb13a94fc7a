//! Thread-affinity dispatch.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use cadence_protocol::Params;
use serde_json::Value;
use tracing::debug;

use crate::host::HostScheduler;
use crate::routes::Route;

use super::DISPATCH_TARGET;
use super::errors::DispatchError;

/// Runs route handlers on the thread their affinity requires.
///
/// Routes without main-thread affinity run synchronously on the caller's
/// thread. Routes with it are scheduled on the host thread and the caller
/// blocks on a single-use result slot until the handler finishes or the
/// deadline passes. A timed-out task still runs later; its result is dropped.
#[derive(Clone)]
pub struct AffinityDispatcher {
    scheduler: Arc<dyn HostScheduler>,
    timeout: Duration,
}

impl AffinityDispatcher {
    /// Builds a dispatcher scheduling onto `scheduler`.
    #[must_use]
    pub fn new(scheduler: Arc<dyn HostScheduler>, timeout: Duration) -> Self {
        Self { scheduler, timeout }
    }

    /// Deadline applied to main-thread tasks.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Executes `route` with `params`.
    ///
    /// # Errors
    ///
    /// Returns the handler's failure, a panic report, a timeout, or a
    /// scheduling failure.
    pub fn execute(&self, route: &Route, params: &Params) -> Result<Value, DispatchError> {
        if route.main_thread() {
            self.execute_on_host(route, params)
        } else {
            run_guarded(route, params)
        }
    }

    fn execute_on_host(&self, route: &Route, params: &Params) -> Result<Value, DispatchError> {
        let (slot, result) = mpsc::sync_channel(1);
        let task_route = route.clone();
        let task_params = params.clone();
        self.scheduler
            .schedule(Box::new(move || {
                let outcome = run_guarded(&task_route, &task_params);
                if slot.send(outcome).is_err() {
                    debug!(
                        target: DISPATCH_TARGET,
                        command = task_route.name(),
                        "discarding result of abandoned main-thread task"
                    );
                }
            }))
            .map_err(|source| DispatchError::HostUnavailable { source })?;

        match result.recv_timeout(self.timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                Err(DispatchError::timeout(route.name(), self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(DispatchError::TaskDropped {
                command: route.name().to_owned(),
            }),
        }
    }
}

impl std::fmt::Debug for AffinityDispatcher {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AffinityDispatcher")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn run_guarded(route: &Route, params: &Params) -> Result<Value, DispatchError> {
    match panic::catch_unwind(AssertUnwindSafe(|| route.invoke(params))) {
        Ok(outcome) => outcome.map_err(DispatchError::from),
        Err(payload) => Err(DispatchError::handler_panicked(
            route.name(),
            panic_message(payload.as_ref()),
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("handler panicked"))
}
