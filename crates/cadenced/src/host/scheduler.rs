//! Privileged host thread and its FIFO callback queue.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use cadence_config::DEFAULT_SHUTDOWN_GRACE_MS;
use thiserror::Error;
use tracing::{debug, warn};

use super::HOST_TARGET;

const JOIN_POLL: Duration = Duration::from_millis(10);

/// Callback executed once on the host thread.
pub type HostTask = Box<dyn FnOnce() + Send + 'static>;

/// Schedules callbacks onto the host's privileged thread.
///
/// Callbacks run as soon as possible, one at a time, in the order they were
/// scheduled.
pub trait HostScheduler: Send + Sync {
    /// Queues `task` for execution on the host thread.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::Stopped`] when the host thread no longer
    /// accepts work.
    fn schedule(&self, task: HostTask) -> Result<(), ScheduleError>;
}

/// Errors reported when a callback cannot be queued.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The host thread has stopped.
    #[error("host thread is not running")]
    Stopped,
}

/// Named thread draining a FIFO queue of [`HostTask`]s.
///
/// Stopping closes the queue and lets already queued tasks finish within a
/// grace period. A task that outlives the grace period keeps running on the
/// detached thread. Dropping the handle stops it with the default grace.
#[derive(Debug)]
pub struct HostThread {
    sender: Mutex<Option<Sender<HostTask>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl HostThread {
    /// Spawns the host thread.
    ///
    /// # Errors
    ///
    /// Returns an error when the operating system refuses to create the
    /// thread.
    pub fn spawn() -> io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<HostTask>();
        let handle = thread::Builder::new()
            .name(String::from("cadence-host"))
            .spawn(move || {
                while let Ok(task) = receiver.recv() {
                    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                        warn!(target: HOST_TARGET, "host task panicked");
                    }
                }
                debug!(target: HOST_TARGET, "host queue closed");
            })?;
        let thread_id = handle.thread().id();
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
            thread_id,
        })
    }

    /// Identifier of the privileged thread.
    #[must_use]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Closes the queue and waits up to `grace` for queued tasks to drain.
    ///
    /// Returns `false` when the thread was still busy at the deadline and has
    /// been detached.
    pub fn stop(&self, grace: Duration) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return true;
        };

        let deadline = Instant::now() + grace;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(
                    target: HOST_TARGET,
                    grace_ms = grace.as_millis(),
                    "host thread still busy after grace period; detaching"
                );
                return false;
            }
            thread::sleep(JOIN_POLL);
        }
        if handle.join().is_err() {
            warn!(target: HOST_TARGET, "host thread panicked");
        }
        true
    }
}

impl HostScheduler for HostThread {
    fn schedule(&self, task: HostTask) -> Result<(), ScheduleError> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = guard.as_ref().ok_or(ScheduleError::Stopped)?;
        sender.send(task).map_err(|_| ScheduleError::Stopped)
    }
}

impl Drop for HostThread {
    fn drop(&mut self) {
        self.stop(Duration::from_millis(DEFAULT_SHUTDOWN_GRACE_MS));
    }
}
