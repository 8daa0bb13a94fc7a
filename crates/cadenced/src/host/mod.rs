//! Simulated single-threaded host.
//!
//! The host owns a [`Session`] that may only be mutated from its privileged
//! thread. [`HostThread`] runs that thread and accepts callbacks through the
//! [`HostScheduler`] trait; [`register_builtin_commands`] installs the handlers
//! that read and mutate the session.

mod commands;
mod params;
mod scheduler;
mod session;

pub use commands::{BUILTIN_COMMANDS, register_builtin_commands};
pub use scheduler::{HostScheduler, HostTask, HostThread, ScheduleError};
pub use session::{Note, Session};

pub(crate) const HOST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::host");
