//! TCP command channel.
//!
//! The transport module binds the configured endpoint, accepts connections on
//! a background thread and hands each one to its own worker thread.

mod errors;
mod handler;
mod listener;
mod server;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub use self::handler::{Connection, ConnectionHandler};
pub(crate) use self::listener::{ListenerHandle, SocketListener};
pub use self::server::{CommandServer, ServerTuning};
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
