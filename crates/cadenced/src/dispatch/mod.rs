//! Request dispatch for accepted connections.
//!
//! A connection carries a sequence of request documents. For each one the
//! worker:
//!
//! 1. reassembles the document with a [`cadence_protocol::FrameDecoder`];
//! 2. converts it into a [`cadence_protocol::Request`];
//! 3. asks the routing table to reload if its source changed, then looks the
//!    command up in the current snapshot;
//! 4. runs the handler through the [`AffinityDispatcher`], on the worker or on
//!    the host thread as the route requires;
//! 5. writes exactly one response document.
//!
//! Routing, handler and timeout failures become error responses and the
//! connection stays open. Malformed or oversized input and socket errors end
//! the connection.

mod affinity;
mod errors;
mod handler;
mod router;

pub use self::affinity::AffinityDispatcher;
pub use self::errors::DispatchError;
pub use self::handler::DispatchConnectionHandler;
pub use self::router::CommandRouter;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
