//! Wire model and codec shared by both ends of the command bridge.
//!
//! A request is a single JSON document naming a command and its parameters:
//!
//! ```json
//! {"type":"set_tempo","params":{"tempo":128.0}}
//! ```
//!
//! The host answers every request with exactly one response document:
//!
//! ```json
//! {"status":"success","result":{"tempo":128.0}}
//! {"status":"error","message":"Unknown command: frobnicate"}
//! ```
//!
//! Documents carry no length prefix or delimiter. A receiver accumulates bytes
//! and re-attempts a parse until one document is complete; see [`codec`].

pub mod codec;
mod message;

pub use codec::{CodecError, Decoded, FrameDecoder, decode, encode};
pub use message::{Params, ProtocolError, Request, Response};
