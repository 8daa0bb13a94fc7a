//! Parse-attempt framing for JSON documents.
//!
//! The channel has no length prefix and no delimiter. A receiver appends each
//! socket read to a buffer and asks [`decode`] whether the front of the buffer
//! holds a complete document. Three outcomes are possible: a complete
//! document, an incomplete one that needs more bytes, or bytes that can never
//! form a valid document.
//!
//! A buffer that ends part way through a multi-byte UTF-8 sequence is always
//! inside a string literal, so it reports as incomplete rather than malformed.

use serde::Serialize;
use serde_json::{Deserializer, Value};
use thiserror::Error;

/// Result of a single parse attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// One document was parsed from the front of the buffer.
    Complete {
        /// The parsed document.
        value: Value,
        /// Bytes consumed, including any leading whitespace.
        consumed: usize,
    },
    /// More bytes are required.
    Incomplete,
}

/// Errors raised while framing documents.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Buffered bytes are not valid JSON and never will be.
    #[error("malformed message: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },
    /// Buffered bytes grew past the configured limit without completing.
    #[error("message too large: {size} bytes exceeds {limit} byte limit")]
    Oversized { size: usize, limit: usize },
    /// A value could not be serialised.
    #[error("failed to encode message: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}

/// Serialises a message as a single compact JSON document.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] when serialisation fails.
pub fn encode<T>(message: &T) -> Result<Vec<u8>, CodecError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_vec(message).map_err(|source| CodecError::Encode { source })
}

/// Attempts to parse one document from the front of `bytes`.
///
/// Empty and whitespace-only buffers are incomplete. Bytes after the first
/// document are left for the next attempt.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] when a syntax error occurs before the end
/// of the buffer.
pub fn decode(bytes: &[u8]) -> Result<Decoded, CodecError> {
    let mut stream = Deserializer::from_slice(bytes).into_iter::<Value>();
    match stream.next() {
        None => Ok(Decoded::Incomplete),
        Some(Ok(value)) => Ok(Decoded::Complete {
            value,
            consumed: stream.byte_offset(),
        }),
        Some(Err(error)) if error.is_eof() => Ok(Decoded::Incomplete),
        Some(Err(source)) => Err(CodecError::Malformed { source }),
    }
}

/// Accumulates socket reads and yields complete documents.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    limit: usize,
}

impl FrameDecoder {
    /// Builds a decoder that refuses to buffer more than `limit` bytes.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            limit,
        }
    }

    /// Appends freshly read bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Oversized`] when the buffer would exceed the
    /// limit.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), CodecError> {
        let size = self.buffer.len().saturating_add(chunk.len());
        if size > self.limit {
            return Err(CodecError::Oversized {
                size,
                limit: self.limit,
            });
        }
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    /// Removes and returns the next complete document, if one is buffered.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Malformed`] when the buffered bytes cannot form a
    /// document.
    pub fn next_frame(&mut self) -> Result<Option<Value>, CodecError> {
        match decode(&self.buffer)? {
            Decoded::Complete { value, consumed } => {
                self.buffer.drain(..consumed);
                Ok(Some(value))
            }
            Decoded::Incomplete => Ok(None),
        }
    }

    /// Number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` when nothing but whitespace is buffered.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}
