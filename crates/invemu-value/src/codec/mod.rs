//! Codec seam for the self-describing container format
//!
//! Documents are persisted and transported as opaque bytes. Everything in
//! the workspace that needs bytes goes through a [`Codec`]; the bundled
//! [`TaggedCodec`] is one implementation.

mod primitives;
mod tagged;

pub use tagged::{Limits, TaggedCodec};

use crate::value::Value;
use std::fmt::Debug;

/// Encode/decode of whole [`Value`] trees
///
/// Implementations must round-trip every constructible value:
/// `decode(encode(v)) == v`, integer widths and mapping order included.
pub trait Codec: Send + Sync + Debug {
    /// Encode a full value tree
    ///
    /// # Errors
    /// Returns error if the value cannot be represented
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    /// Decode a full value tree
    ///
    /// # Errors
    /// Returns error if the bytes are malformed
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// Errors during container encoding/decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Input ended early
    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    /// Missing or wrong header
    #[error("invalid magic bytes: found {found:02x?}")]
    InvalidMagic { found: Vec<u8> },

    /// Unknown value tag
    #[error("unknown value tag 0x{tag:02x} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },

    /// Text is not UTF-8
    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    /// Varint longer than 64 bits
    #[error("varint too long while reading {context}")]
    VarintTooLong { context: &'static str },

    /// Declared length over limit
    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Nesting too deep
    #[error("nesting depth exceeds maximum {max}")]
    DepthExceeded { max: usize },

    /// Mapping key repeated
    #[error("duplicate mapping key: {key}")]
    DuplicateKey { key: String },

    /// Date-time out of range
    #[error("date-time out of range: {seconds}s + {nanos}ns")]
    InvalidDateTime { seconds: i64, nanos: u32 },

    /// Bytes left over after the root value
    #[error("{count} trailing bytes after root value")]
    TrailingBytes { count: usize },
}
