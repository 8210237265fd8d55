//! invemu Value Model
//!
//! Recursive tagged values, typed navigation and the container codec seam.
//!
//! # Core Concepts
//!
//! - [`Value`]: Recursive tagged variant every inventory document is built from
//! - [`Mapping`]: Insertion-ordered text-keyed map (stable re-encoding)
//! - [`ValuePath`]: Dotted path that resolves to a typed miss/mismatch error
//! - [`Navigate`]: Path resolution over a [`Value`] or a bare [`Mapping`]
//! - [`Codec`]: Encode/decode seam for the self-describing container format
//! - [`TaggedCodec`]: Bundled binary implementation of [`Codec`]
//!
//! # Example
//!
//! ```rust
//! use invemu_value::{Mapping, Navigate, Value, ValuePath};
//!
//! let mut data = Mapping::new();
//! data.insert("bIsFavorite".to_string(), Value::Bool(true));
//! let mut record = Mapping::new();
//! record.insert("data".to_string(), Value::Mapping(data));
//! let record = Value::Mapping(record);
//!
//! let path: ValuePath = "data.bIsFavorite".parse().unwrap();
//! assert_eq!(record.resolve(&path).unwrap(), &Value::Bool(true));
//! ```

#![warn(unreachable_pub)]

mod path;
mod value;

/// Container codec seam and bundled implementation
pub mod codec;

pub use codec::{Codec, CodecError, TaggedCodec};
pub use path::{Navigate, PathError, Segment, ValuePath};
pub use value::{Mapping, Value, ValueKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
