//! Error types for invemu core
//!
//! One enum per concern:
//! - Document shape violations
//! - Update request parsing and fail-closed patch aborts
//! - Progression sync failures
//! - Store lifecycle and I/O
//! - Settings file handling

use invemu_value::{CodecError, PathError, ValueKind};
use std::path::PathBuf;

/// Document shape errors
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Root does not carry the expected record sequence
    #[error("invalid document shape: {0}")]
    Shape(#[from] PathError),

    /// Bytes could not be decoded or encoded
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Patch engine errors
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// A slot item or favorite id does not resolve in the document
    #[error("unknown item id: {id}")]
    UnknownItem {
        /// The unresolved id
        id: String,
    },

    /// Update request has the wrong shape
    #[error("malformed update request: {0}")]
    MalformedRequest(#[from] PathError),
}

impl PatchError {
    /// Check if the whole update was rejected because of an unknown id
    #[inline]
    #[must_use]
    pub fn is_unknown_item(&self) -> bool {
        matches!(self, Self::UnknownItem { .. })
    }
}

/// Progression sync errors
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Experience is neither a 16-bit nor a 32-bit unsigned value
    #[error("unrecognized numeric encoding for experience: found {found}")]
    UnrecognizedNumericEncoding {
        /// Kind that was stored instead
        found: ValueKind,
    },

    /// Profile record lacks an expected field or has the wrong kind
    #[error("profile shape invalid: {0}")]
    Profile(#[from] PathError),
}

/// Store lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Neither a persisted inventory nor bootstrap bytes were available
    #[error("no inventory at {path} and no bootstrap snapshot supplied")]
    NoInventory {
        /// Primary file that was probed
        path: PathBuf,
    },

    /// Filesystem failure
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding failed
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Decoded document has the wrong shape
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Update rejected
    #[error("patch failed: {0}")]
    Patch(#[from] PatchError),

    /// Progression sync rejected
    #[error("sync failed: {0}")]
    Sync(#[from] SyncError),
}

impl StoreError {
    /// Wrap an I/O error with the path it concerns
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Settings file errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("settings I/O error at {path}: {source}")]
    Io {
        /// Settings file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for [`crate::Settings`]
    #[error("settings parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Settings could not be rendered
    #[error("settings serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_item_display() {
        let err = PatchError::UnknownItem {
            id: "doesNotExist".to_string(),
        };
        assert!(err.to_string().contains("doesNotExist"));
        assert!(err.is_unknown_item());
    }

    #[test]
    fn store_error_wraps_patch() {
        let err: StoreError = PatchError::UnknownItem { id: "x".into() }.into();
        assert!(matches!(err, StoreError::Patch(_)));
    }

    #[test]
    fn sync_error_names_kind() {
        let err = SyncError::UnrecognizedNumericEncoding {
            found: ValueKind::Text,
        };
        assert!(err.to_string().ends_with("found text"));
    }
}
