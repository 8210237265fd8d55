//! Snapshot persistence
//!
//! Every persist is one full encode followed by two whole-file
//! replacements: the `.bak` copy first, then the primary file. Each file is
//! written to a temporary sibling and renamed into place, so a reader sees
//! either the previous or the new snapshot, never a torn one.

use crate::document::Document;
use crate::error::StoreError;
use invemu_value::Codec;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default inventory file name
pub const DEFAULT_INVENTORY_FILE: &str = "inventory.bin";

/// Outcome of one persist attempt
///
/// Failures are tolerated: the in-memory document stays authoritative and
/// the report records what reached disk.
#[derive(Debug, Clone, Default)]
pub struct PersistReport {
    /// Encoded snapshot; `None` if encoding failed
    pub bytes: Option<Arc<[u8]>>,
    /// Backup file replaced
    pub backup_written: bool,
    /// Primary file replaced
    pub primary_written: bool,
}

impl PersistReport {
    /// Check if the snapshot reached the primary file
    #[inline]
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.primary_written
    }

    /// Encoded size in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.as_ref().map_or(0, |b| b.len())
    }

    /// Check if nothing was encoded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Primary + backup files for one inventory
#[derive(Debug, Clone)]
pub struct Persistence {
    dir: PathBuf,
    file_name: String,
    codec: Arc<dyn Codec>,
}

impl Persistence {
    /// Create persistence under `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>, codec: Arc<dyn Codec>) -> Self {
        Self {
            dir: dir.into(),
            file_name: file_name.into(),
            codec,
        }
    }

    /// Directory holding both files
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Codec used for snapshots
    #[inline]
    #[must_use]
    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    /// Primary file
    #[must_use]
    pub fn primary_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Backup file (`<file>.bak`)
    #[must_use]
    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(format!("{}.bak", self.file_name))
    }

    /// Encode and write a full snapshot, backup first
    ///
    /// Never fails; see [`PersistReport`].
    pub async fn persist(&self, doc: &Document) -> PersistReport {
        let bytes: Arc<[u8]> = match doc.encode(self.codec.as_ref()) {
            Ok(bytes) => bytes.into(),
            Err(err) => {
                warn!(%err, "inventory could not be encoded, changes not saved");
                return PersistReport::default();
            }
        };
        self.write(bytes).await
    }

    /// Write already-encoded bytes, backup first
    pub async fn write(&self, bytes: Arc<[u8]>) -> PersistReport {
        if let Err(err) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(dir = %self.dir.display(), %err, "inventory directory could not be created");
        }

        let backup = self.backup_path();
        let backup_written = match replace_file(&backup, &bytes).await {
            Ok(()) => {
                debug!(path = %backup.display(), "inventory backup written");
                true
            }
            Err(err) => {
                warn!(path = %backup.display(), %err, "could not save an inventory backup");
                false
            }
        };

        let primary = self.primary_path();
        let primary_written = match replace_file(&primary, &bytes).await {
            Ok(()) => {
                debug!(path = %primary.display(), bytes = bytes.len(), "inventory saved");
                true
            }
            Err(err) => {
                warn!(
                    path = %primary.display(),
                    %err,
                    "could not save inventory, recent changes may not be retained"
                );
                false
            }
        };

        PersistReport {
            bytes: Some(bytes),
            backup_written,
            primary_written,
        }
    }

    /// Load the persisted inventory
    ///
    /// Falls back to the backup when the primary file is unreadable or does
    /// not decode. Returns `Ok(None)` when neither file exists.
    ///
    /// # Errors
    /// The primary file's error when neither file yields a document
    pub async fn load(&self) -> Result<Option<Document>, StoreError> {
        let primary = self.primary_path();
        let primary_err = match self.load_file(&primary).await {
            Ok(Some(doc)) => return Ok(Some(doc)),
            Ok(None) => None,
            Err(err) => {
                warn!(path = %primary.display(), %err, "primary inventory unusable, trying backup");
                Some(err)
            }
        };

        match (self.load_file(&self.backup_path()).await, primary_err) {
            (Ok(Some(doc)), _) => {
                warn!("inventory restored from backup");
                Ok(Some(doc))
            }
            (_, Some(err)) => Err(err),
            (Ok(None), None) => Ok(None),
            (Err(err), None) => Err(err),
        }
    }

    async fn load_file(&self, path: &Path) -> Result<Option<Document>, StoreError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::io(path, err)),
        };
        let doc = Document::decode(self.codec.as_ref(), &bytes)?;
        debug!(path = %path.display(), records = doc.len(), "inventory loaded");
        Ok(Some(doc))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Replace `path` with `bytes` via a temporary sibling and rename
///
/// The temporary file is removed again if either step fails.
async fn replace_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = temp_path(path);
    let result = match tokio::fs::write(&tmp, bytes).await {
        Ok(()) => tokio::fs::rename(&tmp, path).await,
        Err(err) => Err(err),
    };
    if result.is_err() {
        if let Err(err) = tokio::fs::remove_file(&tmp).await {
            if err.kind() != ErrorKind::NotFound {
                debug!(path = %tmp.display(), %err, "temporary file left behind");
            }
        }
    }
    result
}
