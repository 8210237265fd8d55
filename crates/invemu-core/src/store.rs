//! Inventory store
//!
//! Owns the working document for the process lifetime. Every mutating
//! entry point takes the single-writer lock and holds it until persistence
//! has completed or failed, so two mutations never interleave their backup
//! and primary writes.

use crate::document::{Document, Record};
use crate::error::StoreError;
use crate::exchange::DebugDumps;
use crate::identity::{randomize, RandomizeOptions, RandomizeReport, SessionIdentity};
use crate::migrate::{migrate, MigrationReport};
use crate::patch::{apply, UpdateRequest};
use crate::persist::{PersistReport, Persistence, DEFAULT_INVENTORY_FILE};
use crate::sync::{reset_progression, sync_progression, SyncOutcome};
use invemu_value::Codec;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory for the primary and backup files
    pub data_dir: PathBuf,
    /// Primary file name
    pub inventory_file: String,
    /// Session randomization options
    pub randomize: RandomizeOptions,
    /// Directory for raw request/response dumps; `None` disables dumping
    pub debug_dir: Option<PathBuf>,
}

impl StoreConfig {
    /// Default configuration under `data_dir`
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            inventory_file: DEFAULT_INVENTORY_FILE.to_string(),
            randomize: RandomizeOptions::default(),
            debug_dir: None,
        }
    }

    /// Set the primary file name
    #[must_use]
    pub fn with_inventory_file(mut self, file: impl Into<String>) -> Self {
        self.inventory_file = file.into();
        self
    }

    /// Set randomization options
    #[must_use]
    pub fn with_randomize(mut self, options: RandomizeOptions) -> Self {
        self.randomize = options;
        self
    }

    /// Enable debug dumps into `dir`
    #[must_use]
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }
}

/// Result of an applied update
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    /// Changed records, character first, then favorites in request order
    pub changed: Vec<Record>,
    /// What reached disk
    pub persist: PersistReport,
}

/// Result of a write that may not change anything
#[derive(Debug, Clone)]
pub struct WriteOutcome<T> {
    /// Engine result
    pub value: T,
    /// What reached disk; `None` when nothing was written
    pub persist: Option<PersistReport>,
}

impl<T> WriteOutcome<T> {
    /// Check if the logical change happened but did not reach the primary file
    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.persist.as_ref().is_some_and(|p| !p.is_durable())
    }
}

/// Working inventory plus its persistence
#[derive(Debug)]
pub struct InventoryStore {
    document: Mutex<Document>,
    snapshot: RwLock<Arc<[u8]>>,
    persistence: Persistence,
    identity: RwLock<SessionIdentity>,
    options: RandomizeOptions,
    dumps: Option<DebugDumps>,
}

impl InventoryStore {
    /// Load the persisted inventory, or adopt `bootstrap` on first run
    ///
    /// Bootstrap bytes are persisted immediately.
    ///
    /// # Errors
    /// - `StoreError::NoInventory` if nothing is persisted and no bootstrap
    ///   bytes are given
    /// - Decode or I/O errors from loading
    pub async fn open(
        config: StoreConfig,
        codec: Arc<dyn Codec>,
        bootstrap: Option<Vec<u8>>,
    ) -> Result<Self, StoreError> {
        let persistence = Persistence::new(&config.data_dir, config.inventory_file, codec);

        let (document, snapshot) = match persistence.load().await? {
            Some(doc) => {
                let bytes: Arc<[u8]> = doc.encode(persistence.codec().as_ref())?.into();
                info!(records = doc.len(), "inventory loaded");
                (doc, bytes)
            }
            None => {
                let Some(bytes) = bootstrap else {
                    return Err(StoreError::NoInventory {
                        path: persistence.primary_path(),
                    });
                };
                let doc = Document::decode(persistence.codec().as_ref(), &bytes)?;
                info!(records = doc.len(), "first run, adopting bootstrap inventory");
                let report = persistence.persist(&doc).await;
                let snapshot = report.bytes.unwrap_or_else(|| bytes.into());
                (doc, snapshot)
            }
        };

        let identity = document
            .account_id()
            .map_or_else(SessionIdentity::generate, SessionIdentity::from_account_id);

        Ok(Self {
            document: Mutex::new(document),
            snapshot: RwLock::new(snapshot),
            persistence,
            identity: RwLock::new(identity),
            options: config.randomize,
            dumps: config.debug_dir.map(DebugDumps::new),
        })
    }

    /// Codec used for snapshots and transport
    #[inline]
    #[must_use]
    pub fn codec(&self) -> &Arc<dyn Codec> {
        self.persistence.codec()
    }

    /// Persistence paths
    #[inline]
    #[must_use]
    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    /// Current session identity
    #[must_use]
    pub fn identity(&self) -> SessionIdentity {
        self.identity.read().clone()
    }

    /// Last encoded snapshot
    #[must_use]
    pub fn snapshot_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.snapshot.read())
    }

    pub(crate) fn dumps(&self) -> Option<&DebugDumps> {
        self.dumps.as_ref()
    }

    /// Run `f` against the working document
    pub async fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        let doc = self.document.lock().await;
        f(&*doc)
    }

    async fn commit(&self, doc: &Document) -> PersistReport {
        let report = self.persistence.persist(doc).await;
        if let Some(bytes) = &report.bytes {
            *self.snapshot.write() = Arc::clone(bytes);
        }
        report
    }

    /// Mint a fresh session identity, stamp it and persist
    pub async fn start_session(&self) -> WriteOutcome<RandomizeReport> {
        let mut doc = self.document.lock().await;
        let identity = SessionIdentity::generate();
        let report = randomize(&mut doc, &identity, &self.options);
        *self.identity.write() = identity;
        let persist = self.commit(&doc).await;
        WriteOutcome {
            value: report,
            persist: Some(persist),
        }
    }

    /// Apply a client update and persist
    ///
    /// # Errors
    /// `StoreError::Patch` if the update was rejected; nothing is mutated or
    /// persisted in that case
    pub async fn apply_update(&self, request: &UpdateRequest) -> Result<PatchOutcome, StoreError> {
        let mut doc = self.document.lock().await;
        let changed = apply(&mut doc, request)?;
        debug!(changed = changed.len(), "update applied");
        let persist = self.commit(&doc).await;
        Ok(PatchOutcome { changed, persist })
    }

    /// Copy progression from an authoritative snapshot
    ///
    /// Persists only when the profile changed.
    ///
    /// # Errors
    /// `StoreError::Sync` if the source cannot be read; nothing is mutated
    pub async fn sync_from(&self, source: &Document) -> Result<WriteOutcome<SyncOutcome>, StoreError> {
        let mut doc = self.document.lock().await;
        let value = sync_progression(&mut doc, source)?;
        self.finish_progression(&doc, value).await
    }

    /// Reset the working profile to level 0
    ///
    /// # Errors
    /// `StoreError::Sync` if the profile is malformed
    pub async fn reset_progression(&self) -> Result<WriteOutcome<SyncOutcome>, StoreError> {
        let mut doc = self.document.lock().await;
        let value = reset_progression(&mut doc)?;
        self.finish_progression(&doc, value).await
    }

    async fn finish_progression(
        &self,
        doc: &Document,
        value: SyncOutcome,
    ) -> Result<WriteOutcome<SyncOutcome>, StoreError> {
        let persist = if value.changed() {
            Some(self.commit(doc).await)
        } else {
            None
        };
        Ok(WriteOutcome { value, persist })
    }

    /// Replace the working document with a regenerated one
    ///
    /// Favorites and equip identity are migrated first; the result is
    /// persisted once.
    pub async fn regenerate(&self, new: Document) -> WriteOutcome<MigrationReport> {
        let mut doc = self.document.lock().await;
        let (migrated, report) = migrate(&doc, new);
        *doc = migrated;
        let persist = self.commit(&doc).await;
        if !persist.is_durable() {
            warn!("regenerated inventory kept in memory only");
        }
        WriteOutcome {
            value: report,
            persist: Some(persist),
        }
    }
}
