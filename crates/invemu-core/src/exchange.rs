//! Transport glue
//!
//! Maps intercepted endpoints to store operations and produces encoded
//! bodies for the interception layer to deliver.

use crate::document::Document;
use crate::error::StoreError;
use crate::patch::UpdateRequest;
use crate::response::build_response;
use crate::store::InventoryStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Content type of every emulated response body
pub const BINARY_CONTENT_TYPE: &str = "application/x-ag-binary";

/// Path prefix of intercepted service calls
pub const INVOKE_PREFIX: &str = "/ssc/invoke/";

/// Raw update request dump
pub const REQUEST_DUMP: &str = "kustomize_request.bin";

/// Encoded update response dump
pub const RESPONSE_DUMP: &str = "patched_response_kustomize.bin";

/// Upstream inventory dump
pub const UPSTREAM_DUMP: &str = "inventory_user_original.bin";

/// What the interception layer does with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Sync progression from the upstream body, then answer with the stored inventory
    ServeInventory,
    /// Answer with a patched response envelope
    PatchLoadout,
    /// Drop the request without answering
    Abort,
    /// Answer with an empty body
    Suppress,
    /// Forward untouched
    PassThrough,
}

impl Route {
    /// Classify an intercepted URI by its service name
    #[must_use]
    pub fn classify(uri: &str) -> Self {
        match endpoint(uri) {
            Some("inventory_load") => Self::ServeInventory,
            Some("inventory_kustomize_update_configuration") => Self::PatchLoadout,
            Some("atomic_mapmode_update" | "get_mapmode_progression" | "challenge_points_get_data") => {
                Self::Abort
            }
            Some("inventory_update_experience") => Self::Suppress,
            _ => Self::PassThrough,
        }
    }

    /// Check if the request is answered locally
    #[inline]
    #[must_use]
    pub fn is_intercepted(self) -> bool {
        !matches!(self, Self::PassThrough)
    }
}

/// Service name following [`INVOKE_PREFIX`], without query or fragment
#[must_use]
pub fn endpoint(uri: &str) -> Option<&str> {
    let (_, rest) = uri.split_once(INVOKE_PREFIX)?;
    let name = rest.split(['?', '#']).next().unwrap_or(rest);
    let name = name.trim_end_matches('/');
    (!name.is_empty() && !name.contains('/')).then_some(name)
}

/// Body plus content type ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedResponse {
    /// Encoded bytes
    pub body: Arc<[u8]>,
    /// MIME type
    pub content_type: &'static str,
}

impl EncodedResponse {
    /// Binary body
    #[inline]
    #[must_use]
    pub fn binary(body: impl Into<Arc<[u8]>>) -> Self {
        Self {
            body: body.into(),
            content_type: BINARY_CONTENT_TYPE,
        }
    }

    /// Empty binary body
    #[must_use]
    pub fn empty() -> Self {
        Self::binary(Vec::new())
    }
}

/// Raw byte dumps for debugging sessions
#[derive(Debug, Clone)]
pub struct DebugDumps {
    dir: PathBuf,
}

impl DebugDumps {
    /// Dump into `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Dump directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to `<dir>/<name>`; failures are only logged
    pub async fn write(&self, name: &str, bytes: &[u8]) {
        let path = self.dir.join(name);
        let result = match tokio::fs::create_dir_all(&self.dir).await {
            Ok(()) => tokio::fs::write(&path, bytes).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => debug!(path = %path.display(), bytes = bytes.len(), "debug dump written"),
            Err(err) => warn!(path = %path.display(), %err, "debug dump failed"),
        }
    }
}

impl InventoryStore {
    async fn dump(&self, name: &str, bytes: &[u8]) {
        if let Some(dumps) = self.dumps() {
            dumps.write(name, bytes).await;
        }
    }

    /// Decode, apply and answer an update request
    ///
    /// # Errors
    /// - Decode errors for the request body
    /// - `StoreError::Patch` if the update was rejected
    /// - Encode errors for the response envelope
    pub async fn handle_update_request(&self, bytes: &[u8]) -> Result<EncodedResponse, StoreError> {
        self.dump(REQUEST_DUMP, bytes).await;

        let value = self.codec().decode(bytes)?;
        let request = UpdateRequest::from_value(&value)?;
        if request.is_empty() {
            debug!("update request carries no change");
        }
        let outcome = self.apply_update(&request).await?;

        let identity = self.identity();
        let envelope = build_response(&outcome.changed, identity.account_id());
        let body = self.codec().encode(&envelope)?;
        info!(changed = outcome.changed.len(), bytes = body.len(), "update answered");

        self.dump(RESPONSE_DUMP, &body).await;
        Ok(EncodedResponse::binary(body))
    }

    /// Sync progression from the upstream inventory and answer with ours
    ///
    /// Sync failures are logged; the stored inventory is served regardless.
    pub async fn handle_inventory_load(&self, upstream: &[u8]) -> EncodedResponse {
        self.dump(UPSTREAM_DUMP, upstream).await;

        match Document::decode(self.codec().as_ref(), upstream) {
            Ok(source) => match self.sync_from(&source).await {
                Ok(outcome) if outcome.is_degraded() => {
                    warn!("progression synced but not saved");
                }
                Ok(outcome) => debug!(changed = outcome.value.changed(), "progression sync done"),
                Err(err) => warn!(%err, "progression not synced"),
            },
            Err(err) => warn!(%err, "upstream inventory unreadable, progression not synced"),
        }

        EncodedResponse::binary(self.snapshot_bytes())
    }
}
