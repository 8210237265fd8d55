//! invemu Core - inventory emulation engine
//!
//! Owns the working inventory document of an emulated game session and:
//! - Applies client loadout/favorite updates and builds the response envelope
//! - Migrates favorites and equip identity across a regenerated document
//! - Syncs level and experience from an authoritative snapshot
//! - Remints session-scoped identifiers
//! - Persists full snapshots with a backup copy
//!
//! # Example
//!
//! ```rust,ignore
//! use invemu_core::{InventoryStore, Route, Settings};
//! use invemu_value::TaggedCodec;
//! use std::sync::Arc;
//!
//! # async fn example(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load_or_init("settings.toml".as_ref()).await;
//! let store = InventoryStore::open(settings.store_config(), Arc::new(TaggedCodec::new()), None).await?;
//! store.start_session().await;
//!
//! let uri = "https://k1-api.wbagora.com/ssc/invoke/inventory_kustomize_update_configuration";
//! if Route::classify(uri) == Route::PatchLoadout {
//!     let response = store.handle_update_request(&bytes).await?;
//!     println!("{} bytes as {}", response.body.len(), response.content_type);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Engines
pub mod document;
pub mod identity;
pub mod index;
pub mod migrate;
pub mod patch;
pub mod response;
pub mod sync;

// Lifecycle
pub mod exchange;
pub mod persist;
pub mod settings;
pub mod store;

pub mod error;

// Re-exports for convenience
pub use document::{Document, Record};
pub use error::{DocumentError, PatchError, SettingsError, StoreError, SyncError};
pub use exchange::{DebugDumps, EncodedResponse, Route, BINARY_CONTENT_TYPE};
pub use identity::{randomize, RandomizeOptions, RandomizeReport, SessionIdentity};
pub use index::{classify, find_by_id, find_by_slug, ItemCategory};
pub use migrate::{migrate, MigrationReport};
pub use patch::{apply, LoadoutUpdate, UpdateRequest};
pub use persist::{PersistReport, Persistence};
pub use response::build_response;
pub use settings::Settings;
pub use store::{InventoryStore, PatchOutcome, StoreConfig, WriteOutcome};
pub use sync::{reset_progression, sync_progression, Experience, SyncOutcome};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
