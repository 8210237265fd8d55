//! Session identity minting
//!
//! Each session gets a fresh account identifier so the emulated inventory
//! never carries a fingerprint from an earlier one.

use crate::document::{Document, EQUIPPED_ID, SLOTS};
use crate::index::{position_by_slug, MAP_MODE_SLUG};
use invemu_value::{Navigate, Value, ValuePath};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info, warn};

/// Bytes of entropy in a minted identifier
pub const ID_BYTES: usize = 12;

static MAP_MODE_CHARACTER: Lazy<ValuePath> =
    Lazy::new(|| SLOTS.child("Character").join(&EQUIPPED_ID));
static CHARACTER_LOADOUTS: Lazy<ValuePath> =
    Lazy::new(|| ValuePath::keys(&["data", "characterLoadouts"]));
static LOADOUT_SLOTS: Lazy<ValuePath> = Lazy::new(|| ValuePath::keys(&["slots", "slots"]));

/// 12 bytes from the OS CSPRNG as 24 lowercase hex characters
#[must_use]
pub fn random_id() -> String {
    let mut bytes = [0u8; ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Account identity of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    account_id: String,
}

impl SessionIdentity {
    /// Mint a fresh identity
    #[must_use]
    pub fn generate() -> Self {
        Self {
            account_id: random_id(),
        }
    }

    /// Adopt a known account id
    #[inline]
    #[must_use]
    pub fn from_account_id(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
        }
    }

    /// Account id
    #[inline]
    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }
}

/// What [`randomize`] touches beyond account and transaction ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomizeOptions {
    /// Remint equipped unique ids inside the `MapMode` record
    pub remint_map_mode: bool,
}

impl Default for RandomizeOptions {
    fn default() -> Self {
        Self {
            remint_map_mode: true,
        }
    }
}

/// Counters from one randomize pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RandomizeReport {
    /// New `body.transaction.transaction_id`, if it could be written
    pub transaction_id: Option<String>,
    /// Records whose `account_id` was replaced
    pub records_updated: usize,
    /// Unique ids reminted in the `MapMode` record
    pub map_mode_ids: usize,
}

/// Stamp `identity` onto the document and remint session-scoped ids
pub fn randomize(
    doc: &mut Document,
    identity: &SessionIdentity,
    options: &RandomizeOptions,
) -> RandomizeReport {
    let mut report = RandomizeReport::default();

    let transaction_id = uuid::Uuid::new_v4().to_string();
    match doc.set_transaction_id(&transaction_id) {
        Ok(()) => {
            debug!(%transaction_id, "transaction id reminted");
            report.transaction_id = Some(transaction_id);
        }
        Err(err) => warn!(%err, "transaction id not writable"),
    }

    if let Err(err) = doc.set_account_id(identity.account_id()) {
        warn!(%err, "account id not writable");
    }
    for record in doc.records_mut() {
        if let Some(slot) = record.get_mut("account_id") {
            *slot = Value::from(identity.account_id());
            report.records_updated += 1;
        }
    }

    if options.remint_map_mode {
        report.map_mode_ids = remint_map_mode(doc);
    }

    info!(
        account_id = identity.account_id(),
        records = report.records_updated,
        map_mode_ids = report.map_mode_ids,
        "session identity applied"
    );
    report
}

fn remint_map_mode(doc: &mut Document) -> usize {
    let Some(position) = position_by_slug(doc, MAP_MODE_SLUG) else {
        debug!("no map mode record, nothing to remint");
        return 0;
    };
    let Some(map_mode) = doc.record_mut(position) else {
        return 0;
    };

    let mut reminted = 0;
    match map_mode.resolve_mut(&MAP_MODE_CHARACTER) {
        Ok(slot) => {
            *slot = Value::from(random_id());
            reminted += 1;
        }
        Err(err) => warn!(%err, "map mode character slot not reminted"),
    }

    let loadouts = match map_mode.resolve_mapping_mut(&CHARACTER_LOADOUTS) {
        Ok(loadouts) => loadouts,
        Err(err) => {
            warn!(%err, "map mode loadouts not reminted");
            return reminted;
        }
    };
    for (character, loadout) in loadouts.iter_mut() {
        let buckets = match loadout.resolve_mapping_mut(&LOADOUT_SLOTS) {
            Ok(buckets) => buckets,
            Err(err) => {
                warn!(%character, %err, "map mode loadout skipped");
                continue;
            }
        };
        for (slot, bucket) in buckets.iter_mut() {
            match bucket.resolve_mut(&EQUIPPED_ID) {
                Ok(unique_id) => {
                    *unique_id = Value::from(random_id());
                    reminted += 1;
                }
                Err(err) => warn!(%character, %slot, %err, "map mode slot not reminted"),
            }
        }
    }
    reminted
}
