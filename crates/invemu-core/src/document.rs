//! Inventory document wrapper
//!
//! A [`Document`] owns one root [`Value`] whose `body.response.current_items`
//! sequence holds the inventory records. Record fields are reached through
//! the shared paths below so every access site reports a typed miss or
//! mismatch instead of assuming a shape.

use crate::error::DocumentError;
use invemu_value::{Codec, Mapping, Navigate, PathError, Value, ValuePath};
use once_cell::sync::Lazy;

/// One inventory entity inside `current_items`
pub type Record = Mapping;

pub(crate) static CURRENT_ITEMS: Lazy<ValuePath> =
    Lazy::new(|| ValuePath::keys(&["body", "response", "current_items"]));
pub(crate) static ACCOUNT_ID: Lazy<ValuePath> = Lazy::new(|| ValuePath::keys(&["body", "account_id"]));
pub(crate) static TRANSACTION_ID: Lazy<ValuePath> =
    Lazy::new(|| ValuePath::keys(&["body", "transaction", "transaction_id"]));

/// `data.slots.slots` on a character-like record
pub(crate) static SLOTS: Lazy<ValuePath> = Lazy::new(|| ValuePath::keys(&["data", "slots", "slots"]));
/// `data.bIsFavorite` on any record
pub(crate) static FAVORITE: Lazy<ValuePath> = Lazy::new(|| ValuePath::keys(&["data", "bIsFavorite"]));
/// `data.currentLevel.val` on the profile record
pub(crate) static LEVEL: Lazy<ValuePath> =
    Lazy::new(|| ValuePath::keys(&["data", "currentLevel", "val"]));
/// `data.experience.val` on the profile record
pub(crate) static EXPERIENCE: Lazy<ValuePath> =
    Lazy::new(|| ValuePath::keys(&["data", "experience", "val"]));

/// `items.0.uniqueId` inside an equip slot bucket
pub(crate) static EQUIPPED_ID: Lazy<ValuePath> =
    Lazy::new(|| ValuePath::keys(&["items"]).index(0).child("uniqueId"));
/// `randomizeType` inside an equip slot bucket
pub(crate) static RANDOMIZE_TYPE: Lazy<ValuePath> = Lazy::new(|| ValuePath::keys(&["randomizeType"]));

/// Randomize mode given to freshly created buckets
pub const DEFAULT_RANDOMIZE_TYPE: &str = "None";

/// Inventory document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Value,
}

impl Document {
    /// Wrap a decoded root
    ///
    /// # Errors
    /// `DocumentError::Shape` if the root has no `body.response.current_items`
    /// sequence
    pub fn from_value(root: Value) -> Result<Self, DocumentError> {
        root.resolve_sequence(&CURRENT_ITEMS)?;
        Ok(Self { root })
    }

    /// Decode and wrap
    ///
    /// # Errors
    /// Codec errors or shape errors
    pub fn decode(codec: &dyn Codec, bytes: &[u8]) -> Result<Self, DocumentError> {
        Self::from_value(codec.decode(bytes)?)
    }

    /// Encode the full root
    ///
    /// # Errors
    /// Codec errors
    pub fn encode(&self, codec: &dyn Codec) -> Result<Vec<u8>, DocumentError> {
        Ok(codec.encode(&self.root)?)
    }

    /// Root value
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Unwrap into the root value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        self.root
    }

    fn items(&self) -> &[Value] {
        self.root.resolve_sequence(&CURRENT_ITEMS).unwrap_or(&[])
    }

    fn items_mut(&mut self) -> Option<&mut Vec<Value>> {
        self.root
            .resolve_mut(&CURRENT_ITEMS)
            .ok()
            .and_then(Value::as_sequence_mut)
    }

    /// Number of entries in `current_items`, records or not
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items().len()
    }

    /// Check if `current_items` is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Records with their position in `current_items`
    ///
    /// Entries that are not mappings are skipped.
    pub fn records(&self) -> impl Iterator<Item = (usize, &Record)> + '_ {
        self.items()
            .iter()
            .enumerate()
            .filter_map(|(position, item)| match item.as_mapping() {
                Some(record) => Some((position, record)),
                None => {
                    tracing::debug!(position, kind = %item.kind(), "skipping non-record entry");
                    None
                }
            })
    }

    /// Mutable records in array order
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut Record> + '_ {
        self.items_mut()
            .into_iter()
            .flatten()
            .filter_map(Value::as_mapping_mut)
    }

    /// Record at a position
    #[must_use]
    pub fn record(&self, position: usize) -> Option<&Record> {
        self.items().get(position).and_then(Value::as_mapping)
    }

    /// Mutable record at a position
    pub fn record_mut(&mut self, position: usize) -> Option<&mut Record> {
        self.items_mut()
            .and_then(|items| items.get_mut(position))
            .and_then(Value::as_mapping_mut)
    }

    /// Session account id in `body.account_id`
    #[must_use]
    pub fn account_id(&self) -> Option<&str> {
        self.root.resolve_str(&ACCOUNT_ID).ok()
    }

    /// Overwrite `body.account_id`
    ///
    /// # Errors
    /// `PathError` if `body` is not a mapping
    pub fn set_account_id(&mut self, account_id: &str) -> Result<(), PathError> {
        self.root.assign(&ACCOUNT_ID, Value::from(account_id))?;
        Ok(())
    }

    /// Transaction id in `body.transaction.transaction_id`
    #[must_use]
    pub fn transaction_id(&self) -> Option<&str> {
        self.root.resolve_str(&TRANSACTION_ID).ok()
    }

    /// Overwrite `body.transaction.transaction_id`
    ///
    /// # Errors
    /// `PathError` if `body.transaction` is missing or not a mapping
    pub fn set_transaction_id(&mut self, transaction_id: &str) -> Result<(), PathError> {
        self.root.assign(&TRANSACTION_ID, Value::from(transaction_id))?;
        Ok(())
    }
}

/// `id` of a record
#[inline]
#[must_use]
pub fn record_id(record: &Record) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// `item_slug` of a record
#[inline]
#[must_use]
pub fn record_slug(record: &Record) -> Option<&str> {
    record.get("item_slug").and_then(Value::as_str)
}

/// Check if `data.bIsFavorite` is set
#[must_use]
pub fn is_favorite(record: &Record) -> bool {
    matches!(record.resolve(&FAVORITE), Ok(Value::Bool(true)))
}

/// Equip slot buckets (`data.slots.slots`) of a character-like record
///
/// # Errors
/// `PathError::Missing` for records without slots, `PathError::TypeMismatch`
/// if any level is not a mapping
pub fn equip_slots(record: &Record) -> Result<&Mapping, PathError> {
    record.resolve_mapping(&SLOTS)
}

/// Mutable equip slot buckets
///
/// # Errors
/// Same as [`equip_slots`]
pub fn equip_slots_mut(record: &mut Record) -> Result<&mut Mapping, PathError> {
    record.resolve_mapping_mut(&SLOTS)
}

/// Unique id equipped in a bucket (index 0 only)
///
/// # Errors
/// `PathError` if the bucket has no first item with a text `uniqueId`
pub fn equipped_id(bucket: &Value) -> Result<&str, PathError> {
    bucket.resolve_str(&EQUIPPED_ID)
}

/// Fresh equip slot bucket holding one item
#[must_use]
pub fn new_equip_slot(unique_id: &str, randomize_type: Value) -> Value {
    let mut item = Mapping::with_capacity(1);
    item.insert("uniqueId".to_string(), Value::from(unique_id));
    let mut bucket = Mapping::with_capacity(2);
    bucket.insert("items".to_string(), Value::Sequence(vec![Value::Mapping(item)]));
    bucket.insert("randomizeType".to_string(), randomize_type);
    Value::Mapping(bucket)
}
