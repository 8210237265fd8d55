//! Client update application
//!
//! [`apply`] stages every change on copies of the affected records and only
//! writes them back once the whole request has resolved. An unknown slot
//! item or favorite id therefore rejects the update with the document
//! untouched.

use crate::document::{
    equip_slots_mut, new_equip_slot, Document, Record, DEFAULT_RANDOMIZE_TYPE, EQUIPPED_ID,
    FAVORITE, RANDOMIZE_TYPE,
};
use crate::error::PatchError;
use crate::index::{find_by_id, position_by_id, ItemCategory};
use indexmap::IndexMap;
use invemu_value::{Mapping, Navigate, PathError, Value, ValueKind, ValuePath};
use tracing::{debug, error, warn};

/// One loadout change for a character
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadoutUpdate {
    /// Character record id
    pub unique_id: String,
    /// Item ids to equip, in request order
    pub slot_items: Vec<String>,
    /// Slot type to randomize mode
    pub randomize_types: IndexMap<String, String>,
}

/// Transient change-set submitted by the client
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateRequest {
    /// Loadout changes (zero or one entry is meaningful)
    pub update_loadout: Vec<LoadoutUpdate>,
    /// Record id to favorite flag
    pub is_favorite: IndexMap<String, bool>,
}

impl UpdateRequest {
    /// Parse a decoded request root
    ///
    /// Absent `update_loadout`/`is_favorite` mean "no change".
    ///
    /// # Errors
    /// `PatchError::MalformedRequest` for any field of the wrong kind
    pub fn from_value(value: &Value) -> Result<Self, PatchError> {
        let root = value
            .as_mapping()
            .ok_or_else(|| mismatch(&ValuePath::root(), ValueKind::Mapping, value))?;

        let update_loadout = match optional(root, "update_loadout") {
            Some(entries) => {
                let path = ValuePath::keys(&["update_loadout"]);
                expect_sequence(entries, &path)?
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| LoadoutUpdate::from_value(entry, &path.index(i)))
                    .collect::<Result<_, _>>()?
            }
            None => Vec::new(),
        };

        let is_favorite = match optional(root, "is_favorite") {
            Some(flags) => {
                let path = ValuePath::keys(&["is_favorite"]);
                expect_mapping(flags, &path)?
                    .iter()
                    .map(|(id, flag)| match flag {
                        Value::Bool(b) => Ok((id.clone(), *b)),
                        other => Err(mismatch(&path.child(id.as_str()), ValueKind::Bool, other)),
                    })
                    .collect::<Result<_, _>>()?
            }
            None => IndexMap::new(),
        };

        Ok(Self {
            update_loadout,
            is_favorite,
        })
    }

    /// Check if the request carries no change at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.update_loadout.is_empty() && self.is_favorite.is_empty()
    }
}

impl LoadoutUpdate {
    fn from_value(value: &Value, path: &ValuePath) -> Result<Self, PatchError> {
        let entry = expect_mapping(value, path)?;
        let id_path = path.child("unique_id");
        let unique_id = match entry.get("unique_id") {
            Some(Value::Text(id)) => id.clone(),
            Some(other) => return Err(mismatch(&id_path, ValueKind::Text, other)),
            None => return Err(missing(&id_path)),
        };

        let mut update = Self {
            unique_id,
            ..Self::default()
        };
        let Some(differences) = optional(entry, "differences") else {
            return Ok(update);
        };
        let diff_path = path.child("differences");
        let differences = expect_mapping(differences, &diff_path)?;

        if let Some(items) = optional(differences, "slotitem") {
            let items_path = diff_path.child("slotitem");
            update.slot_items = expect_sequence(items, &items_path)?
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Text(id) => Ok(id.clone()),
                    other => Err(mismatch(&items_path.index(i), ValueKind::Text, other)),
                })
                .collect::<Result<_, _>>()?;
        }

        if let Some(modes) = optional(differences, "itemslotrandomizetype") {
            let modes_path = diff_path.child("itemslotrandomizetype");
            update.randomize_types = expect_mapping(modes, &modes_path)?
                .iter()
                .map(|(slot, mode)| match mode {
                    Value::Text(m) => Ok((slot.clone(), m.clone())),
                    other => Err(mismatch(&modes_path.child(slot.as_str()), ValueKind::Text, other)),
                })
                .collect::<Result<_, _>>()?;
        }

        Ok(update)
    }
}

fn optional<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn expect_mapping<'a>(value: &'a Value, path: &ValuePath) -> Result<&'a Mapping, PatchError> {
    value
        .as_mapping()
        .ok_or_else(|| mismatch(path, ValueKind::Mapping, value))
}

fn expect_sequence<'a>(value: &'a Value, path: &ValuePath) -> Result<&'a [Value], PatchError> {
    value
        .as_sequence()
        .ok_or_else(|| mismatch(path, ValueKind::Sequence, value))
}

fn mismatch(path: &ValuePath, expected: ValueKind, found: &Value) -> PatchError {
    PatchError::MalformedRequest(PathError::TypeMismatch {
        path: path.to_string(),
        expected,
        found: found.kind(),
    })
}

fn missing(path: &ValuePath) -> PatchError {
    PatchError::MalformedRequest(PathError::Missing {
        path: path.to_string(),
        segment: path.last().map(ToString::to_string).unwrap_or_default(),
    })
}

/// Apply a client update to the working document
///
/// Returns the changed records in response order: the character first when
/// its loadout was touched, then favorited records in request order. Records
/// are cloned after every change has been written.
///
/// # Errors
/// `PatchError::UnknownItem` when a slot item (of a resolved character) or a
/// favorite id is not in the document. Nothing is mutated in that case.
pub fn apply(doc: &mut Document, request: &UpdateRequest) -> Result<Vec<Record>, PatchError> {
    let mut staged: IndexMap<usize, Record> = IndexMap::new();
    let mut order = Vec::new();

    if request.update_loadout.len() > 1 {
        warn!(
            entries = request.update_loadout.len(),
            "only the first loadout update is applied"
        );
    }
    if let Some(update) = request.update_loadout.first() {
        if let Some((position, character)) = stage_loadout(doc, update)? {
            staged.insert(position, character);
            order.push(position);
        }
    }

    for (id, flag) in &request.is_favorite {
        let position = position_by_id(doc, id).ok_or_else(|| {
            error!(item = %id, "favorite target not found, update rejected");
            PatchError::UnknownItem { id: id.clone() }
        })?;
        let Some(mut record) = staged
            .get(&position)
            .or_else(|| doc.record(position))
            .cloned()
        else {
            continue;
        };
        match record.assign(&FAVORITE, Value::Bool(*flag)) {
            Ok(_) => {
                debug!(item = %id, favorite = flag, "favorite staged");
                staged.insert(position, record);
                order.push(position);
            }
            Err(err) => warn!(item = %id, %err, "favorite skipped"),
        }
    }

    for (position, record) in staged {
        if let Some(slot) = doc.record_mut(position) {
            *slot = record;
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|position| doc.record(position).cloned())
        .collect())
}

/// Resolve the character and its slot items, then stage the new loadout
fn stage_loadout(
    doc: &Document,
    update: &LoadoutUpdate,
) -> Result<Option<(usize, Record)>, PatchError> {
    let Some(position) = position_by_id(doc, &update.unique_id) else {
        warn!(character = %update.unique_id, "character not found, loadout skipped");
        return Ok(None);
    };

    let mut assignments = Vec::with_capacity(update.slot_items.len());
    for item_id in &update.slot_items {
        let item = find_by_id(doc, item_id).ok_or_else(|| {
            error!(item = %item_id, "slot item not found, update rejected");
            PatchError::UnknownItem {
                id: item_id.clone(),
            }
        })?;
        let category = ItemCategory::of_record(item);
        match category.slot_key() {
            Some(slot) => {
                debug!(item = %item_id, %category, "slot item resolved");
                assignments.push((slot, item_id.as_str()));
            }
            None => warn!(item = %item_id, "slot item has no equip category, skipped"),
        }
    }

    let Some(mut character) = doc.record(position).cloned() else {
        return Ok(None);
    };
    match write_loadout(&mut character, &assignments, &update.randomize_types) {
        Ok(()) => Ok(Some((position, character))),
        Err(err) => {
            error!(character = %update.unique_id, %err, "loadout skipped");
            Ok(None)
        }
    }
}

fn write_loadout(
    character: &mut Record,
    assignments: &[(&str, &str)],
    randomize_types: &IndexMap<String, String>,
) -> Result<(), PathError> {
    let slots = equip_slots_mut(character)?;

    for (slot, item_id) in assignments {
        match slots.get_mut(*slot) {
            Some(bucket) => {
                bucket.assign(&EQUIPPED_ID, Value::from(*item_id))?;
                debug!(%slot, item = %item_id, "equipped item replaced");
            }
            None => {
                slots.insert(
                    (*slot).to_string(),
                    new_equip_slot(item_id, Value::from(DEFAULT_RANDOMIZE_TYPE)),
                );
                debug!(%slot, item = %item_id, "equip slot created");
            }
        }
    }

    for (slot, mode) in randomize_types {
        match slots.get_mut(slot) {
            Some(bucket) => {
                bucket.assign(&RANDOMIZE_TYPE, Value::from(mode.as_str()))?;
                debug!(%slot, %mode, "randomize type set");
            }
            None => warn!(%slot, %mode, "randomize type names a missing slot, skipped"),
        }
    }

    Ok(())
}
