//! Carry user state across a document regeneration
//!
//! Record ids are re-minted whenever the inventory is regenerated, so the
//! old document's favorites and equipped items are re-anchored in the new
//! one by `item_slug`. The `MapMode` record is never consulted.

use crate::document::{
    equip_slots, equip_slots_mut, equipped_id, is_favorite, new_equip_slot, record_id,
    record_slug, Document, DEFAULT_RANDOMIZE_TYPE, EQUIPPED_ID, FAVORITE, RANDOMIZE_TYPE,
};
use crate::index::{find_by_id, find_by_slug, position_by_slug, MAP_MODE_SLUG};
use invemu_value::{Navigate, PathError, Value};
use tracing::{debug, info, warn};

/// Counters from one migration pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Favorite flags set in the new document
    pub favorites_carried: usize,
    /// Equip slots re-anchored in the new document
    pub slots_carried: usize,
    /// Equip slots that could not be resolved
    pub slots_skipped: usize,
}

/// Equip slot resolved against the new document
struct Carry {
    slot: String,
    item_id: String,
    randomize_type: Option<Value>,
}

/// Migrate favorites and equip identity from `old` into `new`
///
/// `new` is returned as the canonical replacement; `old` is only read.
#[must_use]
pub fn migrate(old: &Document, mut new: Document) -> (Document, MigrationReport) {
    let mut report = MigrationReport::default();

    for (_, record) in old.records() {
        let Some(slug) = record_slug(record) else {
            debug!(id = ?record_id(record), "record without slug skipped");
            continue;
        };
        if slug == MAP_MODE_SLUG {
            debug!("map mode settings are not migrated");
            continue;
        }

        if is_favorite(record) {
            carry_favorite(&mut new, slug, &mut report);
        }

        let slots = match equip_slots(record) {
            Ok(slots) if !slots.is_empty() => slots,
            Ok(_) => continue,
            Err(err) if err.is_missing() => continue,
            Err(err) => {
                warn!(%slug, %err, "equip slots unreadable, skipped");
                continue;
            }
        };

        let Some(target) = position_by_slug(&new, slug) else {
            warn!(%slug, slots = slots.len(), "character missing from new inventory");
            report.slots_skipped += slots.len();
            continue;
        };

        let mut carries = Vec::with_capacity(slots.len());
        for (slot, bucket) in slots {
            match resolve_carry(old, &new, slot, bucket) {
                Some(carry) => carries.push(carry),
                None => report.slots_skipped += 1,
            }
        }

        let Some(character) = new.record_mut(target) else {
            report.slots_skipped += carries.len();
            continue;
        };
        let new_slots = match equip_slots_mut(character) {
            Ok(slots) => slots,
            Err(err) => {
                warn!(%slug, %err, "equip slots missing in new inventory");
                report.slots_skipped += carries.len();
                continue;
            }
        };

        for carry in carries {
            let written = match new_slots.get_mut(&carry.slot) {
                Some(bucket) => write_carry(bucket, &carry),
                None => {
                    let mode = carry
                        .randomize_type
                        .clone()
                        .unwrap_or_else(|| Value::from(DEFAULT_RANDOMIZE_TYPE));
                    new_slots.insert(carry.slot.clone(), new_equip_slot(&carry.item_id, mode));
                    Ok(())
                }
            };
            match written {
                Ok(()) => {
                    debug!(%slug, slot = %carry.slot, item = %carry.item_id, "equip slot carried");
                    report.slots_carried += 1;
                }
                Err(err) => {
                    warn!(%slug, slot = %carry.slot, %err, "equip slot not writable, skipped");
                    report.slots_skipped += 1;
                }
            }
        }
    }

    info!(
        favorites = report.favorites_carried,
        slots = report.slots_carried,
        skipped = report.slots_skipped,
        "inventory migrated"
    );
    (new, report)
}

fn write_carry(bucket: &mut Value, carry: &Carry) -> Result<(), PathError> {
    bucket.assign(&EQUIPPED_ID, Value::from(carry.item_id.as_str()))?;
    if let Some(mode) = &carry.randomize_type {
        bucket.assign(&RANDOMIZE_TYPE, mode.clone())?;
    }
    Ok(())
}

fn carry_favorite(new: &mut Document, slug: &str, report: &mut MigrationReport) {
    let Some(position) = position_by_slug(new, slug) else {
        warn!(%slug, "favorited item missing from new inventory");
        return;
    };
    let Some(record) = new.record_mut(position) else {
        return;
    };
    match record.assign(&FAVORITE, Value::Bool(true)) {
        Ok(_) => {
            debug!(%slug, "favorite carried");
            report.favorites_carried += 1;
        }
        Err(err) => warn!(%slug, %err, "favorite not writable, skipped"),
    }
}

/// Resolve one old bucket to the equivalent item id in `new`
fn resolve_carry(old: &Document, new: &Document, slot: &str, bucket: &Value) -> Option<Carry> {
    let unique_id = match equipped_id(bucket) {
        Ok(id) => id,
        Err(err) => {
            warn!(%slot, %err, "equipped item unreadable, skipped");
            return None;
        }
    };

    // Some stored uniqueIds are slugs rather than ids
    let Some(equipped) = find_by_id(old, unique_id).or_else(|| find_by_slug(old, unique_id)) else {
        warn!(%slot, item = %unique_id, "equipped item could not be found, skipped");
        return None;
    };
    let Some(equipped_slug) = record_slug(equipped) else {
        warn!(%slot, item = %unique_id, "equipped item has no slug, skipped");
        return None;
    };
    let Some(item_id) = find_by_slug(new, equipped_slug).and_then(record_id) else {
        warn!(%slot, slug = %equipped_slug, "equipped item missing from new inventory, skipped");
        return None;
    };

    Some(Carry {
        slot: slot.to_string(),
        item_id: item_id.to_string(),
        randomize_type: bucket.get("randomizeType").cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use invemu_test_utils::{character, document, favorite, map_mode, record};
    use pretty_assertions::assert_eq;

    fn doc(records: Vec<invemu_value::Mapping>) -> Document {
        Document::from_value(document(records)).unwrap()
    }

    fn slot_id<'a>(doc: &'a Document, character_slug: &str, slot: &str) -> &'a str {
        let character = find_by_slug(doc, character_slug).unwrap();
        equipped_id(&equip_slots(character).unwrap()[slot]).unwrap()
    }

    #[test]
    fn favorite_carried_by_slug() {
        let old = doc(vec![favorite("old-1", "Skin_X")]);
        let new = doc(vec![record("new-1", "Skin_X")]);
        let (migrated, report) = migrate(&old, new);
        assert!(is_favorite(find_by_slug(&migrated, "Skin_X").unwrap()));
        assert_eq!(report.favorites_carried, 1);
    }

    #[test]
    fn equip_resolved_by_slug_fallback() {
        let old = doc(vec![
            character("c-old", "Char_A", &[("Gear", "Gear_Mask")]),
            record("g-old", "Gear_Mask"),
        ]);
        let new = doc(vec![
            character("c-new", "Char_A", &[("Gear", "stale")]),
            record("g-new", "Gear_Mask"),
        ]);
        let (migrated, report) = migrate(&old, new);
        assert_eq!(slot_id(&migrated, "Char_A", "Gear"), "g-new");
        assert_eq!(report.slots_carried, 1);
    }

    #[test]
    fn unresolved_slot_skipped_others_migrate() {
        let old = doc(vec![
            character("c-old", "Char_A", &[("Gear", "ghost"), ("Skin", "s-old")]),
            record("s-old", "Skin_Y"),
        ]);
        let new = doc(vec![
            character("c-new", "Char_A", &[("Gear", "g0"), ("Skin", "s0")]),
            record("s-new", "Skin_Y"),
        ]);
        let (migrated, report) = migrate(&old, new);
        assert_eq!(slot_id(&migrated, "Char_A", "Gear"), "g0");
        assert_eq!(slot_id(&migrated, "Char_A", "Skin"), "s-new");
        assert_eq!(report.slots_skipped, 1);
        assert_eq!(report.slots_carried, 1);
    }

    #[test]
    fn missing_bucket_in_new_is_created() {
        let old = doc(vec![
            character("c-old", "Char_A", &[("SeasonalFatality", "f-old")]),
            record("f-old", "SeasonalFatality_1"),
        ]);
        let new = doc(vec![
            character("c-new", "Char_A", &[]),
            record("f-new", "SeasonalFatality_1"),
        ]);
        let (migrated, _) = migrate(&old, new);
        assert_eq!(slot_id(&migrated, "Char_A", "SeasonalFatality"), "f-new");
    }

    #[test]
    fn map_mode_is_never_migrated() {
        let mut old_map = map_mode("mm-old", &["Char_A"]);
        old_map.assign(&FAVORITE, Value::Bool(true)).unwrap();
        let old = doc(vec![old_map, record("mm-character", "Gear_Z")]);
        let new = doc(vec![map_mode("mm-new", &["Char_A"]), record("z-new", "Gear_Z")]);
        let expected = new.clone();
        let (migrated, report) = migrate(&old, new);
        assert_eq!(migrated, expected);
        assert_eq!(report, MigrationReport::default());
    }

    #[test]
    fn malformed_slot_tree_skips_that_character_only() {
        let mut broken = character("a-old", "Char_A", &[]);
        broken
            .assign(&crate::document::SLOTS, Value::from("oops"))
            .unwrap();
        let old = doc(vec![
            broken,
            character("b-old", "Char_B", &[("Gear", "g-old")]),
            record("g-old", "Gear_Mask"),
            favorite("f-old", "Skin_F"),
        ]);
        let new = doc(vec![
            character("a-new", "Char_A", &[("Gear", "a0")]),
            character("b-new", "Char_B", &[("Gear", "b0")]),
            record("ng", "Gear_Mask"),
            record("f-new", "Skin_F"),
        ]);

        let (migrated, report) = migrate(&old, new);
        assert_eq!(slot_id(&migrated, "Char_B", "Gear"), "ng");
        assert_eq!(slot_id(&migrated, "Char_A", "Gear"), "a0");
        assert!(is_favorite(find_by_slug(&migrated, "Skin_F").unwrap()));
        assert_eq!(
            report,
            MigrationReport {
                favorites_carried: 1,
                slots_carried: 1,
                slots_skipped: 0,
            }
        );
    }
}
