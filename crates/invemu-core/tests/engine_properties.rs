//! Behavioral properties of the patch, migration and sync engines.
//!
//! Each test pins one externally observable guarantee:
//! - Lookups return the first record in array order.
//! - Loadout updates create or overwrite only the buckets they name.
//! - Unknown ids reject the whole update.
//! - Migration re-anchors favorites and equip identity by slug.
//! - Experience keeps its stored width across a sync.

use invemu_core::document::{equip_slots, equipped_id, is_favorite};
use invemu_core::{
    apply, find_by_id, find_by_slug, migrate, sync_progression, Document, PatchError,
    UpdateRequest,
};
use invemu_test_utils::{character, document, favorite, map_mode, profile, record, update_request};
use invemu_value::{Mapping, Navigate, Value, ValuePath};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn doc(records: Vec<Mapping>) -> Document {
    Document::from_value(document(records)).unwrap()
}

fn request(value: &Value) -> UpdateRequest {
    UpdateRequest::from_value(value).unwrap()
}

fn bucket_field(doc: &Document, character_id: &str, slot: &str, field: &str) -> Value {
    let slots = equip_slots(find_by_id(doc, character_id).unwrap()).unwrap();
    slots[slot].get(field).cloned().unwrap()
}

proptest! {
    /// `find_by_id` returns the first record carrying the id, or nothing.
    #[test]
    fn find_by_id_returns_first_match(ids in prop::collection::vec("[a-d]{1,2}", 0..12)) {
        let records = ids
            .iter()
            .enumerate()
            .map(|(i, id)| record(id, &format!("Gear_{i}")))
            .collect();
        let doc = doc(records);

        for id in &ids {
            let first = ids.iter().position(|candidate| candidate == id).unwrap();
            let found = find_by_id(&doc, id).unwrap();
            prop_assert_eq!(found.get("item_slug"), Some(&Value::from(format!("Gear_{first}"))));
        }
        prop_assert!(find_by_id(&doc, "zzz").is_none());
    }
}

#[test]
fn empty_request_changes_nothing() {
    let mut doc = doc(vec![character("c", "Char_A", &[]), favorite("f", "Skin_F")]);
    let before = doc.clone();
    let changed = apply(&mut doc, &request(&update_request(None, &[]))).unwrap();
    assert!(changed.is_empty());
    assert_eq!(doc, before);
}

#[test]
fn gear_bucket_created_with_default_mode() {
    let mut doc = doc(vec![
        character("c", "Char_A", &[("Skin", "s0")]),
        record("itemX", "Gear_Helmet"),
    ]);
    let value = update_request(Some(("c", &["itemX"], &[])), &[]);
    let changed = apply(&mut doc, &request(&value)).unwrap();

    assert_eq!(changed.len(), 1);
    let slots = equip_slots(find_by_id(&doc, "c").unwrap()).unwrap();
    assert_eq!(equipped_id(&slots["Gear"]).unwrap(), "itemX");
    assert_eq!(bucket_field(&doc, "c", "Gear", "randomizeType"), Value::from("None"));
}

#[test]
fn randomize_override_touches_only_named_slot() {
    let mut doc = doc(vec![character("c", "Char_A", &[("Gear", "g0"), ("Skin", "s0")])]);
    let value = update_request(Some(("c", &[], &[("Skin", "All")])), &[]);
    apply(&mut doc, &request(&value)).unwrap();

    assert_eq!(bucket_field(&doc, "c", "Skin", "randomizeType"), Value::from("All"));
    assert_eq!(bucket_field(&doc, "c", "Gear", "randomizeType"), Value::from("None"));
}

#[test]
fn favorite_toggle_round_trip() {
    let mut doc = doc(vec![record("R1", "Banner_1")]);

    let on = apply(&mut doc, &request(&update_request(None, &[("R1", true)]))).unwrap();
    assert_eq!(on.len(), 1);
    assert_eq!(on[0].get("id"), Some(&Value::from("R1")));
    assert!(is_favorite(find_by_id(&doc, "R1").unwrap()));

    let off = apply(&mut doc, &request(&update_request(None, &[("R1", false)]))).unwrap();
    assert_eq!(off.len(), 1);
    assert_eq!(off[0].get("id"), Some(&Value::from("R1")));
    assert!(!is_favorite(find_by_id(&doc, "R1").unwrap()));
}

#[test]
fn unknown_slot_item_fails_closed() {
    let mut doc = doc(vec![
        character("c", "Char_A", &[("Gear", "g0")]),
        record("R1", "Banner_1"),
    ]);
    let before = doc.clone();
    let value = update_request(Some(("c", &["doesNotExist"], &[])), &[("R1", true)]);
    let err = apply(&mut doc, &request(&value)).unwrap_err();

    assert!(matches!(err, PatchError::UnknownItem { ref id } if id == "doesNotExist"));
    assert_eq!(doc, before);
}

#[test]
fn character_first_then_favorites_in_request_order() {
    let mut doc = doc(vec![
        record("R2", "Banner_2"),
        character("c", "Char_A", &[]),
        record("R1", "Banner_1"),
        record("g", "Gear_G"),
    ]);
    let value = update_request(Some(("c", &["g"], &[])), &[("R1", true), ("R2", true)]);
    let changed = apply(&mut doc, &request(&value)).unwrap();
    let ids: Vec<_> = changed
        .iter()
        .map(|r| r.get("id").and_then(Value::as_str).unwrap())
        .collect();
    assert_eq!(ids, ["c", "R1", "R2"]);
}

#[test]
fn migration_reanchors_by_slug() {
    let old = doc(vec![
        favorite("old-x", "Skin_X"),
        character("old-c", "Char_A", &[("Skin", "abc")]),
        record("abc", "Skin_X_variant"),
        map_mode("old-mm", &["Char_A"]),
    ]);
    let new = doc(vec![
        record("new-x", "Skin_X"),
        character("new-c", "Char_A", &[("Skin", "stale")]),
        record("new-variant", "Skin_X_variant"),
        map_mode("new-mm", &["Char_A"]),
    ]);
    let new_map_mode = find_by_slug(&new, "MapMode").unwrap().clone();

    let (migrated, report) = migrate(&old, new);

    assert!(is_favorite(find_by_slug(&migrated, "Skin_X").unwrap()));
    let slots = equip_slots(find_by_slug(&migrated, "Char_A").unwrap()).unwrap();
    assert_eq!(equipped_id(&slots["Skin"]).unwrap(), "new-variant");
    assert_eq!(find_by_slug(&migrated, "MapMode").unwrap(), &new_map_mode);
    assert_eq!(report.favorites_carried, 1);
    assert_eq!(report.slots_carried, 1);
}

#[test]
fn sync_preserves_narrow_width() {
    let mut target = doc(vec![profile("t", 1, Value::Int32(1))]);
    let source = doc(vec![profile("s", 9, Value::Int16(12345))]);
    sync_progression(&mut target, &source).unwrap();

    let path: ValuePath = "data.experience.val".parse().unwrap();
    let profile = find_by_slug(&target, "Profile").unwrap();
    assert_eq!(profile.resolve(&path).unwrap(), &Value::Int16(12345));
}
