//! Testing utilities for invemu workspace
//!
//! Fixture builders for records, characters, profiles and whole inventory
//! roots. Builders return plain [`Value`]/[`Mapping`] trees so this crate
//! stays below `invemu-core` in the dependency graph.

#![allow(missing_docs)]

use chrono::{NaiveDate, NaiveDateTime};
use invemu_value::{Mapping, Value};

pub const TEST_ACCOUNT: &str = "000000000000000000000000";

pub fn fixed_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 9, 19)
        .and_then(|d| d.and_hms_opt(14, 3, 7))
        .unwrap()
}

pub fn mapping<const N: usize>(entries: [(&str, Value); N]) -> Mapping {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Plain record with an empty favorite flag
pub fn record(id: &str, slug: &str) -> Mapping {
    record_with_data(id, slug, mapping([("bIsFavorite", Value::Bool(false))]))
}

pub fn record_with_data(id: &str, slug: &str, data: Mapping) -> Mapping {
    mapping([
        ("id", Value::from(id)),
        ("item_slug", Value::from(slug)),
        ("account_id", Value::from(TEST_ACCOUNT)),
        ("created_at", Value::DateTime(fixed_time())),
        ("updated_at", Value::DateTime(fixed_time())),
        ("data", Value::Mapping(data)),
    ])
}

pub fn favorite(id: &str, slug: &str) -> Mapping {
    record_with_data(id, slug, mapping([("bIsFavorite", Value::Bool(true))]))
}

pub fn equip_slot(unique_id: &str, randomize_type: &str) -> Value {
    Value::Mapping(mapping([
        (
            "items",
            Value::Sequence(vec![Value::Mapping(mapping([(
                "uniqueId",
                Value::from(unique_id),
            )]))]),
        ),
        ("randomizeType", Value::from(randomize_type)),
    ]))
}

fn slot_tree(slots: &[(&str, &str)]) -> Value {
    let buckets: Mapping = slots
        .iter()
        .map(|(slot, unique_id)| ((*slot).to_string(), equip_slot(unique_id, "None")))
        .collect();
    Value::Mapping(mapping([("slots", Value::Mapping(buckets))]))
}

/// Character-like record equipping `(slot, uniqueId)` pairs
pub fn character(id: &str, slug: &str, slots: &[(&str, &str)]) -> Mapping {
    record_with_data(
        id,
        slug,
        mapping([
            ("bIsFavorite", Value::Bool(false)),
            ("slots", slot_tree(slots)),
        ]),
    )
}

/// Profile singleton carrying level and experience
pub fn profile(id: &str, level: u8, experience: Value) -> Mapping {
    record_with_data(
        id,
        "Profile",
        mapping([
            ("currentLevel", Value::Mapping(mapping([("val", Value::Int8(level))]))),
            ("experience", Value::Mapping(mapping([("val", experience)]))),
        ]),
    )
}

/// MapMode singleton with a character slot and one loadout per name
pub fn map_mode(id: &str, loadouts: &[&str]) -> Mapping {
    let character_loadouts: Mapping = loadouts
        .iter()
        .map(|name| {
            (
                (*name).to_string(),
                slot_tree(&[("Gear", "mm-gear"), ("Skin", "mm-skin")]),
            )
        })
        .collect();
    record_with_data(
        id,
        "MapMode",
        mapping([
            ("slots", slot_tree(&[("Character", "mm-character")])),
            ("characterLoadouts", Value::Mapping(character_loadouts)),
        ]),
    )
}

/// Whole inventory root around `records`
pub fn document(records: Vec<Mapping>) -> Value {
    let current_items = records.into_iter().map(Value::Mapping).collect();
    Value::Mapping(mapping([
        (
            "body",
            Value::Mapping(mapping([
                (
                    "transaction",
                    Value::Mapping(mapping([
                        ("transaction_id", Value::from("00000000-0000-0000-0000-000000000000")),
                        ("hydra_events", Value::Sequence(Vec::new())),
                        ("client_version", Value::from("0.308")),
                        ("client_platform", Value::from("win64")),
                    ])),
                ),
                ("account_id", Value::from(TEST_ACCOUNT)),
                (
                    "response",
                    Value::Mapping(mapping([
                        ("current_items", Value::Sequence(current_items)),
                        ("deleted_items", Value::Sequence(Vec::new())),
                    ])),
                ),
            ])),
        ),
        (
            "metadata",
            Value::Mapping(mapping([("msg", Value::from("ONLINE_RESULT_SUCCESS"))])),
        ),
        ("return_code", Value::Int32(0)),
    ]))
}

/// Update request root as the client submits it
pub fn update_request(
    loadout: Option<(&str, &[&str], &[(&str, &str)])>,
    favorites: &[(&str, bool)],
) -> Value {
    let update_loadout = loadout
        .map(|(unique_id, slot_items, randomize)| {
            let differences = mapping([
                (
                    "slotitem",
                    Value::Sequence(slot_items.iter().map(|id| Value::from(*id)).collect()),
                ),
                (
                    "itemslotrandomizetype",
                    Value::Mapping(
                        randomize
                            .iter()
                            .map(|(slot, mode)| ((*slot).to_string(), Value::from(*mode)))
                            .collect(),
                    ),
                ),
            ]);
            vec![Value::Mapping(mapping([
                ("unique_id", Value::from(unique_id)),
                ("differences", Value::Mapping(differences)),
            ]))]
        })
        .unwrap_or_default();
    let is_favorite: Mapping = favorites
        .iter()
        .map(|(id, flag)| ((*id).to_string(), Value::Bool(*flag)))
        .collect();
    Value::Mapping(mapping([
        ("update_loadout", Value::Sequence(update_loadout)),
        ("is_favorite", Value::Mapping(is_favorite)),
    ]))
}
