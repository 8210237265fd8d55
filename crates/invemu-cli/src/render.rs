//! Human and JSON renderings of the working inventory

use invemu_core::document::{is_favorite, record_slug};
use invemu_core::index::PROFILE_SLUG;
use invemu_core::{find_by_slug, Document, Experience, ItemCategory};
use invemu_value::{Navigate, Value, ValuePath};
use std::collections::BTreeMap;
use std::fmt::Write as _;

const JSON_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Lossless-enough JSON view of a value tree; integer widths are dropped
pub(crate) fn to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int8(n) => Json::from(*n),
        Value::Int16(n) => Json::from(*n),
        Value::Int32(n) => Json::from(*n),
        Value::Int64(n) => Json::from(*n),
        Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::Text(s) => Json::String(s.clone()),
        Value::DateTime(dt) => Json::String(dt.format(JSON_TIME_FORMAT).to_string()),
        Value::Sequence(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Mapping(map) => Json::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), to_json(value)))
                .collect(),
        ),
    }
}

/// Short text summary of a document
pub(crate) fn summary(doc: &Document) -> String {
    let mut categories: BTreeMap<String, usize> = BTreeMap::new();
    let mut favorites = 0;
    for (_, record) in doc.records() {
        *categories
            .entry(ItemCategory::of_record(record).to_string())
            .or_default() += 1;
        if is_favorite(record) {
            favorites += 1;
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "account:   {}", doc.account_id().unwrap_or("-"));
    let _ = writeln!(out, "records:   {}", doc.len());
    let _ = writeln!(out, "favorites: {favorites}");
    for (category, count) in &categories {
        let _ = writeln!(out, "  {category:<18}{count}");
    }

    match find_by_slug(doc, PROFILE_SLUG) {
        Some(profile) => {
            let level = ValuePath::keys(&["data", "currentLevel", "val"]);
            let experience = ValuePath::keys(&["data", "experience", "val"]);
            let level = match profile.resolve(&level) {
                Ok(Value::Int8(n)) => n.to_string(),
                _ => "?".to_string(),
            };
            let experience = profile
                .resolve(&experience)
                .ok()
                .and_then(Experience::from_value)
                .map_or_else(|| "?".to_string(), |e| e.to_string());
            let _ = writeln!(out, "level:     {level}");
            let _ = writeln!(out, "xp:        {experience}");
        }
        None => {
            let _ = writeln!(out, "profile:   none");
        }
    }

    let unslugged = doc.records().filter(|(_, r)| record_slug(r).is_none()).count();
    if unslugged > 0 {
        let _ = writeln!(out, "unslugged: {unslugged}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use invemu_test_utils::{document, favorite, profile, record};
    use pretty_assertions::assert_eq;

    fn doc() -> Document {
        Document::from_value(document(vec![
            record("a", "Gear_A"),
            favorite("b", "Skin_B"),
            profile("p", 12, Value::Int16(300)),
        ]))
        .unwrap()
    }

    #[test]
    fn summary_lists_progression() {
        let text = summary(&doc());
        assert!(text.contains("records:   3"));
        assert!(text.contains("favorites: 1"));
        assert!(text.contains("level:     12"));
        assert!(text.contains("xp:        300 (16-bit)"));
    }

    #[test]
    fn json_keeps_structure() {
        let json = to_json(doc().root());
        let items = &json["body"]["response"]["current_items"];
        assert_eq!(items[1]["id"], serde_json::json!("b"));
        assert_eq!(items[1]["created_at"], serde_json::json!("2023-09-19T14:03:07"));
        assert_eq!(items[2]["data"]["currentLevel"]["val"], serde_json::json!(12));
    }
}
