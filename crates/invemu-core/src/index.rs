//! Record lookup and item classification
//!
//! Lookups are linear scans in `current_items` order and return the first
//! match. `id` is unique within one document instance; `item_slug` is only
//! unique for singleton records such as [`PROFILE_SLUG`] and [`MAP_MODE_SLUG`],
//! or where a caller joins two documents by slug.

use crate::document::{record_id, record_slug, Document, Record};
use std::fmt::{self, Display, Formatter};

/// Slug of the player profile singleton
pub const PROFILE_SLUG: &str = "Profile";

/// Slug of the map mode singleton
pub const MAP_MODE_SLUG: &str = "MapMode";

/// First record whose `id` equals `id`
#[must_use]
pub fn find_by_id<'a>(doc: &'a Document, id: &str) -> Option<&'a Record> {
    doc.records()
        .find(|(_, record)| record_id(record) == Some(id))
        .map(|(_, record)| record)
}

/// First record whose `item_slug` equals `slug`
#[must_use]
pub fn find_by_slug<'a>(doc: &'a Document, slug: &str) -> Option<&'a Record> {
    doc.records()
        .find(|(_, record)| record_slug(record) == Some(slug))
        .map(|(_, record)| record)
}

/// Position in `current_items` of the first record with `id`
#[must_use]
pub fn position_by_id(doc: &Document, id: &str) -> Option<usize> {
    doc.records()
        .find(|(_, record)| record_id(record) == Some(id))
        .map(|(position, _)| position)
}

/// Position in `current_items` of the first record with `slug`
#[must_use]
pub fn position_by_slug(doc: &Document, slug: &str) -> Option<usize> {
    doc.records()
        .find(|(_, record)| record_slug(record) == Some(slug))
        .map(|(position, _)| position)
}

/// Equip category of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemCategory {
    /// Gear piece
    Gear,
    /// Character skin
    Skin,
    /// Seasonal fatality
    SeasonalFatality,
    /// Not equippable through a loadout slot
    Unknown,
}

impl ItemCategory {
    /// Ordered containment checks; first match wins
    const RULES: [(&'static str, Self); 3] = [
        ("Gear", Self::Gear),
        ("Skin", Self::Skin),
        ("SeasonalFatality", Self::SeasonalFatality),
    ];

    /// Classify an item slug
    #[must_use]
    pub fn classify(slug: &str) -> Self {
        Self::RULES
            .iter()
            .find(|(needle, _)| slug.contains(needle))
            .map_or(Self::Unknown, |(_, category)| *category)
    }

    /// Classify a record by its slug; records without one are `Unknown`
    #[must_use]
    pub fn of_record(record: &Record) -> Self {
        record_slug(record).map_or(Self::Unknown, Self::classify)
    }

    /// Bucket key under `data.slots.slots`
    #[inline]
    #[must_use]
    pub const fn slot_key(self) -> Option<&'static str> {
        match self {
            Self::Gear => Some("Gear"),
            Self::Skin => Some("Skin"),
            Self::SeasonalFatality => Some("SeasonalFatality"),
            Self::Unknown => None,
        }
    }
}

impl Display for ItemCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.slot_key().unwrap_or("Unknown"))
    }
}

/// Classify an item slug
#[inline]
#[must_use]
pub fn classify(slug: &str) -> ItemCategory {
    ItemCategory::classify(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use invemu_test_utils::{document, record};

    fn doc() -> Document {
        Document::from_value(document(vec![
            record("1", "Gear_Scorpion_Mask"),
            record("2", "Skin_SubZero"),
            record("2", "Skin_Duplicate"),
            record("3", PROFILE_SLUG),
        ]))
        .unwrap()
    }

    #[test]
    fn find_by_id_returns_first_match() {
        let doc = doc();
        let found = find_by_id(&doc, "2").unwrap();
        assert_eq!(record_slug(found), Some("Skin_SubZero"));
        assert!(find_by_id(&doc, "9").is_none());
    }

    #[test]
    fn find_by_slug_and_positions() {
        let doc = doc();
        assert_eq!(record_id(find_by_slug(&doc, PROFILE_SLUG).unwrap()), Some("3"));
        assert_eq!(position_by_slug(&doc, PROFILE_SLUG), Some(3));
        assert_eq!(position_by_id(&doc, "2"), Some(1));
        assert_eq!(position_by_slug(&doc, MAP_MODE_SLUG), None);
    }

    #[test]
    fn classification_order() {
        assert_eq!(classify("Gear_Mask"), ItemCategory::Gear);
        assert_eq!(classify("Skin_Alt"), ItemCategory::Skin);
        assert_eq!(classify("SeasonalFatality_01"), ItemCategory::SeasonalFatality);
        assert_eq!(classify("Kameo_Sonya"), ItemCategory::Unknown);
        // Gear is tested before Skin
        assert_eq!(classify("GearSkin"), ItemCategory::Gear);
        assert_eq!(classify("SkinSeasonalFatality"), ItemCategory::Skin);
    }

    #[test]
    fn slot_keys() {
        assert_eq!(ItemCategory::Gear.slot_key(), Some("Gear"));
        assert_eq!(ItemCategory::Unknown.slot_key(), None);
        assert_eq!(ItemCategory::SeasonalFatality.to_string(), "SeasonalFatality");
    }
}
