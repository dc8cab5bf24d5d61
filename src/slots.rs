//! Slot identifiers and the occupancy map exchanged between components.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Identifier of a single parking slot, e.g. `"Slot1"`.
///
/// The set of identifiers is fixed by configuration at startup. Ordering is
/// lexical, which keeps `"Slot1".."Slot4"` in their natural order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlotId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SlotId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::borrow::Borrow<str> for SlotId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Occupancy of every configured slot; `true` means occupied.
///
/// Serializes as a flat JSON object, one boolean field per slot.
pub type OccupancyMap = BTreeMap<SlotId, bool>;

/// Human-facing label for an occupancy value.
pub fn status_label(occupied: bool) -> &'static str {
    if occupied { "Occupied" } else { "Available" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn slot_ids_sort_naturally() {
        let mut ids = vec![SlotId::from("Slot3"), SlotId::from("Slot1"), SlotId::from("Slot2")];
        ids.sort();
        let names: Vec<_> = ids.iter().map(SlotId::as_str).collect();
        assert_eq!(names, vec!["Slot1", "Slot2", "Slot3"]);
    }

    #[test]
    fn occupancy_map_serializes_flat() {
        let map = OccupancyMap::from([(SlotId::from("Slot1"), true), (SlotId::from("Slot2"), false)]);
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({"Slot1": true, "Slot2": false}));
    }

    #[test]
    fn lookup_by_str() {
        let map = OccupancyMap::from([(SlotId::from("Slot1"), true)]);
        assert_eq!(map.get("Slot1"), Some(&true));
        assert_eq!(map.get("Slot9"), None);
    }

    #[test]
    fn labels_match_display_wording() {
        assert_eq!(status_label(true), "Occupied");
        assert_eq!(status_label(false), "Available");
    }
}
