use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Label used for items without a category in aggregate views.
pub const UNCATEGORIZED: &str = "uncategorized";
/// Location text shown for an item whose box cannot be resolved.
pub const UNASSIGNED: &str = "unassigned";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Location {
    pub id: String,
    pub room: String,
    pub furniture: String,
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub photo_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub notes: Option<String>,
    #[ts(type = "number")]
    pub created_at: i64,
}

impl Location {
    /// Non-empty room, furniture and position joined for display.
    pub fn label(&self) -> String {
        [&self.room, &self.furniture, &self.position]
            .into_iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" - ")
    }
}

/// A physical container. Named `StorageBox` to stay clear of `std::boxed::Box`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, rename = "Box")]
pub struct StorageBox {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub location_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub photo_path: Option<String>,
    #[ts(type = "number")]
    pub created_at: i64,
    #[ts(type = "number")]
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Item {
    pub id: String,
    pub box_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub category: Option<String>,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub photo_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[ts(type = "number")]
    pub created_at: i64,
    #[ts(type = "number")]
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SearchHistoryEntry {
    pub query: String,
    #[ts(type = "number")]
    pub searched_at: i64,
}

/// An item joined with its owning box and that box's location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EnrichedItem {
    pub item: Item,
    #[serde(rename = "box")]
    pub storage_box: Option<StorageBox>,
    pub location: Option<Location>,
}

impl EnrichedItem {
    /// Where to find the item: room > furniture > box.
    pub fn location_text(&self) -> String {
        let Some(storage_box) = &self.storage_box else {
            return UNASSIGNED.to_string();
        };
        let mut parts: Vec<&str> = Vec::new();
        if let Some(location) = &self.location {
            parts.extend(
                [location.room.as_str(), location.furniture.as_str()]
                    .into_iter()
                    .map(str::trim)
                    .filter(|part| !part.is_empty()),
            );
        }
        parts.push(storage_box.name.as_str());
        parts.join(" > ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EnrichedBox {
    #[serde(rename = "box")]
    pub storage_box: StorageBox,
    pub location: Option<Location>,
    pub item_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    pub room: String,
    #[serde(default)]
    pub furniture: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub photo_path: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Full replacement of a location's mutable fields.
pub type LocationUpdate = NewLocation;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBox {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub photo_path: Option<String>,
}

pub type BoxUpdate = NewBox;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub box_id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub photo_path: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_quantity() -> u32 {
    1
}

impl NewItem {
    pub fn named(box_id: impl Into<String>, name: impl Into<String>) -> Self {
        NewItem {
            box_id: box_id.into(),
            name: name.into(),
            category: None,
            quantity: default_quantity(),
            photo_path: None,
            notes: None,
            tags: Vec::new(),
        }
    }
}

pub type ItemUpdate = NewItem;

/// Drops repeated tags and blank ones, keeping first occurrence order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(room: &str, furniture: &str, position: &str) -> Location {
        Location {
            id: "loc-1".into(),
            room: room.into(),
            furniture: furniture.into(),
            position: position.into(),
            photo_path: None,
            notes: None,
            created_at: 1,
        }
    }

    fn storage_box(name: &str) -> StorageBox {
        StorageBox {
            id: "box-1".into(),
            name: name.into(),
            description: None,
            location_id: Some("loc-1".into()),
            photo_path: None,
            created_at: 1,
            updated_at: 1,
        }
    }

    fn item() -> Item {
        Item {
            id: "item-1".into(),
            box_id: "box-1".into(),
            name: "Charger".into(),
            category: None,
            quantity: 1,
            photo_path: None,
            notes: None,
            tags: Vec::new(),
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn label_skips_blank_parts() {
        assert_eq!(
            location("Bedroom", "Wardrobe", "Top shelf").label(),
            "Bedroom - Wardrobe - Top shelf"
        );
        assert_eq!(location("Garage", " ", "").label(), "Garage");
    }

    #[test]
    fn location_text_falls_back() {
        let mut enriched = EnrichedItem {
            item: item(),
            storage_box: None,
            location: None,
        };
        assert_eq!(enriched.location_text(), UNASSIGNED);

        enriched.storage_box = Some(storage_box("Cables"));
        assert_eq!(enriched.location_text(), "Cables");

        enriched.location = Some(location("Study", "Desk", "Drawer"));
        assert_eq!(enriched.location_text(), "Study > Desk > Cables");
    }

    #[test]
    fn tags_keep_first_occurrence() {
        let tags = normalize_tags(vec![
            "winter".into(),
            " wool ".into(),
            "winter".into(),
            "".into(),
        ]);
        assert_eq!(tags, vec!["winter".to_string(), "wool".to_string()]);
    }

    #[test]
    fn enriched_item_serializes_box_key() {
        let enriched = EnrichedItem {
            item: item(),
            storage_box: Some(storage_box("Cables")),
            location: None,
        };
        let value = serde_json::to_value(&enriched).expect("serialize");
        assert_eq!(
            value.pointer("/box/name").and_then(|v| v.as_str()),
            Some("Cables")
        );
        assert!(value.get("location").map(|v| v.is_null()).unwrap_or(false));
    }
}
