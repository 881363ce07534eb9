use std::collections::HashMap;

use crate::model::{EnrichedBox, EnrichedItem, Item, Location, StorageBox};

/// Id lookups over one store snapshot.
pub struct Snapshot {
    boxes: HashMap<String, StorageBox>,
    locations: HashMap<String, Location>,
    item_counts: HashMap<String, u32>,
}

impl Snapshot {
    pub fn new(boxes: &[StorageBox], items: &[Item], locations: &[Location]) -> Self {
        let mut item_counts: HashMap<String, u32> = HashMap::new();
        for item in items {
            *item_counts.entry(item.box_id.clone()).or_default() += 1;
        }
        Self {
            boxes: boxes.iter().map(|b| (b.id.clone(), b.clone())).collect(),
            locations: locations.iter().map(|l| (l.id.clone(), l.clone())).collect(),
            item_counts,
        }
    }

    pub fn storage_box(&self, id: &str) -> Option<&StorageBox> {
        self.boxes.get(id)
    }

    pub fn location_of(&self, storage_box: &StorageBox) -> Option<&Location> {
        storage_box
            .location_id
            .as_deref()
            .and_then(|id| self.locations.get(id))
    }

    /// Location id of the box holding `item`, if both resolve.
    pub fn item_location_id(&self, item: &Item) -> Option<&str> {
        self.storage_box(&item.box_id)
            .and_then(|b| self.location_of(b))
            .map(|l| l.id.as_str())
    }

    /// Dangling references resolve to `None` rather than failing.
    pub fn enrich_item(&self, item: Item) -> EnrichedItem {
        let storage_box = self.storage_box(&item.box_id).cloned();
        let location = storage_box
            .as_ref()
            .and_then(|b| self.location_of(b))
            .cloned();
        EnrichedItem {
            item,
            storage_box,
            location,
        }
    }

    pub fn enrich_box(&self, storage_box: StorageBox) -> EnrichedBox {
        let location = self.location_of(&storage_box).cloned();
        let item_count = self.item_counts.get(&storage_box.id).copied().unwrap_or(0);
        EnrichedBox {
            storage_box,
            location,
            item_count,
        }
    }
}
