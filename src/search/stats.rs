use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::model::{Item, Location, StorageBox, UNCATEGORIZED};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryStats {
    pub item_count: u32,
    #[ts(type = "number")]
    pub total_quantity: u64,
    /// Item count per category; items without one land in `uncategorized`.
    pub by_category: BTreeMap<String, u32>,
    /// Item count per box id.
    pub by_box: BTreeMap<String, u32>,
    pub box_count: u32,
    pub boxes_with_location: u32,
    pub boxes_without_location: u32,
    pub location_count: u32,
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl InventoryStats {
    pub fn compute(boxes: &[StorageBox], items: &[Item], locations: &[Location]) -> Self {
        let mut stats = InventoryStats {
            item_count: count(items.len()),
            box_count: count(boxes.len()),
            location_count: count(locations.len()),
            ..Self::default()
        };
        for item in items {
            stats.total_quantity += u64::from(item.quantity);
            let category = item
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(UNCATEGORIZED);
            *stats.by_category.entry(category.to_string()).or_default() += 1;
            *stats.by_box.entry(item.box_id.clone()).or_default() += 1;
        }
        for storage_box in boxes {
            if storage_box.location_id.is_some() {
                stats.boxes_with_location += 1;
            } else {
                stats.boxes_without_location += 1;
            }
        }
        stats
    }
}

/// Distinct non-blank categories, sorted.
pub fn distinct_categories(items: &[Item]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.category.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn distinct_tags(items: &[Item]) -> Vec<String> {
    items
        .iter()
        .flat_map(|item| item.tags.iter())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
