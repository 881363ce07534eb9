use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use super::enrich::Snapshot;
use super::query::{matches, normalize_query};
use super::stats::{distinct_categories, distinct_tags, InventoryStats};
use crate::{
    model::{EnrichedBox, EnrichedItem, Item, Location, StorageBox},
    store::EntityStore,
    util::dispatch_async_app_result,
    AppError, AppResult,
};

/// Structural item filters. Blank strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub box_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub location_id: Option<String>,
    /// Item must carry at least one of these tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

fn set(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl SearchFilters {
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    pub fn in_box(box_id: impl Into<String>) -> Self {
        Self {
            box_id: Some(box_id.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        set(&self.category).is_none()
            && set(&self.box_id).is_none()
            && set(&self.location_id).is_none()
            && self.tags.is_empty()
    }

    fn admits(&self, item: &Item, snapshot: &Snapshot) -> bool {
        if let Some(category) = set(&self.category) {
            if item.category.as_deref() != Some(category) {
                return false;
            }
        }
        if let Some(box_id) = set(&self.box_id) {
            if item.box_id != box_id {
                return false;
            }
        }
        if let Some(location_id) = set(&self.location_id) {
            if snapshot.item_location_id(item) != Some(location_id) {
                return false;
            }
        }
        if !self.tags.is_empty() && !item.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        true
    }
}

/// Box listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BoxFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub location_id: Option<String>,
}

impl BoxFilters {
    pub fn at(location_id: impl Into<String>) -> Self {
        Self {
            location_id: Some(location_id.into()),
        }
    }

    fn admits(&self, storage_box: &StorageBox) -> bool {
        match set(&self.location_id) {
            Some(location_id) => storage_box.location_id.as_deref() == Some(location_id),
            None => true,
        }
    }
}

/// Result of a search call. A failed store read is reported as
/// `Unavailable` so callers can tell it apart from "nothing matched".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome<T> {
    Ready { results: Vec<T> },
    Unavailable { error: AppError },
}

impl<T> SearchOutcome<T> {
    pub fn empty() -> Self {
        SearchOutcome::Ready {
            results: Vec::new(),
        }
    }

    pub fn results(&self) -> &[T] {
        match self {
            SearchOutcome::Ready { results } => results,
            SearchOutcome::Unavailable { .. } => &[],
        }
    }

    pub fn into_results(self) -> Vec<T> {
        match self {
            SearchOutcome::Ready { results } => results,
            SearchOutcome::Unavailable { .. } => Vec::new(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, SearchOutcome::Unavailable { .. })
    }

    pub fn error(&self) -> Option<&AppError> {
        match self {
            SearchOutcome::Ready { .. } => None,
            SearchOutcome::Unavailable { error } => Some(error),
        }
    }
}

struct Loaded {
    boxes: Vec<StorageBox>,
    items: Vec<Item>,
    locations: Vec<Location>,
}

/// Searches a fresh snapshot of the injected store on every call.
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<dyn EntityStore>,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    async fn load(&self) -> AppResult<Loaded> {
        let store = Arc::clone(&self.store);
        dispatch_async_app_result(|| async move {
            let boxes = store.list_boxes().await?;
            let items = store.list_items().await?;
            let locations = store.list_locations().await?;
            Ok(Loaded {
                boxes,
                items,
                locations,
            })
        })
        .await
        .map_err(|err| {
            warn!(
                target: "homebox",
                event = "search_store_unavailable",
                code = %err.code(),
                error = %err
            );
            AppError::store_unavailable(err)
        })
    }

    /// Items whose text matches `query`, narrowed by `filters`, newest first.
    /// A blank query with no filters returns nothing without reading the store.
    pub async fn search_items(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> SearchOutcome<EnrichedItem> {
        let needle = normalize_query(query);
        if needle.is_none() && filters.is_empty() {
            return SearchOutcome::empty();
        }
        let started = Instant::now();
        let loaded = match self.load().await {
            Ok(loaded) => loaded,
            Err(error) => return SearchOutcome::Unavailable { error },
        };
        let results = collect_items(loaded, needle.as_deref(), filters);
        info!(
            target: "homebox",
            event = "search_completed",
            kind = "items",
            query_len = query.trim().chars().count(),
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64
        );
        SearchOutcome::Ready { results }
    }

    /// Every item passing `filters`, newest first.
    pub async fn list_items(&self, filters: &SearchFilters) -> SearchOutcome<EnrichedItem> {
        match self.load().await {
            Ok(loaded) => SearchOutcome::Ready {
                results: collect_items(loaded, None, filters),
            },
            Err(error) => SearchOutcome::Unavailable { error },
        }
    }

    pub async fn search_boxes(&self, query: &str) -> SearchOutcome<EnrichedBox> {
        let Some(needle) = normalize_query(query) else {
            return SearchOutcome::empty();
        };
        let loaded = match self.load().await {
            Ok(loaded) => loaded,
            Err(error) => return SearchOutcome::Unavailable { error },
        };
        let snapshot = Snapshot::new(&loaded.boxes, &loaded.items, &loaded.locations);
        let mut results: Vec<EnrichedBox> = loaded
            .boxes
            .into_iter()
            .filter(|b| matches(&needle, b))
            .map(|b| snapshot.enrich_box(b))
            .collect();
        results.sort_by_key(|b| Reverse(b.storage_box.updated_at));
        info!(
            target: "homebox",
            event = "search_completed",
            kind = "boxes",
            query_len = query.trim().chars().count(),
            results = results.len()
        );
        SearchOutcome::Ready { results }
    }

    /// Box browse: boxes passing `filters` whose text matches `query`, newest
    /// first. A blank query lists every box passing `filters`.
    pub async fn list_boxes(
        &self,
        query: &str,
        filters: &BoxFilters,
    ) -> SearchOutcome<EnrichedBox> {
        let needle = normalize_query(query);
        let loaded = match self.load().await {
            Ok(loaded) => loaded,
            Err(error) => return SearchOutcome::Unavailable { error },
        };
        let snapshot = Snapshot::new(&loaded.boxes, &loaded.items, &loaded.locations);
        let mut results: Vec<EnrichedBox> = loaded
            .boxes
            .into_iter()
            .filter(|b| filters.admits(b))
            .filter(|b| needle.as_deref().map_or(true, |n| matches(n, b)))
            .map(|b| snapshot.enrich_box(b))
            .collect();
        results.sort_by_key(|b| Reverse(b.storage_box.updated_at));
        SearchOutcome::Ready { results }
    }

    pub async fn search_locations(&self, query: &str) -> SearchOutcome<Location> {
        let Some(needle) = normalize_query(query) else {
            return SearchOutcome::empty();
        };
        let locations = match self.load().await {
            Ok(loaded) => loaded.locations,
            Err(error) => return SearchOutcome::Unavailable { error },
        };
        let mut results: Vec<Location> = locations
            .into_iter()
            .filter(|l| matches(&needle, l))
            .collect();
        results.sort_by(|a, b| {
            (&a.room, &a.furniture, &a.position).cmp(&(&b.room, &b.furniture, &b.position))
        });
        info!(
            target: "homebox",
            event = "search_completed",
            kind = "locations",
            query_len = query.trim().chars().count(),
            results = results.len()
        );
        SearchOutcome::Ready { results }
    }

    pub async fn categories(&self) -> AppResult<Vec<String>> {
        Ok(distinct_categories(&self.load().await?.items))
    }

    pub async fn tags(&self) -> AppResult<Vec<String>> {
        Ok(distinct_tags(&self.load().await?.items))
    }

    pub async fn stats(&self) -> AppResult<InventoryStats> {
        let loaded = self.load().await?;
        Ok(InventoryStats::compute(
            &loaded.boxes,
            &loaded.items,
            &loaded.locations,
        ))
    }
}

fn collect_items(
    loaded: Loaded,
    needle: Option<&str>,
    filters: &SearchFilters,
) -> Vec<EnrichedItem> {
    let snapshot = Snapshot::new(&loaded.boxes, &loaded.items, &loaded.locations);
    let mut results: Vec<EnrichedItem> = loaded
        .items
        .into_iter()
        .filter(|item| filters.admits(item, &snapshot))
        .filter(|item| needle.map_or(true, |n| matches(n, item)))
        .map(|item| snapshot.enrich_item(item))
        .collect();
    // Stable: equal timestamps keep store order.
    results.sort_by_key(|e| Reverse(e.item.updated_at));
    results
}
