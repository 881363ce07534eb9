//! Read side of the inventory: full snapshots of boxes, items and locations.
//!
//! Search never talks to SQLite directly; it goes through [`EntityStore`] so a
//! snapshot can come from the database or from memory.

use futures::future::BoxFuture;

use crate::{
    model::{Item, Location, StorageBox},
    AppResult,
};

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub trait EntityStore: Send + Sync {
    fn list_boxes(&self) -> BoxFuture<'_, AppResult<Vec<StorageBox>>>;
    fn list_items(&self) -> BoxFuture<'_, AppResult<Vec<Item>>>;
    fn list_locations(&self) -> BoxFuture<'_, AppResult<Vec<Location>>>;
}
