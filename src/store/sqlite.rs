use futures::future::{BoxFuture, FutureExt};
use sqlx::SqlitePool;

use super::EntityStore;
use crate::{
    model::{Item, Location, StorageBox},
    repo, AppResult,
};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl EntityStore for SqliteStore {
    fn list_boxes(&self) -> BoxFuture<'_, AppResult<Vec<StorageBox>>> {
        repo::boxes_list(&self.pool).boxed()
    }

    fn list_items(&self) -> BoxFuture<'_, AppResult<Vec<Item>>> {
        repo::items_list(&self.pool).boxed()
    }

    fn list_locations(&self) -> BoxFuture<'_, AppResult<Vec<Location>>> {
        repo::locations_list(&self.pool).boxed()
    }
}
