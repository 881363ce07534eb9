#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use homebox_lib::model::{Item, NewBox, NewItem, NewLocation, StorageBox};
use homebox_lib::{db, migrate, repo};
use sqlx::SqlitePool;

pub async fn memory_pool() -> anyhow::Result<SqlitePool> {
    let pool = db::open_memory_pool().await?;
    migrate::apply_migrations(&pool).await?;
    Ok(pool)
}

pub async fn make_box(pool: &SqlitePool, name: &str, location_id: Option<&str>) -> StorageBox {
    repo::boxes_create(
        pool,
        NewBox {
            name: name.into(),
            location_id: location_id.map(Into::into),
            ..NewBox::default()
        },
    )
    .await
    .expect("create box")
}

pub async fn make_location(pool: &SqlitePool, room: &str, furniture: &str) -> String {
    repo::locations_create(
        pool,
        NewLocation {
            room: room.into(),
            furniture: furniture.into(),
            ..NewLocation::default()
        },
    )
    .await
    .expect("create location")
    .id
}

pub async fn make_item(
    pool: &SqlitePool,
    box_id: &str,
    name: &str,
    category: Option<&str>,
) -> Item {
    let mut input = NewItem::named(box_id, name);
    input.category = category.map(Into::into);
    repo::items_create(pool, input).await.expect("create item")
}
