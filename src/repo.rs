//! SQLite-backed inventory writes and reads.
//!
//! Keeps the entity graph consistent: items always reference a live box,
//! deleting a box removes its items, deleting a location unassigns the boxes
//! that pointed at it. Every mutation other than creation advances
//! `updated_at`.

use futures::FutureExt;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::{
    db::run_in_tx,
    error::{BOX_NOT_FOUND, ITEM_NOT_FOUND, LOCATION_NOT_FOUND},
    id::new_uuid_v7,
    model::{
        normalize_tags, BoxUpdate, Item, ItemUpdate, Location, LocationUpdate, NewBox, NewItem,
        NewLocation, StorageBox,
    },
    time::{advance_ms, now_ms},
    AppError, AppResult,
};

const LOCATION_COLUMNS: &str = "id, room, furniture, position, photo_path, notes, created_at";
const BOX_COLUMNS: &str =
    "id, name, description, location_id, photo_path, created_at, updated_at";
const ITEM_COLUMNS: &str =
    "id, box_id, name, category, quantity, photo_path, notes, tags, created_at, updated_at";

/// Suffix appended to the name of a copied item.
pub const COPY_SUFFIX: &str = " (copy)";

fn with_operation(err: sqlx::Error, operation: &'static str) -> AppError {
    AppError::from(err).with_context("operation", operation)
}

fn require_name(value: &str, entity: &'static str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::name_required(entity));
    }
    Ok(trimmed.to_string())
}

/// Blank optional text is stored as NULL.
fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn deserialize_location(row: &SqliteRow) -> AppResult<Location> {
    Ok(Location {
        id: row.try_get("id")?,
        room: row.try_get("room")?,
        furniture: row.try_get("furniture")?,
        position: row.try_get("position")?,
        photo_path: row.try_get("photo_path")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

fn deserialize_box(row: &SqliteRow) -> AppResult<StorageBox> {
    Ok(StorageBox {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        location_id: row.try_get("location_id")?,
        photo_path: row.try_get("photo_path")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn deserialize_item(row: &SqliteRow) -> AppResult<Item> {
    let raw_tags: String = row.try_get("tags")?;
    let tags: Vec<String> = serde_json::from_str(&raw_tags)
        .map_err(|err| AppError::from(err).with_context("column", "tags"))?;
    let quantity: i64 = row.try_get("quantity")?;
    Ok(Item {
        id: row.try_get("id")?,
        box_id: row.try_get("box_id")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        quantity: quantity.clamp(0, u32::MAX as i64) as u32,
        photo_path: row.try_get("photo_path")?,
        notes: row.try_get("notes")?,
        tags,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn encode_tags(tags: Vec<String>) -> AppResult<String> {
    Ok(serde_json::to_string(&normalize_tags(tags))?)
}

async fn ensure_location(pool: &SqlitePool, id: &str) -> AppResult<()> {
    if locations_get(pool, id).await?.is_none() {
        return Err(AppError::not_found(LOCATION_NOT_FOUND, "Location", id));
    }
    Ok(())
}

async fn ensure_box(pool: &SqlitePool, id: &str) -> AppResult<()> {
    if boxes_get(pool, id).await?.is_none() {
        return Err(AppError::not_found(BOX_NOT_FOUND, "Box", id));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

pub async fn locations_list(pool: &SqlitePool) -> AppResult<Vec<Location>> {
    let sql = format!(
        "SELECT {LOCATION_COLUMNS} FROM locations ORDER BY room, furniture, position, id"
    );
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .map_err(|err| with_operation(err, "locations_list"))?;
    rows.iter().map(deserialize_location).collect()
}

pub async fn locations_get(pool: &SqlitePool, id: &str) -> AppResult<Option<Location>> {
    let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|err| with_operation(err, "locations_get"))?;
    row.as_ref().map(deserialize_location).transpose()
}

pub async fn locations_create(pool: &SqlitePool, input: NewLocation) -> AppResult<Location> {
    let location = Location {
        id: new_uuid_v7(),
        room: require_name(&input.room, "location")?,
        furniture: input.furniture.trim().to_string(),
        position: input.position.trim().to_string(),
        photo_path: optional_text(input.photo_path),
        notes: optional_text(input.notes),
        created_at: now_ms(),
    };

    sqlx::query(
        "INSERT INTO locations (id, room, furniture, position, photo_path, notes, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(&location.id)
    .bind(&location.room)
    .bind(&location.furniture)
    .bind(&location.position)
    .bind(&location.photo_path)
    .bind(&location.notes)
    .bind(location.created_at)
    .execute(pool)
    .await
    .map_err(|err| with_operation(err, "locations_create"))?;

    Ok(location)
}

pub async fn locations_update(
    pool: &SqlitePool,
    id: &str,
    input: LocationUpdate,
) -> AppResult<Location> {
    let existing = locations_get(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(LOCATION_NOT_FOUND, "Location", id))?;
    let updated = Location {
        room: require_name(&input.room, "location")?,
        furniture: input.furniture.trim().to_string(),
        position: input.position.trim().to_string(),
        photo_path: optional_text(input.photo_path),
        notes: optional_text(input.notes),
        ..existing
    };

    sqlx::query(
        "UPDATE locations SET room = ?1, furniture = ?2, position = ?3, photo_path = ?4, notes = ?5 \
         WHERE id = ?6",
    )
    .bind(&updated.room)
    .bind(&updated.furniture)
    .bind(&updated.position)
    .bind(&updated.photo_path)
    .bind(&updated.notes)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|err| with_operation(err, "locations_update"))?;

    Ok(updated)
}

/// Distinct room names, sorted.
pub async fn location_rooms(pool: &SqlitePool) -> AppResult<Vec<String>> {
    let rooms: Vec<String> =
        sqlx::query_scalar("SELECT DISTINCT room FROM locations ORDER BY room")
            .fetch_all(pool)
            .await
            .map_err(|err| with_operation(err, "location_rooms"))?;
    Ok(rooms)
}

pub async fn locations_by_room(pool: &SqlitePool, room: &str) -> AppResult<Vec<Location>> {
    let sql = format!(
        "SELECT {LOCATION_COLUMNS} FROM locations WHERE room = ? ORDER BY furniture, position, id"
    );
    let rows = sqlx::query(&sql)
        .bind(room)
        .fetch_all(pool)
        .await
        .map_err(|err| with_operation(err, "locations_by_room"))?;
    rows.iter().map(deserialize_location).collect()
}

/// Deletes a location and unassigns every box stored there. Returns the
/// number of boxes that lost their location.
pub async fn locations_delete(pool: &SqlitePool, id: &str) -> AppResult<u64> {
    let id = id.to_string();
    let now = now_ms();
    run_in_tx(pool, move |tx| {
        async move {
            let cleared = sqlx::query(
                "UPDATE boxes SET location_id = NULL, updated_at = MAX(updated_at, ?1) \
                 WHERE location_id = ?2",
            )
            .bind(now)
            .bind(&id)
            .execute(&mut **tx)
            .await
            .map_err(|err| with_operation(err, "locations_delete_unassign"))?
            .rows_affected();

            let removed = sqlx::query("DELETE FROM locations WHERE id = ?")
                .bind(&id)
                .execute(&mut **tx)
                .await
                .map_err(|err| with_operation(err, "locations_delete"))?
                .rows_affected();
            if removed == 0 {
                return Err(AppError::not_found(LOCATION_NOT_FOUND, "Location", &id));
            }
            Ok(cleared)
        }
        .boxed()
    })
    .await
}

// ---------------------------------------------------------------------------
// Boxes
// ---------------------------------------------------------------------------

pub async fn boxes_list(pool: &SqlitePool) -> AppResult<Vec<StorageBox>> {
    let sql = format!("SELECT {BOX_COLUMNS} FROM boxes ORDER BY updated_at DESC, id");
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .map_err(|err| with_operation(err, "boxes_list"))?;
    rows.iter().map(deserialize_box).collect()
}

pub async fn boxes_get(pool: &SqlitePool, id: &str) -> AppResult<Option<StorageBox>> {
    let sql = format!("SELECT {BOX_COLUMNS} FROM boxes WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|err| with_operation(err, "boxes_get"))?;
    row.as_ref().map(deserialize_box).transpose()
}

/// True when another box already uses `name`. Names are compared after
/// trimming, exactly as stored.
pub async fn boxes_name_exists(
    pool: &SqlitePool,
    name: &str,
    exclude_id: Option<&str>,
) -> AppResult<bool> {
    let found: i64 = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM boxes WHERE name = ?1 AND (?2 IS NULL OR id <> ?2))",
    )
    .bind(name.trim())
    .bind(exclude_id)
    .fetch_one(pool)
    .await
    .map_err(|err| with_operation(err, "boxes_name_exists"))?;
    Ok(found != 0)
}

pub async fn boxes_create(pool: &SqlitePool, input: NewBox) -> AppResult<StorageBox> {
    let location_id = optional_text(input.location_id);
    if let Some(location_id) = &location_id {
        ensure_location(pool, location_id).await?;
    }
    let now = now_ms();
    let storage_box = StorageBox {
        id: new_uuid_v7(),
        name: require_name(&input.name, "box")?,
        description: optional_text(input.description),
        location_id,
        photo_path: optional_text(input.photo_path),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO boxes (id, name, description, location_id, photo_path, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(&storage_box.id)
    .bind(&storage_box.name)
    .bind(&storage_box.description)
    .bind(&storage_box.location_id)
    .bind(&storage_box.photo_path)
    .bind(storage_box.created_at)
    .bind(storage_box.updated_at)
    .execute(pool)
    .await
    .map_err(|err| with_operation(err, "boxes_create"))?;

    Ok(storage_box)
}

pub async fn boxes_update(pool: &SqlitePool, id: &str, input: BoxUpdate) -> AppResult<StorageBox> {
    let existing = boxes_get(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(BOX_NOT_FOUND, "Box", id))?;
    let location_id = optional_text(input.location_id);
    if let Some(location_id) = &location_id {
        ensure_location(pool, location_id).await?;
    }
    let updated = StorageBox {
        name: require_name(&input.name, "box")?,
        description: optional_text(input.description),
        location_id,
        photo_path: optional_text(input.photo_path),
        updated_at: advance_ms(existing.created_at, existing.updated_at),
        ..existing
    };

    sqlx::query(
        "UPDATE boxes SET name = ?1, description = ?2, location_id = ?3, photo_path = ?4, \
         updated_at = ?5 WHERE id = ?6",
    )
    .bind(&updated.name)
    .bind(&updated.description)
    .bind(&updated.location_id)
    .bind(&updated.photo_path)
    .bind(updated.updated_at)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|err| with_operation(err, "boxes_update"))?;

    Ok(updated)
}

/// Places a box at `location_id`, or unassigns it when `None`.
pub async fn boxes_move(
    pool: &SqlitePool,
    id: &str,
    location_id: Option<&str>,
) -> AppResult<StorageBox> {
    let existing = boxes_get(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(BOX_NOT_FOUND, "Box", id))?;
    boxes_update(
        pool,
        id,
        BoxUpdate {
            name: existing.name,
            description: existing.description,
            location_id: location_id.map(str::to_string),
            photo_path: existing.photo_path,
        },
    )
    .await
}

/// Deletes a box together with its items. Returns the number of items removed.
pub async fn boxes_delete(pool: &SqlitePool, id: &str) -> AppResult<u64> {
    let id = id.to_string();
    run_in_tx(pool, move |tx| {
        async move {
            let items = sqlx::query("DELETE FROM items WHERE box_id = ?")
                .bind(&id)
                .execute(&mut **tx)
                .await
                .map_err(|err| with_operation(err, "boxes_delete_items"))?
                .rows_affected();

            let removed = sqlx::query("DELETE FROM boxes WHERE id = ?")
                .bind(&id)
                .execute(&mut **tx)
                .await
                .map_err(|err| with_operation(err, "boxes_delete"))?
                .rows_affected();
            if removed == 0 {
                return Err(AppError::not_found(BOX_NOT_FOUND, "Box", &id));
            }
            Ok(items)
        }
        .boxed()
    })
    .await
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

pub async fn items_list(pool: &SqlitePool) -> AppResult<Vec<Item>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY updated_at DESC, id");
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .map_err(|err| with_operation(err, "items_list"))?;
    rows.iter().map(deserialize_item).collect()
}

pub async fn items_list_by_box(pool: &SqlitePool, box_id: &str) -> AppResult<Vec<Item>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE box_id = ? ORDER BY name, id");
    let rows = sqlx::query(&sql)
        .bind(box_id)
        .fetch_all(pool)
        .await
        .map_err(|err| with_operation(err, "items_list_by_box"))?;
    rows.iter().map(deserialize_item).collect()
}

pub async fn items_get(pool: &SqlitePool, id: &str) -> AppResult<Option<Item>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|err| with_operation(err, "items_get"))?;
    row.as_ref().map(deserialize_item).transpose()
}

async fn require_item(pool: &SqlitePool, id: &str) -> AppResult<Item> {
    items_get(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(ITEM_NOT_FOUND, "Item", id))
}

async fn insert_item(pool: &SqlitePool, item: &Item) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO items (id, box_id, name, category, quantity, photo_path, notes, tags, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(&item.id)
    .bind(&item.box_id)
    .bind(&item.name)
    .bind(&item.category)
    .bind(i64::from(item.quantity))
    .bind(&item.photo_path)
    .bind(&item.notes)
    .bind(encode_tags(item.tags.clone())?)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(pool)
    .await
    .map_err(|err| with_operation(err, "items_create"))?;
    Ok(())
}

async fn write_item(pool: &SqlitePool, item: &Item) -> AppResult<()> {
    sqlx::query(
        "UPDATE items SET box_id = ?1, name = ?2, category = ?3, quantity = ?4, photo_path = ?5, \
         notes = ?6, tags = ?7, updated_at = ?8 WHERE id = ?9",
    )
    .bind(&item.box_id)
    .bind(&item.name)
    .bind(&item.category)
    .bind(i64::from(item.quantity))
    .bind(&item.photo_path)
    .bind(&item.notes)
    .bind(encode_tags(item.tags.clone())?)
    .bind(item.updated_at)
    .bind(&item.id)
    .execute(pool)
    .await
    .map_err(|err| with_operation(err, "items_update"))?;
    Ok(())
}

pub async fn items_create(pool: &SqlitePool, input: NewItem) -> AppResult<Item> {
    ensure_box(pool, &input.box_id).await?;
    let now = now_ms();
    let item = Item {
        id: new_uuid_v7(),
        box_id: input.box_id,
        name: require_name(&input.name, "item")?,
        category: optional_text(input.category),
        quantity: input.quantity,
        photo_path: optional_text(input.photo_path),
        notes: optional_text(input.notes),
        tags: normalize_tags(input.tags),
        created_at: now,
        updated_at: now,
    };
    insert_item(pool, &item).await?;
    Ok(item)
}

pub async fn items_update(pool: &SqlitePool, id: &str, input: ItemUpdate) -> AppResult<Item> {
    let existing = require_item(pool, id).await?;
    if input.box_id != existing.box_id {
        ensure_box(pool, &input.box_id).await?;
    }
    let updated = Item {
        box_id: input.box_id,
        name: require_name(&input.name, "item")?,
        category: optional_text(input.category),
        quantity: input.quantity,
        photo_path: optional_text(input.photo_path),
        notes: optional_text(input.notes),
        tags: normalize_tags(input.tags),
        updated_at: advance_ms(existing.created_at, existing.updated_at),
        ..existing
    };
    write_item(pool, &updated).await?;
    Ok(updated)
}

pub async fn items_move(pool: &SqlitePool, id: &str, box_id: &str) -> AppResult<Item> {
    let mut item = require_item(pool, id).await?;
    ensure_box(pool, box_id).await?;
    item.box_id = box_id.to_string();
    item.updated_at = advance_ms(item.created_at, item.updated_at);
    write_item(pool, &item).await?;
    Ok(item)
}

pub async fn items_set_quantity(pool: &SqlitePool, id: &str, quantity: u32) -> AppResult<Item> {
    let mut item = require_item(pool, id).await?;
    item.quantity = quantity;
    item.updated_at = advance_ms(item.created_at, item.updated_at);
    write_item(pool, &item).await?;
    Ok(item)
}

/// Adds `delta` (possibly negative) to the quantity, clamping at zero.
pub async fn items_adjust_quantity(pool: &SqlitePool, id: &str, delta: i64) -> AppResult<Item> {
    let item = require_item(pool, id).await?;
    let next = (i64::from(item.quantity).saturating_add(delta)).clamp(0, u32::MAX as i64);
    items_set_quantity(pool, id, next as u32).await
}

/// Duplicates an item, optionally into another box.
pub async fn items_copy(
    pool: &SqlitePool,
    id: &str,
    target_box_id: Option<&str>,
) -> AppResult<Item> {
    let source = require_item(pool, id).await?;
    let box_id = target_box_id.unwrap_or(&source.box_id).to_string();
    ensure_box(pool, &box_id).await?;
    let now = now_ms();
    let copy = Item {
        id: new_uuid_v7(),
        box_id,
        name: format!("{}{COPY_SUFFIX}", source.name),
        created_at: now,
        updated_at: now,
        ..source
    };
    insert_item(pool, &copy).await?;
    Ok(copy)
}

pub async fn items_delete(pool: &SqlitePool, id: &str) -> AppResult<()> {
    let removed = sqlx::query("DELETE FROM items WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|err| with_operation(err, "items_delete"))?
        .rows_affected();
    if removed == 0 {
        return Err(AppError::not_found(ITEM_NOT_FOUND, "Item", id));
    }
    Ok(())
}

/// Moves every listed item into `box_id` in one transaction. Unknown item ids
/// are skipped; returns the number of items moved.
pub async fn items_move_many(pool: &SqlitePool, ids: &[String], box_id: &str) -> AppResult<u64> {
    let ids = ids.to_vec();
    let box_id = box_id.to_string();
    let now = now_ms();
    run_in_tx(pool, move |tx| {
        async move {
            let (exists,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM boxes WHERE id = ?")
                .bind(&box_id)
                .fetch_one(&mut **tx)
                .await
                .map_err(|err| with_operation(err, "items_move_many_box"))?;
            if exists == 0 {
                return Err(AppError::not_found(BOX_NOT_FOUND, "Box", &box_id));
            }

            let mut moved = 0;
            for id in &ids {
                moved += sqlx::query(
                    "UPDATE items SET box_id = ?1, updated_at = MAX(updated_at, created_at, ?2) \
                     WHERE id = ?3",
                )
                .bind(&box_id)
                .bind(now)
                .bind(id)
                .execute(&mut **tx)
                .await
                .map_err(|err| with_operation(err, "items_move_many"))?
                .rows_affected();
            }
            Ok(moved)
        }
        .boxed()
    })
    .await
}

/// Deletes every listed item in one transaction. Unknown ids are skipped;
/// returns the number of items removed.
pub async fn items_delete_many(pool: &SqlitePool, ids: &[String]) -> AppResult<u64> {
    let ids = ids.to_vec();
    run_in_tx(pool, move |tx| {
        async move {
            let mut removed = 0;
            for id in &ids {
                removed += sqlx::query("DELETE FROM items WHERE id = ?")
                    .bind(id)
                    .execute(&mut **tx)
                    .await
                    .map_err(|err| with_operation(err, "items_delete_many"))?
                    .rows_affected();
            }
            Ok(removed)
        }
        .boxed()
    })
    .await
}
