use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};

use super::EntityStore;
use crate::{
    error::STORE_UNAVAILABLE,
    model::{Item, Location, StorageBox},
    AppError, AppResult,
};

#[derive(Default)]
struct Snapshot {
    boxes: Vec<StorageBox>,
    items: Vec<Item>,
    locations: Vec<Location>,
}

/// In-memory snapshot store. Counts reads and can be told to fail, panic or
/// stall so callers can exercise their degraded paths.
#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Snapshot>,
    reads: AtomicUsize,
    failing: AtomicBool,
    panicking: AtomicBool,
    delays: Mutex<VecDeque<Duration>>,
}

impl MemoryStore {
    pub fn new(boxes: Vec<StorageBox>, items: Vec<Item>, locations: Vec<Location>) -> Self {
        Self {
            snapshot: Mutex::new(Snapshot {
                boxes,
                items,
                locations,
            }),
            ..Self::default()
        }
    }

    pub fn replace_boxes(&self, boxes: Vec<StorageBox>) {
        if let Ok(mut guard) = self.snapshot.lock() {
            guard.boxes = boxes;
        }
    }

    pub fn replace_items(&self, items: Vec<Item>) {
        if let Ok(mut guard) = self.snapshot.lock() {
            guard.items = items;
        }
    }

    pub fn replace_locations(&self, locations: Vec<Location>) {
        if let Ok(mut guard) = self.snapshot.lock() {
            guard.locations = locations;
        }
    }

    /// Number of list calls served so far, failed ones included.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    /// Queues a delay applied to the next `list_items` call.
    pub fn push_delay(&self, delay: Duration) {
        if let Ok(mut guard) = self.delays.lock() {
            guard.push_back(delay);
        }
    }

    fn next_delay(&self) -> Option<Duration> {
        self.delays.lock().ok().and_then(|mut q| q.pop_front())
    }

    fn read<T, F>(&self, pick: F) -> AppResult<Vec<T>>
    where
        F: FnOnce(&Snapshot) -> Vec<T>,
    {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.panicking.load(Ordering::SeqCst) {
            panic!("memory store configured to panic");
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::new(STORE_UNAVAILABLE, "memory store offline"));
        }
        let guard = self
            .snapshot
            .lock()
            .map_err(|_| AppError::new(STORE_UNAVAILABLE, "memory store lock poisoned"))?;
        Ok(pick(&guard))
    }
}

impl EntityStore for MemoryStore {
    fn list_boxes(&self) -> BoxFuture<'_, AppResult<Vec<StorageBox>>> {
        async move { self.read(|s| s.boxes.clone()) }.boxed()
    }

    fn list_items(&self) -> BoxFuture<'_, AppResult<Vec<Item>>> {
        let delay = self.next_delay();
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.read(|s| s.items.clone())
        }
        .boxed()
    }

    fn list_locations(&self) -> BoxFuture<'_, AppResult<Vec<Location>>> {
        async move { self.read(|s| s.locations.clone()) }.boxed()
    }
}
