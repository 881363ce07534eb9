use std::sync::Mutex;

use tracing::warn;

use crate::{
    error::HISTORY_WRITE_FAILED, kv::KvHandle, model::SearchHistoryEntry, time::now_ms, AppError,
    AppResult,
};

/// Key under which the entry list is stored as a JSON array.
pub const HISTORY_KEY: &str = "searchHistory";
pub use crate::config::DEFAULT_HISTORY_LIMIT;

/// Bounded, de-duplicated, most-recent-first list of past queries.
///
/// Mutations apply to memory first and are then persisted. A failed write is
/// reported as `HISTORY/WRITE_FAILED` but the in-memory list keeps the change.
pub struct SearchHistory {
    kv: KvHandle,
    limit: usize,
    entries: Mutex<Vec<SearchHistoryEntry>>,
}

impl SearchHistory {
    pub fn load(kv: KvHandle, limit: usize) -> Self {
        let limit = limit.max(1);
        let mut entries: Vec<SearchHistoryEntry> = match kv.get(HISTORY_KEY) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(target: "homebox", event = "search_history_corrupt", error = %err);
                Vec::new()
            }),
            None => Vec::new(),
        };
        entries.truncate(limit);
        Self {
            kv,
            limit,
            entries: Mutex::new(entries),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Queries, most recent first.
    pub fn list(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.query).collect()
    }

    pub fn entries(&self) -> Vec<SearchHistoryEntry> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Moves `query` to the front, dropping the oldest entries past the limit.
    /// Entries keep the exact text given; whitespace-only queries are ignored.
    pub fn record(&self, query: &str) -> AppResult<()> {
        if query.trim().is_empty() {
            return Ok(());
        }
        let limit = self.limit;
        self.mutate(|entries| {
            entries.retain(|e| e.query != query);
            entries.insert(
                0,
                SearchHistoryEntry {
                    query: query.to_string(),
                    searched_at: now_ms(),
                },
            );
            entries.truncate(limit);
            true
        })
    }

    pub fn remove(&self, query: &str) -> AppResult<()> {
        self.mutate(|entries| {
            let before = entries.len();
            entries.retain(|e| e.query != query);
            entries.len() != before
        })
    }

    pub fn clear(&self) -> AppResult<()> {
        self.mutate(|entries| {
            let changed = !entries.is_empty();
            entries.clear();
            changed
        })
    }

    /// `apply` returns whether anything changed; unchanged lists are not rewritten.
    fn mutate<F>(&self, apply: F) -> AppResult<()>
    where
        F: FnOnce(&mut Vec<SearchHistoryEntry>) -> bool,
    {
        let snapshot = {
            let mut guard = self
                .entries
                .lock()
                .map_err(|_| AppError::new(HISTORY_WRITE_FAILED, "history lock poisoned"))?;
            if !apply(&mut guard) {
                return Ok(());
            }
            guard.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, entries: &[SearchHistoryEntry]) -> AppResult<()> {
        let result = serde_json::to_string(entries)
            .map_err(anyhow::Error::from)
            .and_then(|raw| {
                if entries.is_empty() {
                    self.kv.remove(HISTORY_KEY);
                } else {
                    self.kv.set(HISTORY_KEY, &raw);
                }
                self.kv.persist()
            });
        result.map_err(|err| {
            warn!(
                target: "homebox",
                event = "search_history_persist_failed",
                entries = entries.len(),
                error = %err
            );
            AppError::history_write_failed(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KeyValueStore, MemoryKv};
    use std::sync::Arc;

    #[derive(Default)]
    struct ReadOnlyKv(MemoryKv);

    impl KeyValueStore for ReadOnlyKv {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }
        fn set(&self, key: &str, value: &str) {
            self.0.set(key, value);
        }
        fn remove(&self, key: &str) {
            self.0.remove(key);
        }
        fn save(&self) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn ledger() -> SearchHistory {
        SearchHistory::load(KvHandle::in_memory(), DEFAULT_HISTORY_LIMIT)
    }

    #[test]
    fn rerecorded_query_moves_to_front() {
        let history = ledger();
        history.record("socks").expect("record");
        history.record("hat").expect("record");
        history.record("socks").expect("record");
        assert_eq!(history.list(), vec!["socks", "hat"]);
    }

    #[test]
    fn entries_keep_text_as_typed() {
        let history = ledger();
        history.record("socks ").expect("record");
        history.record("socks").expect("record");
        history.record("Socks").expect("record");
        assert_eq!(history.list(), vec!["Socks", "socks", "socks "]);

        history.remove("socks").expect("remove");
        assert_eq!(history.list(), vec!["Socks", "socks "]);
    }

    #[test]
    fn blank_is_ignored() {
        let history = ledger();
        history.record("   ").expect("record");
        history.record("").expect("record");
        assert!(history.list().is_empty());
    }

    #[test]
    fn keeps_only_the_most_recent_twenty() {
        let history = ledger();
        for n in 0..21 {
            history.record(&format!("q{n}")).expect("record");
        }
        let list = history.list();
        assert_eq!(list.len(), 20);
        assert_eq!(list.first().map(String::as_str), Some("q20"));
        assert!(!list.contains(&"q0".to_string()));
    }

    #[test]
    fn remove_and_clear() {
        let history = ledger();
        history.record("a").expect("record");
        history.record("b").expect("record");
        history.remove("a").expect("remove");
        history.remove("missing").expect("remove is a no-op");
        assert_eq!(history.list(), vec!["b"]);
        history.clear().expect("clear");
        assert!(history.list().is_empty());
    }

    #[test]
    fn reloads_from_backing_store() {
        let kv = KvHandle::in_memory();
        let history = SearchHistory::load(kv.clone(), DEFAULT_HISTORY_LIMIT);
        history.record("drill").expect("record");
        history.record("tape").expect("record");

        let reloaded = SearchHistory::load(kv, DEFAULT_HISTORY_LIMIT);
        assert_eq!(reloaded.list(), vec!["tape", "drill"]);
    }

    #[test]
    fn corrupt_payload_starts_empty() {
        let kv = KvHandle::in_memory();
        kv.set(HISTORY_KEY, "{oops");
        let history = SearchHistory::load(kv, DEFAULT_HISTORY_LIMIT);
        assert!(history.list().is_empty());
    }

    #[test]
    fn write_failure_keeps_memory_state() {
        let kv = KvHandle::new(Arc::new(ReadOnlyKv::default()));
        let history = SearchHistory::load(kv, DEFAULT_HISTORY_LIMIT);
        let err = history.record("socks").expect_err("save fails");
        assert_eq!(err.code(), HISTORY_WRITE_FAILED);
        assert_eq!(history.list(), vec!["socks"]);
    }
}
