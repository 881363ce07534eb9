//! Keystroke-driven search session.
//!
//! Each query change bumps a generation counter and aborts whatever was
//! pending. A spawned search only publishes when its generation is still the
//! current one, checked under the same lock that issues new generations, so
//! an older query can never overwrite a newer one.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::engine::{SearchEngine, SearchFilters, SearchOutcome};
use super::history::SearchHistory;
use super::query::normalize_query;
use crate::{
    config::DEFAULT_DEBOUNCE_MS, error::RUNTIME_NO_REACTOR, model::EnrichedItem, AppError,
    AppResult,
};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(DEFAULT_DEBOUNCE_MS);

#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub filters: SearchFilters,
    pub is_searching: bool,
    pub outcome: SearchOutcome<EnrichedItem>,
    /// Increments on every query, filter or clear event.
    pub generation: u64,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            query: String::new(),
            filters: SearchFilters::default(),
            is_searching: false,
            outcome: SearchOutcome::empty(),
            generation: 0,
        }
    }
}

#[derive(Default)]
struct Inner {
    generation: u64,
    query: String,
    filters: SearchFilters,
    pending: Option<JoinHandle<()>>,
}

impl Inner {
    fn supersede(&mut self) -> u64 {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
        self.generation += 1;
        self.generation
    }
}

pub struct SearchSession {
    engine: SearchEngine,
    history: Option<Arc<SearchHistory>>,
    debounce: Duration,
    runtime: Handle,
    inner: Arc<Mutex<Inner>>,
    state: Arc<watch::Sender<SearchState>>,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SearchSession {
    /// Must be called from within a tokio runtime.
    pub fn new(engine: SearchEngine, debounce: Duration) -> AppResult<Self> {
        let runtime = Handle::try_current().map_err(|err| {
            AppError::new(RUNTIME_NO_REACTOR, "Search session needs a running async runtime.")
                .with_context("error", err.to_string())
        })?;
        let (state, _) = watch::channel(SearchState::default());
        Ok(Self {
            engine,
            history: None,
            debounce,
            runtime,
            inner: Arc::new(Mutex::new(Inner::default())),
            state: Arc::new(state),
        })
    }

    /// Submitted queries (see [`SearchSession::search_now`]) are recorded here.
    pub fn with_history(mut self, history: Arc<SearchHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn is_searching(&self) -> bool {
        self.state.borrow().is_searching
    }

    /// Keystroke entry point: searches once typing pauses for the quiet period.
    pub fn update_query(&self, query: &str) {
        self.issue(query.to_string(), None, Some(self.debounce));
    }

    /// Searches immediately and records the query in history.
    pub fn search_now(&self, query: &str) {
        if let Some(history) = &self.history {
            if let Err(err) = history.record(query) {
                debug!(
                    target: "homebox",
                    event = "search_history_record_skipped",
                    code = %err.code()
                );
            }
        }
        self.issue(query.to_string(), None, None);
    }

    /// Re-runs the current query under `filters`.
    pub fn set_filters(&self, filters: SearchFilters) {
        let query = lock(&self.inner).query.clone();
        self.issue(query, Some(filters), None);
    }

    /// Drops the query, the filters and any pending or running search.
    pub fn clear(&self) {
        let mut inner = lock(&self.inner);
        let generation = inner.supersede();
        inner.query.clear();
        inner.filters = SearchFilters::default();
        self.state.send_replace(SearchState {
            generation,
            ..SearchState::default()
        });
    }

    fn issue(&self, query: String, filters: Option<SearchFilters>, delay: Option<Duration>) {
        let mut inner = lock(&self.inner);
        let generation = inner.supersede();
        inner.query = query.clone();
        if let Some(filters) = filters {
            inner.filters = filters;
        }
        let filters = inner.filters.clone();

        if normalize_query(&query).is_none() && filters.is_empty() {
            self.state.send_replace(SearchState {
                query,
                filters,
                is_searching: false,
                outcome: SearchOutcome::empty(),
                generation,
            });
            return;
        }

        // Results of the superseded query must not be shown against the new one.
        self.state.send_replace(SearchState {
            query: query.clone(),
            filters: filters.clone(),
            is_searching: true,
            outcome: SearchOutcome::empty(),
            generation,
        });

        let engine = self.engine.clone();
        let shared = Arc::clone(&self.inner);
        let state = Arc::clone(&self.state);
        let task = self.runtime.spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let outcome = engine.search_items(&query, &filters).await;
            let inner = lock(&shared);
            if inner.generation != generation {
                debug!(target: "homebox", event = "search_result_discarded", generation);
                return;
            }
            state.send_replace(SearchState {
                query,
                filters,
                is_searching: false,
                outcome,
                generation,
            });
        });
        inner.pending = Some(task);
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.inner).pending.take() {
            task.abort();
        }
    }
}
