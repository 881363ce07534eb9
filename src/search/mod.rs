//! Inventory search: query normalisation, matching, enrichment and the
//! session plumbing that drives it from keystrokes.

pub mod debounce;
pub mod engine;
pub mod enrich;
pub mod history;
pub mod query;
pub mod stats;

pub use debounce::{SearchSession, SearchState};
pub use engine::{BoxFilters, SearchEngine, SearchFilters, SearchOutcome};
pub use history::{SearchHistory, HISTORY_KEY};
pub use query::{matches, normalize_query, Searchable};
pub use stats::InventoryStats;
