//! Local home-inventory core: boxes, items and locations in SQLite, plus the
//! search, history and debounced-session layer that sits on top of them.

pub mod config;
pub mod db;
pub mod error;
pub mod id;
pub mod kv;
mod logging;
pub mod migrate;
pub mod model;
pub mod repo;
pub mod search;
pub mod store;
pub mod time;
pub mod util;

pub use config::{Config, ConfigError, SearchConfig};
pub use error::{AppError, AppResult};
pub use logging::init_logging;
pub use search::{
    BoxFilters, InventoryStats, SearchEngine, SearchFilters, SearchHistory, SearchOutcome,
    SearchSession, SearchState,
};
pub use store::{EntityStore, MemoryStore, SqliteStore};
