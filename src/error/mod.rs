use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use anyhow::Error as AnyhowError;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;
use sqlx::Error as SqlxError;
use std::io::Error as IoError;
use ts_rs::TS;

/// Entity store read failed; search results are unavailable.
pub const STORE_UNAVAILABLE: &str = "STORE/UNAVAILABLE";
/// The search history ledger could not persist its entries.
pub const HISTORY_WRITE_FAILED: &str = "HISTORY/WRITE_FAILED";
pub const BOX_NOT_FOUND: &str = "BOX/NOT_FOUND";
pub const ITEM_NOT_FOUND: &str = "ITEM/NOT_FOUND";
pub const LOCATION_NOT_FOUND: &str = "LOCATION/NOT_FOUND";
pub const VALIDATION_NAME_REQUIRED: &str = "VALIDATION/NAME_REQUIRED";
pub const RUNTIME_PANIC: &str = "RUNTIME/PANIC";
pub const RUNTIME_NO_REACTOR: &str = "RUNTIME/NO_REACTOR";

const STORE_ROW_NOT_FOUND: &str = "STORE/ROW_NOT_FOUND";
const STORE_POOL: &str = "STORE/POOL";
const STORE_CONSTRAINT: &str = "STORE/CONSTRAINT";
const STORE_QUERY: &str = "STORE/QUERY";
const JSON_INVALID: &str = "JSON/INVALID";
const UNKNOWN: &str = "APP/UNKNOWN";

/// Error shape shared by the library, the CLI and any UI bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppError {
    /// `DOMAIN/REASON`, stable across releases.
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    #[ts(as = "Option<HashMap<String, String>>", optional)]
    pub context: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub cause: Option<Box<AppError>>,
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        AppError {
            code: code.into(),
            message: message.into(),
            context: HashMap::new(),
            cause: None,
        }
    }

    /// Wraps a failed entity store read.
    pub fn store_unavailable(cause: AppError) -> Self {
        AppError::new(STORE_UNAVAILABLE, "Inventory data is unavailable right now.")
            .with_cause(cause)
    }

    pub fn history_write_failed(cause: impl Into<AppError>) -> Self {
        AppError::new(HISTORY_WRITE_FAILED, "Search history could not be saved.")
            .with_cause(cause)
    }

    /// `entity` is the display name ("Box", "Item", ...).
    pub fn not_found(code: &'static str, entity: &str, id: &str) -> Self {
        AppError::new(code, format!("{entity} not found")).with_context("id", id)
    }

    pub fn name_required(entity: &'static str) -> Self {
        AppError::new(VALIDATION_NAME_REQUIRED, "A name is required.")
            .with_context("entity", entity)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &HashMap<String, String> {
        &self.context
    }

    pub fn cause(&self) -> Option<&AppError> {
        self.cause.as_deref()
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<AppError>) -> Self {
        self.cause = Some(Box::new(cause.into()));
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(id) = self.context.get("id") {
            write!(f, " (id {id})")?;
        }
        Ok(())
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn StdError + 'static))
    }
}

impl From<AnyhowError> for AppError {
    fn from(error: AnyhowError) -> Self {
        fn walk(err: &(dyn StdError + 'static)) -> AppError {
            if let Some(app) = err.downcast_ref::<AppError>() {
                return app.clone();
            }
            let mut converted = AppError::new(UNKNOWN, err.to_string());
            converted.cause = err.source().map(|source| Box::new(walk(source)));
            converted
        }

        walk(error.as_ref())
    }
}

impl From<IoError> for AppError {
    fn from(error: IoError) -> Self {
        AppError::new(format!("IO/{:?}", error.kind()), error.to_string())
    }
}

impl From<SerdeJsonError> for AppError {
    fn from(error: SerdeJsonError) -> Self {
        AppError::new(JSON_INVALID, error.to_string())
            .with_context("line", error.line().to_string())
            .with_context("column", error.column().to_string())
    }
}

impl From<SqlxError> for AppError {
    fn from(error: SqlxError) -> Self {
        match error {
            SqlxError::RowNotFound => AppError::new(STORE_ROW_NOT_FOUND, "Record not found"),
            SqlxError::PoolTimedOut => {
                AppError::new(STORE_POOL, "Timed out waiting for a database connection")
            }
            SqlxError::PoolClosed => AppError::new(STORE_POOL, "Database pool is closed"),
            SqlxError::Io(err) => AppError::from(err).with_context("source", "sqlx"),
            SqlxError::Database(db) => {
                let mut converted = match db.kind() {
                    sqlx::error::ErrorKind::ForeignKeyViolation
                    | sqlx::error::ErrorKind::CheckViolation
                    | sqlx::error::ErrorKind::NotNullViolation
                    | sqlx::error::ErrorKind::UniqueViolation => {
                        AppError::new(STORE_CONSTRAINT, db.message().to_string())
                    }
                    _ => AppError::new(STORE_QUERY, db.message().to_string()),
                };
                if let Some(code) = db.code() {
                    converted = converted.with_context("sqlite_code", code.to_string());
                }
                converted
            }
            other => AppError::new(STORE_QUERY, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn store_unavailable_keeps_cause() {
        let error = AppError::store_unavailable(
            AppError::new(STORE_POOL, "pool closed").with_context("operation", "items_list"),
        );

        assert_eq!(error.code(), STORE_UNAVAILABLE);
        let cause = error.cause().expect("cause present");
        assert_eq!(cause.code(), STORE_POOL);
        assert_eq!(
            cause.context().get("operation").map(String::as_str),
            Some("items_list")
        );
    }

    #[test]
    fn anyhow_chain_becomes_nested_causes() {
        let err = Err::<(), _>(IoError::new(std::io::ErrorKind::Other, "disk full"))
            .context("failed to save history")
            .unwrap_err();

        let converted = AppError::from(err);
        assert_eq!(converted.code(), UNKNOWN);
        assert_eq!(converted.message(), "failed to save history");
        let cause = converted.cause().expect("io cause present");
        assert!(cause.message().contains("disk full"));
    }

    #[test]
    fn anyhow_keeps_wrapped_app_error() {
        let inner = AppError::not_found(BOX_NOT_FOUND, "Box", "b1");
        let converted = AppError::from(AnyhowError::from(inner.clone()));
        assert_eq!(converted, inner);
        assert_eq!(converted.to_string(), "[BOX/NOT_FOUND] Box not found (id b1)");
    }

    #[test]
    fn history_write_failure_wraps_cause() {
        let err = AppError::history_write_failed(anyhow::anyhow!("read-only file system"));
        assert_eq!(err.code(), HISTORY_WRITE_FAILED);
        assert_eq!(
            err.cause().map(|c| c.message()),
            Some("read-only file system")
        );
    }

    #[test]
    fn json_errors_record_position() {
        let err = serde_json::from_str::<Vec<String>>("[\"socks\", ").expect_err("invalid json");
        let converted = AppError::from(err);
        assert_eq!(converted.code(), JSON_INVALID);
        assert!(converted.context().contains_key("line"));
    }

    #[test]
    fn missing_row_maps_to_store_code() {
        let converted = AppError::from(SqlxError::RowNotFound);
        assert_eq!(converted.code(), STORE_ROW_NOT_FOUND);
    }

    #[test]
    fn name_required_serializes_flat() {
        let value = serde_json::to_value(AppError::name_required("box")).expect("serialize");
        assert_eq!(value["code"], VALIDATION_NAME_REQUIRED);
        assert_eq!(value["context"]["entity"], "box");
        assert!(value.get("cause").is_none());
    }
}
