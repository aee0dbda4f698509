//! Storage module for persisted agent state
//!
//! The agent keeps no database. Its only durable state is a pair of key lists
//! (blacklist and already-pushed packages) kept as JSON files.

mod skip_set;

pub use skip_set::{load_list, save_list, SkipSet};

use thiserror::Error;

/// Errors that can occur while persisting key lists
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Loads the skip set for an enabled mode, or nothing when it is disabled
pub fn load_optional(path: Option<&str>) -> Option<std::sync::Arc<SkipSet>> {
    path.map(|p| std::sync::Arc::new(SkipSet::load(p)))
}
