//! Crawl Agent: the work-distribution core of a code-search crawler fleet
//!
//! An agent pulls batches of package import paths and person identities from a
//! central coordinator, fetches metadata for each item, and pushes the results
//! back. Work is partitioned by origin host so that concurrency is bounded per
//! host, and the agent rests whenever the coordinator's queue looks drained.

pub mod config;
pub mod crawler;
pub mod item;
pub mod rpc;
pub mod storage;

use std::time::Duration;
use thiserror::Error;

/// Main error type for agent operations
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Coordinator unavailable during {call}: {source}")]
    CoordinatorUnavailable {
        call: &'static str,
        source: rpc::RpcError,
    },

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    MalformedIdentity(#[from] MalformedIdentity),
}

impl AgentError {
    /// Wraps a failed coordinator call
    pub fn coordinator(call: &'static str, source: rpc::RpcError) -> Self {
        Self::CoordinatorUnavailable { call, source }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Failure of the metadata fetch capability for a single item
///
/// Only [`FetchError::NotFound`] is permanent. Everything else may succeed on
/// a later cycle and must never feed the blacklist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{target} not found upstream")]
    NotFound { target: String },

    #[error("fetching {target} failed: {message}")]
    Transient { target: String, message: String },

    #[error("fetching {target} timed out after {after:?}")]
    Timeout { target: String, after: Duration },
}

impl FetchError {
    /// Whether the target is known not to exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn transient(target: impl Into<String>, message: impl ToString) -> Self {
        Self::Transient {
            target: target.into(),
            message: message.to_string(),
        }
    }
}

/// A person identity that lacks the `site:username` separator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed person identity '{0}': expected <site>:<username>")]
pub struct MalformedIdentity(pub String);

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use item::{CrawledPackage, CrawledPerson, PersonId, PushOutcome, WorkItem};
pub use storage::SkipSet;
