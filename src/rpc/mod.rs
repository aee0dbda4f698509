//! Coordinator RPC contract
//!
//! The coordinator owns the crawl queues. The agent reaches it only through
//! the [`Coordinator`] trait: every call returns its own `Result`, so there is
//! no shared "last error" state and one client can serve many workers.

mod http;
pub mod wire;

pub use http::HttpCoordinator;

use crate::item::{decode, CrawledPackage, CrawledPerson, PushOutcome, WorkItem};
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a single coordinator call
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{call}: transport error: {source}")]
    Transport {
        call: &'static str,
        source: reqwest::Error,
    },

    #[error("{call}: coordinator answered HTTP {status}")]
    Status { call: &'static str, status: u16 },

    #[error("{call}: undecodable reply: {message}")]
    Decode { call: &'static str, message: String },

    #[error("{call}: {message}")]
    Remote { call: &'static str, message: String },

    #[error("{call}: reply carried no result")]
    MissingResult { call: &'static str },
}

impl RpcError {
    /// Name of the remote call that failed
    pub fn call(&self) -> &'static str {
        match self {
            Self::Transport { call, .. }
            | Self::Status { call, .. }
            | Self::Decode { call, .. }
            | Self::Remote { call, .. }
            | Self::MissingResult { call } => call,
        }
    }
}

/// Result type for coordinator calls
pub type RpcResult<T> = Result<T, RpcError>;

/// Operations the coordinator exposes to crawler agents
///
/// Implementations must be safe for concurrent, independent calls.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Pulls up to `count` package import paths due for crawling
    async fn fetch_package_list(&self, count: usize) -> RpcResult<Vec<String>>;

    /// Pulls up to `count` person identities due for crawling
    async fn fetch_person_list(&self, count: usize) -> RpcResult<Vec<String>>;

    /// Offers import paths to the coordinator's queue
    ///
    /// Returns how many of them were new.
    async fn append_packages(&self, paths: &[String]) -> RpcResult<usize>;

    async fn push_package(&self, package: &CrawledPackage) -> RpcResult<()>;

    async fn push_person(&self, person: &CrawledPerson) -> RpcResult<PushOutcome>;

    /// Tells the coordinator an import path does not exist
    async fn report_bad_package(&self, path: &str) -> RpcResult<()>;

    /// Asks for a package to be crawled soon
    ///
    /// Returns whether it was scheduled earlier than before.
    async fn touch_package(&self, path: &str) -> RpcResult<bool>;

    /// Pulls a package batch as work items
    async fn fetch_package_batch(&self, limit: usize) -> RpcResult<Vec<WorkItem>> {
        let paths = self.fetch_package_list(limit).await?;
        Ok(paths.into_iter().map(WorkItem::package).collect())
    }

    /// Pulls a person batch as work items
    ///
    /// Malformed identities are logged and dropped; they never fail the batch.
    /// The returned count is the raw batch length, which drives the rest decision.
    async fn fetch_person_batch(&self, limit: usize) -> RpcResult<(Vec<WorkItem>, usize)> {
        let ids = self.fetch_person_list(limit).await?;
        let pulled = ids.len();

        let items = ids
            .iter()
            .filter_map(|id| match decode(id) {
                Ok(person) => Some(WorkItem::Person(person)),
                Err(e) => {
                    tracing::warn!("Skipping person: {}", e);
                    None
                }
            })
            .collect();

        Ok((items, pulled))
    }
}
