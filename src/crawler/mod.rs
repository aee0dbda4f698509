//! Crawler module: everything between the coordinator and the metadata sources
//!
//! This module contains:
//! - The metadata fetcher capability and its HTTP implementation
//! - The crawl worker that processes one host group
//! - The scheduler loop that pulls, partitions, crawls and rests
//! - One-shot commands and the bulk listing import

pub mod fetcher;
pub mod import;
pub mod scheduler;
pub mod single;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use fetcher::{build_http_client, HttpFetcher, MetadataFetcher, PackageDoc, PersonFetch};
pub use import::{import_listing, ImportSummary};
pub use scheduler::{should_rest, CycleSummary, RunBudget, RunSummary, Scheduler};
pub use single::{crawl_one_package, crawl_one_person, touch_package};
pub use worker::{crawl_group, CrawlContext, GroupReport, PackageOutcome, PersonOutcome};
