//! Crawl worker: sequential processing of one host group
//!
//! A worker never runs items of its group concurrently; parallelism comes from
//! running many groups at once. Every failure is contained at the item level:
//! a bad item is logged (and reported or blacklisted when permanent), and the
//! worker moves on to the next one.

use crate::crawler::fetcher::{crawl_package, crawl_person, MetadataFetcher, PersonFetch};
use crate::item::{PersonId, WorkItem};
use crate::rpc::Coordinator;
use crate::storage::SkipSet;
use crate::FetchError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Everything a worker needs, shared by all workers of a run
pub struct CrawlContext {
    pub coordinator: Arc<dyn Coordinator>,
    pub fetcher: Arc<dyn MetadataFetcher>,

    /// Packages known not to exist; fed by not-found failures
    pub blacklist: Option<Arc<SkipSet>>,

    /// Packages already pushed (fast mode); fed by successful pushes
    pub seen: Option<Arc<SkipSet>>,

    /// Deadline for a single fetch
    pub fetch_timeout: Duration,
}

impl CrawlContext {
    pub fn new(
        coordinator: Arc<dyn Coordinator>,
        fetcher: Arc<dyn MetadataFetcher>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            coordinator,
            fetcher,
            blacklist: None,
            seen: None,
            fetch_timeout,
        }
    }

    pub fn with_blacklist(mut self, blacklist: Option<Arc<SkipSet>>) -> Self {
        self.blacklist = blacklist;
        self
    }

    pub fn with_seen(mut self, seen: Option<Arc<SkipSet>>) -> Self {
        self.seen = seen;
        self
    }

    /// Persists both skip sets if they grew; failures are logged, never fatal
    pub fn persist_skip_sets(&self) {
        for set in [&self.blacklist, &self.seen].into_iter().flatten() {
            if let Err(e) = set.save_if_changed() {
                tracing::error!("Saving {} failed: {}", set.path().display(), e);
            }
        }
    }

    /// Runs a fetch under the per-item deadline
    async fn fetch<T, F>(&self, target: &str, fetch: F) -> Result<T, FetchError>
    where
        F: Future<Output = Result<T, FetchError>>,
    {
        tokio::time::timeout(self.fetch_timeout, fetch)
            .await
            .unwrap_or_else(|_| {
                Err(FetchError::Timeout {
                    target: target.to_string(),
                    after: self.fetch_timeout,
                })
            })
    }
}

/// What happened to one package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageOutcome {
    Pushed,
    PushFailed,
    /// Not found upstream: reported to the coordinator
    BadPackage,
    /// Transient fetch failure; eligible for a later cycle
    FetchFailed,
}

/// What happened to one person
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonOutcome {
    Pushed { new_package: bool },
    PushFailed,
    FetchFailed,
    UnsupportedSite,
}

/// Tally of one or more host groups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupReport {
    pub packages_pushed: usize,
    pub persons_pushed: usize,
    pub push_failures: usize,
    pub fetch_failures: usize,
    pub bad_packages: usize,
    pub unsupported: usize,

    /// Some person push revealed a package the coordinator did not know
    pub new_package: bool,
}

impl GroupReport {
    pub fn absorb(&mut self, other: GroupReport) {
        self.packages_pushed += other.packages_pushed;
        self.persons_pushed += other.persons_pushed;
        self.push_failures += other.push_failures;
        self.fetch_failures += other.fetch_failures;
        self.bad_packages += other.bad_packages;
        self.unsupported += other.unsupported;
        self.new_package |= other.new_package;
    }

    fn record_package(&mut self, outcome: PackageOutcome) {
        match outcome {
            PackageOutcome::Pushed => self.packages_pushed += 1,
            PackageOutcome::PushFailed => self.push_failures += 1,
            PackageOutcome::BadPackage => self.bad_packages += 1,
            PackageOutcome::FetchFailed => self.fetch_failures += 1,
        }
    }

    fn record_person(&mut self, outcome: PersonOutcome) {
        match outcome {
            PersonOutcome::Pushed { new_package } => {
                self.persons_pushed += 1;
                self.new_package |= new_package;
            }
            PersonOutcome::PushFailed => self.push_failures += 1,
            PersonOutcome::FetchFailed => self.fetch_failures += 1,
            PersonOutcome::UnsupportedSite => self.unsupported += 1,
        }
    }
}

/// Crawls one host group, item by item, in order
pub async fn crawl_group(ctx: &CrawlContext, host: &str, items: Vec<WorkItem>) -> GroupReport {
    tracing::debug!("Crawling {} items from host {:?}", items.len(), host);

    let mut report = GroupReport::default();
    for item in items {
        match item {
            WorkItem::Package { path } => report.record_package(process_package(ctx, &path).await),
            WorkItem::Person(id) => report.record_person(process_person(ctx, &id).await),
        }
    }
    report
}

/// Fetches a package and pushes it to the coordinator
///
/// A not-found failure is reported as a bad package and, in blacklist mode,
/// added to the blacklist. Other failures are only logged.
pub async fn process_package(ctx: &CrawlContext, path: &str) -> PackageOutcome {
    let fetched = ctx
        .fetch(path, crawl_package(ctx.fetcher.as_ref(), path))
        .await;

    let package = match fetched {
        Ok(package) => package,
        Err(e) if e.is_not_found() => {
            tracing::warn!("Crawling package {} failed: {}", path, e);
            match ctx.coordinator.report_bad_package(path).await {
                Ok(()) => tracing::info!("Reported bad package {}", path),
                Err(e) => tracing::warn!("Reporting bad package {} failed: {}", path, e),
            }
            if let Some(blacklist) = &ctx.blacklist {
                if blacklist.insert(path) {
                    tracing::info!("Blacklisted package {}", path);
                }
            }
            return PackageOutcome::BadPackage;
        }
        Err(e) => {
            tracing::warn!("Crawling package {} failed: {}", path, e);
            return PackageOutcome::FetchFailed;
        }
    };

    tracing::info!("Crawled package {} success!", path);

    match ctx.coordinator.push_package(&package).await {
        Ok(()) => {
            tracing::info!("Push package {} success!", path);
            if let Some(seen) = &ctx.seen {
                seen.insert(path);
            }
            PackageOutcome::Pushed
        }
        Err(e) => {
            tracing::warn!("Push package {} failed: {}", path, e);
            PackageOutcome::PushFailed
        }
    }
}

/// Fetches a person's projects and pushes them to the coordinator
pub async fn process_person(ctx: &CrawlContext, id: &PersonId) -> PersonOutcome {
    let key = id.encode();
    let fetched = ctx
        .fetch(&key, crawl_person(ctx.fetcher.as_ref(), id))
        .await;

    let person = match fetched {
        Ok(PersonFetch::Crawled(person)) => person,
        Ok(PersonFetch::UnsupportedSite(site)) => {
            tracing::debug!("Ignoring person {}: unsupported site {}", key, site);
            return PersonOutcome::UnsupportedSite;
        }
        Err(e) => {
            tracing::warn!("Crawling person {} failed: {}", key, e);
            return PersonOutcome::FetchFailed;
        }
    };

    tracing::info!(
        "Crawled person {} success! {} packages",
        key,
        person.packages.len()
    );

    match ctx.coordinator.push_person(&person).await {
        Ok(outcome) => {
            tracing::info!(
                "Push person {} success! new package: {}",
                key,
                outcome.new_package
            );
            PersonOutcome::Pushed {
                new_package: outcome.new_package,
            }
        }
        Err(e) => {
            tracing::warn!("Push person {} failed: {}", key, e);
            PersonOutcome::PushFailed
        }
    }
}
