//! Crawl loop scheduler
//!
//! One cycle pulls a package batch and a person batch from the coordinator,
//! partitions each by host, crawls every host group on its own task and joins
//! them all before doing the cycle's bookkeeping. The loop only rests when the
//! coordinator's queues look drained.

use crate::config::CrawlerConfig;
use crate::crawler::worker::{crawl_group, CrawlContext, GroupReport};
use crate::item::{partition, HostGroups, WorkItem};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// How many more rests the loop may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunBudget {
    Unbounded,
    Remaining(u32),
}

impl RunBudget {
    pub fn from_max_loops(max_loops: Option<u32>) -> Self {
        max_loops.map_or(Self::Unbounded, Self::Remaining)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Remaining(0))
    }

    /// Spends one rest
    ///
    /// # Returns
    ///
    /// `true` while the loop may keep going
    pub fn consume(&mut self) -> bool {
        if let Self::Remaining(n) = self {
            *n = n.saturating_sub(1);
        }
        !self.is_exhausted()
    }
}

impl fmt::Display for RunBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("unbounded"),
            Self::Remaining(n) => write!(f, "{} left", n),
        }
    }
}

/// Decides whether the loop should rest after a cycle
///
/// A pull that failed (`None`) is an absent batch, not an empty one, so it
/// never counts as drained. When both pulls failed the loop backs off anyway
/// instead of hammering an unreachable coordinator.
///
/// # Arguments
///
/// * `limit` - Batch size requested from the coordinator
/// * `packages` - Length of the package batch, if the pull succeeded
/// * `persons` - Length of the person batch, if the pull succeeded
/// * `new_package` - Whether any person push revealed a new package
pub fn should_rest(
    limit: usize,
    packages: Option<usize>,
    persons: Option<usize>,
    new_package: bool,
) -> bool {
    if packages.is_none() && persons.is_none() {
        return true;
    }
    let drained = |pulled: Option<usize>| pulled.is_some_and(|n| n < limit);
    drained(packages) && drained(persons) && !new_package
}

/// What one cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Package batch length, `None` if the pull failed
    pub packages_pulled: Option<usize>,

    /// Person batch length, `None` if the pull failed
    pub persons_pulled: Option<usize>,

    /// Packages dropped before crawling (duplicates, blacklisted or already pushed)
    pub skipped: usize,

    pub report: GroupReport,
}

/// Totals of a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: usize,
    pub rests: usize,
    pub report: GroupReport,
}

/// Drives crawl cycles until the run budget is spent
pub struct Scheduler {
    ctx: Arc<CrawlContext>,
    entries_per_loop: usize,
    rest: Duration,
    budget: RunBudget,
    permits: Arc<Semaphore>,
}

impl Scheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `ctx` - Coordinator, fetcher and skip sets shared by all workers
    /// * `config` - Batch size, rest duration, run budget and concurrency cap
    pub fn new(ctx: Arc<CrawlContext>, config: &CrawlerConfig) -> Self {
        Self {
            ctx,
            entries_per_loop: config.entries_per_loop,
            rest: config.rest_duration(),
            budget: RunBudget::from_max_loops(config.max_loops),
            permits: Arc::new(Semaphore::new(config.max_concurrent_groups.max(1))),
        }
    }

    /// Runs cycles until the budget is exhausted; forever when unbounded
    pub async fn run(&self) -> RunSummary {
        let mut budget = self.budget;
        let mut summary = RunSummary::default();

        while !budget.is_exhausted() {
            let cycle = self.run_cycle().await;
            summary.cycles += 1;
            summary.report.absorb(cycle.report);

            if !should_rest(
                self.entries_per_loop,
                cycle.packages_pulled,
                cycle.persons_pulled,
                cycle.report.new_package,
            ) {
                continue;
            }

            tracing::info!("Nothing to do, have a rest... ({})", budget);
            tokio::time::sleep(self.rest).await;
            summary.rests += 1;
            budget.consume();
        }

        tracing::info!(
            "Run finished after {} cycles: {} packages and {} persons pushed",
            summary.cycles,
            summary.report.packages_pushed,
            summary.report.persons_pushed
        );
        summary
    }

    /// Runs one pull, crawl and bookkeeping cycle
    pub async fn run_cycle(&self) -> CycleSummary {
        let limit = self.entries_per_loop;

        let packages = match self.ctx.coordinator.fetch_package_batch(limit).await {
            Ok(items) => Some(items),
            Err(e) => {
                tracing::warn!("FetchPackageList failed: {}", e);
                None
            }
        };
        let packages_pulled = packages.as_ref().map(Vec::len);
        let (packages, skipped) = self.filter_packages(packages.unwrap_or_default());

        let persons = match self.ctx.coordinator.fetch_person_batch(limit).await {
            Ok(batch) => Some(batch),
            Err(e) => {
                tracing::warn!("FetchPersonList failed: {}", e);
                None
            }
        };
        let persons_pulled = persons.as_ref().map(|(_, pulled)| *pulled);
        let persons = persons.map(|(items, _)| items).unwrap_or_default();

        let package_groups = partition(packages);
        let person_groups = partition(persons);
        tracing::info!(
            "Packages: {} pulled, {} skipped, {} groups; persons: {} pulled, {} groups",
            packages_pulled.unwrap_or(0),
            skipped,
            package_groups.len(),
            persons_pulled.unwrap_or(0),
            person_groups.len()
        );

        let report = self.crawl_groups(package_groups, person_groups).await;
        self.ctx.persist_skip_sets();

        CycleSummary {
            packages_pulled,
            persons_pulled,
            skipped,
            report,
        }
    }

    /// Drops in-batch duplicates, blacklisted and already pushed packages
    fn filter_packages(&self, items: Vec<WorkItem>) -> (Vec<WorkItem>, usize) {
        let total = items.len();
        let mut batch_keys = HashSet::new();

        let kept: Vec<WorkItem> = items
            .into_iter()
            .filter(|item| {
                let key = item.key();
                let listed = [&self.ctx.blacklist, &self.ctx.seen]
                    .into_iter()
                    .flatten()
                    .any(|set| set.contains(&key));
                !listed && batch_keys.insert(key)
            })
            .collect();

        let skipped = total - kept.len();
        if skipped > 0 {
            tracing::debug!("Skipped {} of {} pulled packages", skipped, total);
        }
        (kept, skipped)
    }

    /// Crawls every group on its own task and waits for all of them
    ///
    /// Groups queue for a permit in host order; a task is only spawned once
    /// its permit is held, so at most `max_concurrent_groups` tasks exist.
    async fn crawl_groups(&self, packages: HostGroups, persons: HostGroups) -> GroupReport {
        let mut tasks = JoinSet::new();

        for (host, items) in packages.into_iter().chain(persons) {
            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!("Crawl permits unavailable: {}", e);
                    break;
                }
            };
            let ctx = Arc::clone(&self.ctx);
            tasks.spawn(async move {
                let report = crawl_group(&ctx, &host, items).await;
                drop(permit);
                report
            });
        }

        let mut total = GroupReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => total.absorb(report),
                Err(e) => tracing::error!("Crawl task failed: {}", e),
            }
        }
        total
    }
}
