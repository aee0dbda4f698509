//! In-memory coordinator and fetcher used by the crawler tests

use crate::crawler::fetcher::{MetadataFetcher, PackageDoc};
use crate::item::{package_host, CrawledPackage, CrawledPerson, PushOutcome};
use crate::rpc::wire::calls;
use crate::rpc::{Coordinator, RpcError, RpcResult};
use crate::FetchError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

enum Batch {
    Items(Vec<String>),
    Unavailable,
}

/// Coordinator that serves scripted batches and records every call
#[derive(Default)]
pub struct FakeCoordinator {
    package_batches: Mutex<VecDeque<Batch>>,
    person_batches: Mutex<VecDeque<Batch>>,
    new_package_for: HashSet<String>,
    failing_pushes: HashSet<String>,
    append_limit: Option<usize>,

    pub pushed_packages: Mutex<Vec<String>>,
    pub pushed_persons: Mutex<Vec<String>>,
    pub bad_packages: Mutex<Vec<String>>,
    pub appended: Mutex<Vec<Vec<String>>>,
    pub touched: Mutex<Vec<String>>,
}

impl FakeCoordinator {
    pub fn with_package_batch(self, paths: &[&str]) -> Self {
        push_batch(&self.package_batches, Batch::Items(owned(paths)));
        self
    }

    pub fn with_person_batch(self, ids: &[&str]) -> Self {
        push_batch(&self.person_batches, Batch::Items(owned(ids)));
        self
    }

    pub fn with_unavailable_packages(self) -> Self {
        push_batch(&self.package_batches, Batch::Unavailable);
        self
    }

    pub fn with_unavailable_persons(self) -> Self {
        push_batch(&self.person_batches, Batch::Unavailable);
        self
    }

    /// Pushing this person reports a newly discovered package
    pub fn reporting_new_package(mut self, id: &str) -> Self {
        self.new_package_for.insert(id.to_string());
        self
    }

    /// Pushing this package or person fails
    pub fn failing_push(mut self, key: &str) -> Self {
        self.failing_pushes.insert(key.to_string());
        self
    }

    /// AppendPackages fails once this many calls succeeded
    pub fn failing_append_after(mut self, calls: usize) -> Self {
        self.append_limit = Some(calls);
        self
    }

    pub fn pushed_packages(&self) -> Vec<String> {
        self.pushed_packages.lock().unwrap().clone()
    }

    pub fn pushed_persons(&self) -> Vec<String> {
        self.pushed_persons.lock().unwrap().clone()
    }

    pub fn bad_packages(&self) -> Vec<String> {
        self.bad_packages.lock().unwrap().clone()
    }

    pub fn appended(&self) -> Vec<Vec<String>> {
        self.appended.lock().unwrap().clone()
    }

    fn next(queue: &Mutex<VecDeque<Batch>>, call: &'static str, count: usize) -> RpcResult<Vec<String>> {
        match queue.lock().unwrap().pop_front() {
            Some(Batch::Items(items)) => Ok(items.into_iter().take(count).collect()),
            Some(Batch::Unavailable) => Err(RpcError::Status { call, status: 503 }),
            None => Ok(Vec::new()),
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn push_batch(queue: &Mutex<VecDeque<Batch>>, batch: Batch) {
    queue.lock().unwrap().push_back(batch);
}

#[async_trait]
impl Coordinator for FakeCoordinator {
    async fn fetch_package_list(&self, count: usize) -> RpcResult<Vec<String>> {
        Self::next(&self.package_batches, calls::FETCH_PACKAGE_LIST, count)
    }

    async fn fetch_person_list(&self, count: usize) -> RpcResult<Vec<String>> {
        Self::next(&self.person_batches, calls::FETCH_PERSON_LIST, count)
    }

    async fn append_packages(&self, paths: &[String]) -> RpcResult<usize> {
        let mut appended = self.appended.lock().unwrap();
        if self.append_limit.is_some_and(|limit| appended.len() >= limit) {
            return Err(RpcError::Status {
                call: calls::APPEND_PACKAGES,
                status: 500,
            });
        }
        appended.push(paths.to_vec());
        Ok(paths.len())
    }

    async fn push_package(&self, package: &CrawledPackage) -> RpcResult<()> {
        if self.failing_pushes.contains(&package.import_path) {
            return Err(RpcError::Status {
                call: calls::PUSH_PACKAGE,
                status: 500,
            });
        }
        self.pushed_packages
            .lock()
            .unwrap()
            .push(package.import_path.clone());
        Ok(())
    }

    async fn push_person(&self, person: &CrawledPerson) -> RpcResult<PushOutcome> {
        let id = person.id.encode();
        if self.failing_pushes.contains(&id) {
            return Err(RpcError::Status {
                call: calls::PUSH_PERSON,
                status: 500,
            });
        }
        let new_package = self.new_package_for.contains(&id);
        self.pushed_persons.lock().unwrap().push(id);
        Ok(PushOutcome { new_package })
    }

    async fn report_bad_package(&self, path: &str) -> RpcResult<()> {
        self.bad_packages.lock().unwrap().push(path.to_string());
        Ok(())
    }

    async fn touch_package(&self, path: &str) -> RpcResult<bool> {
        self.touched.lock().unwrap().push(path.to_string());
        Ok(true)
    }
}

#[derive(Default)]
struct Load {
    per_host: HashMap<String, usize>,
    max_per_host: usize,
    total: usize,
    max_total: usize,
}

/// Fetcher that succeeds for every item unless told otherwise
#[derive(Default)]
pub struct FakeFetcher {
    packages: HashMap<String, Result<PackageDoc, FetchError>>,
    delay: Option<Duration>,
    hang: HashSet<String>,
    load: Mutex<Load>,
    package_calls: Mutex<Vec<String>>,
    github_calls: Mutex<Vec<String>>,
    bitbucket_calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with_package(mut self, doc: PackageDoc) -> Self {
        self.packages.insert(doc.import_path.clone(), Ok(doc));
        self
    }

    pub fn with_failure(mut self, path: &str, error: FetchError) -> Self {
        self.packages.insert(path.to_string(), Err(error));
        self
    }

    pub fn not_found(self, path: &str) -> Self {
        self.with_failure(
            path,
            FetchError::NotFound {
                target: path.to_string(),
            },
        )
    }

    /// Every package fetch takes this long
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fetching this package never completes
    pub fn hanging(mut self, path: &str) -> Self {
        self.hang.insert(path.to_string());
        self
    }

    pub fn package_calls(&self) -> Vec<String> {
        self.package_calls.lock().unwrap().clone()
    }

    pub fn github_calls(&self) -> Vec<String> {
        self.github_calls.lock().unwrap().clone()
    }

    pub fn bitbucket_calls(&self) -> Vec<String> {
        self.bitbucket_calls.lock().unwrap().clone()
    }

    /// Highest number of simultaneous fetches against a single host
    pub fn max_per_host(&self) -> usize {
        self.load.lock().unwrap().max_per_host
    }

    /// Highest number of simultaneous fetches overall
    pub fn max_total(&self) -> usize {
        self.load.lock().unwrap().max_total
    }

    fn enter(&self, host: &str) {
        let mut load = self.load.lock().unwrap();
        let current = {
            let n = load.per_host.entry(host.to_string()).or_default();
            *n += 1;
            *n
        };
        load.max_per_host = load.max_per_host.max(current);
        load.total += 1;
        load.max_total = load.max_total.max(load.total);
    }

    fn leave(&self, host: &str) {
        let mut load = self.load.lock().unwrap();
        if let Some(n) = load.per_host.get_mut(host) {
            *n -= 1;
        }
        load.total -= 1;
    }
}

#[async_trait]
impl MetadataFetcher for FakeFetcher {
    async fn package_doc(&self, path: &str) -> Result<PackageDoc, FetchError> {
        self.package_calls.lock().unwrap().push(path.to_string());
        if self.hang.contains(path) {
            std::future::pending::<()>().await;
        }

        let host = package_host(path);
        self.enter(&host);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.leave(&host);

        self.packages.get(path).cloned().unwrap_or_else(|| {
            Ok(PackageDoc {
                name: path.rsplit('/').next().unwrap_or(path).to_string(),
                import_path: path.to_string(),
                ..PackageDoc::default()
            })
        })
    }

    async fn github_projects(&self, username: &str) -> Result<Vec<String>, FetchError> {
        self.github_calls.lock().unwrap().push(username.to_string());
        Ok(vec![format!("github.com/{}/project", username)])
    }

    async fn bitbucket_projects(&self, username: &str) -> Result<Vec<String>, FetchError> {
        self.bitbucket_calls
            .lock()
            .unwrap()
            .push(username.to_string());
        Ok(vec![format!("bitbucket.org/{}/project", username)])
    }
}
