//! Bulk import of a public package listing into the coordinator's queue
//!
//! The listing is a JSON document `{"results": [{"path": ...}, ...]}`. Paths
//! already blacklisted or already appended by an earlier import are dropped,
//! the rest are shuffled and appended in fixed-size chunks.
//!
//! The appended record is the import's own skip set. It is never the crawl
//! loop's fast-mode set: an appended path is queued, not crawled.

use crate::config::ImportConfig;
use crate::rpc::Coordinator;
use crate::storage::SkipSet;
use crate::FetchError;
use rand::seq::SliceRandom;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    results: Vec<ListedPackage>,
}

#[derive(Debug, Deserialize)]
struct ListedPackage {
    path: String,
}

/// Totals of one import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Paths in the listing
    pub listed: usize,

    /// Paths left after filtering
    pub selected: usize,

    /// Paths sent through AppendPackages
    pub appended: usize,

    /// Paths the coordinator did not know yet
    pub new_packages: usize,

    /// Every selected path was sent
    pub completed: bool,
}

/// Downloads the package listing
pub async fn fetch_listing(client: &Client, url: &str) -> Result<Vec<String>, FetchError> {
    tracing::info!("Fetching package listing {} ...", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::transient(url, e))?;

    match response.status() {
        StatusCode::OK => {}
        StatusCode::NOT_FOUND => {
            return Err(FetchError::NotFound {
                target: url.to_string(),
            })
        }
        status => return Err(FetchError::transient(url, format!("HTTP {}", status))),
    }

    let listing: Listing = response
        .json()
        .await
        .map_err(|e| FetchError::transient(url, e))?;

    Ok(listing.results.into_iter().map(|p| p.path).collect())
}

/// Drops skipped paths and shuffles the remainder
pub fn select_paths(
    listed: Vec<String>,
    blacklist: Option<&SkipSet>,
    appended: Option<&SkipSet>,
) -> Vec<String> {
    let mut paths: Vec<String> = listed
        .into_iter()
        .filter(|path| {
            !path.is_empty()
                && !blacklist.is_some_and(|set| set.contains(path))
                && !appended.is_some_and(|set| set.contains(path))
        })
        .collect();

    paths.shuffle(&mut rand::thread_rng());
    paths
}

/// Appends paths chunk by chunk, stopping at the first failed call
///
/// Appended paths are recorded in `appended`, which is saved after every chunk.
pub async fn append_in_chunks(
    coordinator: &dyn Coordinator,
    paths: &[String],
    chunk_size: usize,
    appended: Option<&SkipSet>,
) -> ImportSummary {
    let mut summary = ImportSummary {
        selected: paths.len(),
        ..ImportSummary::default()
    };

    for chunk in paths.chunks(chunk_size.max(1)) {
        let new_packages = match coordinator.append_packages(chunk).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("AppendPackages failed: {}", e);
                return summary;
            }
        };

        summary.new_packages += new_packages;
        summary.appended += chunk.len();
        tracing::info!(
            "New packages: {}/{}",
            summary.new_packages,
            summary.appended
        );

        if let Some(record) = appended {
            for path in chunk {
                record.insert(path.as_str());
            }
            match record.save() {
                Ok(()) => tracing::info!(
                    "{} appended packages saved to {}",
                    record.len(),
                    record.path().display()
                ),
                Err(e) => tracing::warn!("Saving {} failed: {}", record.path().display(), e),
            }
        }
    }

    summary.completed = true;
    summary
}

/// Runs a full import: fetch, filter, shuffle, append
pub async fn import_listing(
    client: &Client,
    coordinator: &dyn Coordinator,
    config: &ImportConfig,
    blacklist: Option<&SkipSet>,
    appended: Option<&SkipSet>,
) -> crate::Result<ImportSummary> {
    let listed = fetch_listing(client, &config.listing_url).await?;
    let total = listed.len();

    let paths = select_paths(listed, blacklist, appended);
    tracing::info!("{} packages found, {} to append", total, paths.len());

    let summary = append_in_chunks(coordinator, &paths, config.chunk_size, appended).await;
    Ok(ImportSummary {
        listed: total,
        ..summary
    })
}
