//! Work items and crawl results
//!
//! This module defines what the agent crawls and what it produces:
//! - `WorkItem`: a package import path or a person identity pulled from the coordinator
//! - `CrawledPackage` / `CrawledPerson`: immutable results of a successful fetch
//! - `PushOutcome`: what the coordinator reported back for a push
//!
//! It also hosts the identity codec and the host partitioner.

mod identity;
mod partition;

pub use identity::{decode, encode, PersonId, SEPARATOR};
pub use partition::{package_host, partition, HostGroups};

use std::fmt;

/// A unit of crawl work
///
/// Items are compared by kind and canonical key, so a package and a person
/// never collide even when their keys are spelled alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkItem {
    /// A package import path, e.g. `github.com/user/repo`
    Package { path: String },

    /// A person on a code hosting site
    Person(PersonId),
}

impl WorkItem {
    /// Creates a package work item
    pub fn package(path: impl Into<String>) -> Self {
        Self::Package { path: path.into() }
    }

    /// Canonical key: the import path, or `site:username` for persons
    pub fn key(&self) -> String {
        match self {
            Self::Package { path } => path.clone(),
            Self::Person(id) => id.encode(),
        }
    }

    /// Host this item is fetched from
    pub fn host(&self) -> String {
        match self {
            Self::Package { path } => package_host(path),
            Self::Person(id) => id.site.clone(),
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package { path } => f.write_str(path),
            Self::Person(id) => write!(f, "{}", id),
        }
    }
}

/// A human-readable readme attached to a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readme {
    pub filename: String,
    pub content: String,
}

/// Metadata of a successfully crawled package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawledPackage {
    pub name: String,
    pub import_path: String,
    pub synopsis: String,
    pub doc: String,
    pub project_url: String,

    /// Popularity score (stars on the hosting site)
    pub star_count: u64,

    /// Present only if the readme content is valid text
    pub readme: Option<Readme>,

    pub imports: Vec<String>,
    pub references: Vec<String>,
}

/// Projects attributed to a person
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawledPerson {
    pub id: PersonId,
    pub packages: Vec<String>,
}

/// Coordinator's answer to a person push
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOutcome {
    /// At least one package in the push was new to the coordinator
    pub new_package: bool,
}
