//! Metadata fetch capability
//!
//! This module handles everything the agent fetches from sources other than
//! the coordinator:
//! - Building the shared HTTP client (user agent, proxy, timeouts)
//! - The [`MetadataFetcher`] seam and its HTTP implementation
//! - Turning raw package documents into [`CrawledPackage`] records
//! - Dispatching person crawls to the right hosting site

use crate::config::{Config, FetcherConfig};
use crate::item::{CrawledPackage, CrawledPerson, PersonId, Readme};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::{Client, Proxy, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Site name handled by [`MetadataFetcher::github_projects`]
pub const GITHUB: &str = "github.com";

/// Site name handled by [`MetadataFetcher::bitbucket_projects`]
pub const BITBUCKET: &str = "bitbucket.org";

/// Raw documentation of a package as served by the doc service
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PackageDoc {
    pub name: String,
    pub import_path: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub project_url: String,
    #[serde(default)]
    pub star_count: u64,
    #[serde(default)]
    pub readme_files: Vec<ReadmeFile>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

/// A readme file with its raw bytes
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ReadmeFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Outcome of a person crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonFetch {
    Crawled(CrawledPerson),

    /// The site is neither GitHub nor Bitbucket; nothing was fetched
    UnsupportedSite(String),
}

/// Source of package and person metadata
///
/// This is the extraction capability the crawl loop drives; it does not
/// talk to the coordinator.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetches the documentation of one package
    async fn package_doc(&self, path: &str) -> Result<PackageDoc, FetchError>;

    /// Lists the import paths of a GitHub user's projects
    async fn github_projects(&self, username: &str) -> Result<Vec<String>, FetchError>;

    /// Lists the import paths of a Bitbucket user's projects
    async fn bitbucket_projects(&self, username: &str) -> Result<Vec<String>, FetchError>;
}

/// Builds the HTTP client shared by the coordinator client and the fetcher
///
/// # Arguments
///
/// * `config` - The agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Invalid proxy or TLS setup
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.name.as_str())
        .timeout(Duration::from_secs(config.coordinator.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .danger_accept_invalid_certs(config.coordinator.accept_invalid_certs);

    if let Some(proxy) = &config.coordinator.proxy {
        tracing::info!("Using proxy: {}", proxy);
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

/// Fetches a package and converts it into a pushable record
///
/// The first readme whose bytes are valid UTF-8 is kept; binary readmes are
/// dropped.
pub async fn crawl_package(
    fetcher: &dyn MetadataFetcher,
    path: &str,
) -> Result<CrawledPackage, FetchError> {
    let doc = fetcher.package_doc(path).await?;

    let readme = doc.readme_files.into_iter().find_map(|file| {
        String::from_utf8(file.data).ok().map(|content| Readme {
            filename: file.filename,
            content,
        })
    });

    Ok(CrawledPackage {
        name: doc.name,
        import_path: doc.import_path,
        synopsis: doc.synopsis,
        doc: doc.doc,
        project_url: doc.project_url,
        star_count: doc.star_count,
        readme,
        imports: doc.imports,
        references: doc.references,
    })
}

/// Fetches the projects of a person
///
/// Only GitHub and Bitbucket are supported. Any other site yields
/// [`PersonFetch::UnsupportedSite`] without touching the network.
pub async fn crawl_person(
    fetcher: &dyn MetadataFetcher,
    id: &PersonId,
) -> Result<PersonFetch, FetchError> {
    let packages = match id.site.as_str() {
        GITHUB => fetcher.github_projects(&id.username).await?,
        BITBUCKET => fetcher.bitbucket_projects(&id.username).await?,
        other => return Ok(PersonFetch::UnsupportedSite(other.to_string())),
    };

    Ok(PersonFetch::Crawled(CrawledPerson {
        id: id.clone(),
        packages,
    }))
}

#[derive(Debug, Deserialize)]
struct Repository {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketPage {
    #[serde(default)]
    values: Vec<Repository>,
}

/// Appends path segments to an API base URL
///
/// Each segment is percent-encoded on its own, so a `/`, `?` or `#` inside a
/// username can never change which endpoint is hit.
fn api_url(base: &str, segments: &[&str]) -> Result<Url, FetchError> {
    let mut url = Url::parse(base).map_err(|e| FetchError::transient(base, e))?;
    url.path_segments_mut()
        .map_err(|()| FetchError::transient(base, "not a base URL"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Rejects usernames that cannot name an account
///
/// Dot segments are dropped by URL path normalisation, so they are refused
/// here rather than silently requesting a different endpoint.
fn check_username(target: &str, username: &str) -> Result<(), FetchError> {
    match username {
        "" | "." | ".." => Err(FetchError::NotFound {
            target: target.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Fetcher backed by a doc service and the hosting sites' public APIs
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    doc_service: String,
    github_api: String,
    bitbucket_api: String,
}

impl HttpFetcher {
    pub fn new(client: Client, config: &FetcherConfig) -> Self {
        Self {
            client,
            doc_service: config.doc_service.trim_end_matches('/').to_string(),
            github_api: config.github_api.trim_end_matches('/').to_string(),
            bitbucket_api: config.bitbucket_api.trim_end_matches('/').to_string(),
        }
    }

    /// GETs a JSON document, mapping 404 to [`FetchError::NotFound`]
    async fn get_json<T: DeserializeOwned + Send>(
        &self,
        target: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::transient(target, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound {
                target: target.to_string(),
            }),
            status if !status.is_success() => {
                Err(FetchError::transient(target, format!("HTTP {}", status)))
            }
            _ => response
                .json::<T>()
                .await
                .map_err(|e| FetchError::transient(target, e)),
        }
    }
}

#[async_trait]
impl MetadataFetcher for HttpFetcher {
    async fn package_doc(&self, path: &str) -> Result<PackageDoc, FetchError> {
        let request = self
            .client
            .get(format!("{}/package", self.doc_service))
            .query(&[("path", path)]);
        self.get_json(path, request).await
    }

    async fn github_projects(&self, username: &str) -> Result<Vec<String>, FetchError> {
        let target = format!("{}:{}", GITHUB, username);
        check_username(&target, username)?;
        let url = api_url(&self.github_api, &["users", username, "repos"])?;
        let request = self.client.get(url).query(&[("per_page", "100")]);

        let repos: Vec<Repository> = self.get_json(&target, request).await?;
        Ok(repos
            .into_iter()
            .map(|r| format!("{}/{}", GITHUB, r.full_name))
            .collect())
    }

    async fn bitbucket_projects(&self, username: &str) -> Result<Vec<String>, FetchError> {
        let target = format!("{}:{}", BITBUCKET, username);
        check_username(&target, username)?;
        let url = api_url(&self.bitbucket_api, &["repositories", username])?;
        let request = self.client.get(url);

        let page: BitbucketPage = self.get_json(&target, request).await?;
        Ok(page
            .values
            .into_iter()
            .map(|r| format!("{}/{}", BITBUCKET, r.full_name))
            .collect())
    }
}
