use serde::Deserialize;
use std::time::Duration;

/// Default blacklist file name
pub const DEFAULT_BLACKLIST_FILE: &str = "black_pkgs.json";

/// Default file name for the set of already-pushed packages
pub const DEFAULT_PUSHED_FILE: &str = "pushed_pkgs.json";

/// Main configuration structure for the crawl agent
///
/// Built once at startup and passed by reference; nothing reads
/// configuration from global state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,

    #[serde(default)]
    pub fetcher: FetcherConfig,

    #[serde(default, rename = "black-packages")]
    pub black_packages: SkipListConfig,

    #[serde(default, rename = "fast-mode")]
    pub fast_mode: SkipListConfig,

    #[serde(default)]
    pub import: ImportConfig,
}

impl Config {
    /// Blacklist file, if blacklist mode is enabled
    pub fn blacklist_file(&self) -> Option<&str> {
        self.black_packages.file(DEFAULT_BLACKLIST_FILE)
    }

    /// Already-pushed file, if fast mode is enabled
    pub fn pushed_file(&self) -> Option<&str> {
        self.fast_mode.file(DEFAULT_PUSHED_FILE)
    }

    /// File recording the paths earlier imports appended, if any
    pub fn appended_file(&self) -> Option<&str> {
        self.import.appended_file.as_deref()
    }
}

/// Where the coordinator lives and how to reach it
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    /// Base URL of the coordinator
    #[serde(rename = "server-addr", default = "default_server_addr")]
    pub server_addr: String,

    /// Optional proxy for all outbound requests
    #[serde(default)]
    pub proxy: Option<String>,

    /// Timeout for a single HTTP request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Accept invalid TLS certificates
    #[serde(rename = "accept-invalid-certs", default)]
    pub accept_invalid_certs: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            proxy: None,
            request_timeout_secs: default_request_timeout(),
            accept_invalid_certs: false,
        }
    }
}

/// Crawl loop behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of items pulled per batch and cycle
    #[serde(rename = "entries-per-loop", default = "default_entries_per_loop")]
    pub entries_per_loop: usize,

    /// How long to rest when there is nothing to do (seconds)
    #[serde(rename = "rest-seconds", default = "default_rest_seconds")]
    pub rest_seconds: u64,

    /// Number of rests before the loop stops; absent means run forever
    #[serde(rename = "max-loops", default)]
    pub max_loops: Option<u32>,

    /// Maximum number of host groups crawled at the same time
    #[serde(rename = "max-concurrent-groups", default = "default_max_concurrent_groups")]
    pub max_concurrent_groups: usize,

    /// Deadline for fetching a single item (seconds)
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl CrawlerConfig {
    pub fn rest_duration(&self) -> Duration {
        Duration::from_secs(self.rest_seconds)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            entries_per_loop: default_entries_per_loop(),
            rest_seconds: default_rest_seconds(),
            max_loops: None,
            max_concurrent_groups: default_max_concurrent_groups(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

/// User agent identification
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(default = "default_user_agent")]
    pub name: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: default_user_agent(),
        }
    }
}

/// Endpoints of the metadata sources
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Service answering package documentation queries
    #[serde(rename = "doc-service", default = "default_doc_service")]
    pub doc_service: String,

    #[serde(rename = "github-api", default = "default_github_api")]
    pub github_api: String,

    #[serde(rename = "bitbucket-api", default = "default_bitbucket_api")]
    pub bitbucket_api: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            doc_service: default_doc_service(),
            github_api: default_github_api(),
            bitbucket_api: default_bitbucket_api(),
        }
    }
}

/// A persisted skip list that can be switched on
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkipListConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub filename: Option<String>,
}

impl SkipListConfig {
    fn file<'a>(&'a self, default: &'a str) -> Option<&'a str> {
        self.enabled
            .then(|| self.filename.as_deref().unwrap_or(default))
    }
}

/// Bulk import of a public package listing
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(rename = "listing-url", default = "default_listing_url")]
    pub listing_url: String,

    /// Paths sent per AppendPackages call
    #[serde(rename = "chunk-size", default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Paths already appended by earlier imports; absent means no record is kept
    ///
    /// Kept apart from the fast-mode file: an appended path has not been
    /// crawled yet, so the crawl loop must not skip it.
    #[serde(rename = "appended-file", default)]
    pub appended_file: Option<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            chunk_size: default_chunk_size(),
            appended_file: None,
        }
    }
}

fn default_server_addr() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_entries_per_loop() -> usize {
    10
}

fn default_rest_seconds() -> u64 {
    60
}

fn default_max_concurrent_groups() -> usize {
    16
}

fn default_fetch_timeout() -> u64 {
    120
}

fn default_user_agent() -> String {
    "Go-Code-Search-Agent".to_string()
}

fn default_doc_service() -> String {
    "http://localhost:8081".to_string()
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_bitbucket_api() -> String {
    "https://api.bitbucket.org/2.0".to_string()
}

fn default_listing_url() -> String {
    "http://api.godoc.org/packages".to_string()
}

fn default_chunk_size() -> usize {
    200
}
