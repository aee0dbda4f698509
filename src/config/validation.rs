use crate::config::types::{
    Config, CoordinatorConfig, CrawlerConfig, FetcherConfig, ImportConfig, SkipListConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_coordinator_config(&config.coordinator)?;
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_skip_list("black-packages", &config.black_packages)?;
    validate_skip_list("fast-mode", &config.fast_mode)?;
    validate_import_config(&config.import)?;

    if let (Some(appended), Some(pushed)) = (config.appended_file(), config.pushed_file()) {
        if appended == pushed {
            return Err(ConfigError::Validation(format!(
                "import appended-file and fast-mode filename must differ, both are '{}'",
                appended
            )));
        }
    }

    if config.user_agent.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent name cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates coordinator configuration
fn validate_coordinator_config(config: &CoordinatorConfig) -> Result<(), ConfigError> {
    validate_http_url("server-addr", &config.server_addr)?;

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl loop configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.entries_per_loop < 1 {
        return Err(ConfigError::Validation(format!(
            "entries-per-loop must be >= 1, got {}",
            config.entries_per_loop
        )));
    }

    if config.max_concurrent_groups < 1 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-groups must be >= 1, got {}",
            config.max_concurrent_groups
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "fetch-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.max_loops == Some(0) {
        return Err(ConfigError::Validation(
            "max-loops must be >= 1 when set (omit it to run forever)".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    validate_http_url("doc-service", &config.doc_service)?;
    validate_http_url("github-api", &config.github_api)?;
    validate_http_url("bitbucket-api", &config.bitbucket_api)?;
    Ok(())
}

fn validate_skip_list(section: &str, config: &SkipListConfig) -> Result<(), ConfigError> {
    if config.enabled && config.filename.as_deref().is_some_and(str::is_empty) {
        return Err(ConfigError::Validation(format!(
            "{} filename cannot be empty",
            section
        )));
    }
    Ok(())
}

fn validate_import_config(config: &ImportConfig) -> Result<(), ConfigError> {
    validate_http_url("listing-url", &config.listing_url)?;

    if config.chunk_size < 1 {
        return Err(ConfigError::Validation(
            "chunk-size must be >= 1".to_string(),
        ));
    }

    if config.appended_file.as_deref().is_some_and(str::is_empty) {
        return Err(ConfigError::Validation(
            "import appended-file cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a value is an absolute http(s) URL
fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", key, value, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            key, value
        )));
    }

    Ok(())
}
