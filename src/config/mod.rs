//! Configuration module for the crawl agent
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; missing keys fall back to defaults.
//!
//! # Example
//!
//! ```no_run
//! use crawl_agent::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("agent.toml")).unwrap();
//! println!("Pulling {} entries per loop", config.crawler.entries_per_loop);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CoordinatorConfig, CrawlerConfig, FetcherConfig, ImportConfig, SkipListConfig,
    UserAgentConfig, DEFAULT_BLACKLIST_FILE, DEFAULT_PUSHED_FILE,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
