//! Crawl Agent main entry point
//!
//! This is the command-line interface of a crawler agent working for a
//! code-search coordinator.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crawl_agent::config::{load_config_with_hash, Config};
use crawl_agent::crawler::{
    build_http_client, crawl_one_package, crawl_one_person, import_listing, touch_package,
    CrawlContext, HttpFetcher, Scheduler,
};
use crawl_agent::rpc::HttpCoordinator;
use crawl_agent::storage::load_optional;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Crawl Agent: pulls work from a coordinator, crawls it and pushes results back
///
/// Package import paths and person identities are fetched in batches, grouped
/// by host so that no host sees concurrent requests, and crawled in parallel
/// across hosts. The agent rests whenever the coordinator runs out of work.
#[derive(Parser, Debug)]
#[command(name = "crawl-agent")]
#[command(version = "1.0.0")]
#[command(about = "Crawler agent for a code-search coordinator", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pull, crawl and push batches until the run budget is spent
    Run,

    /// Crawl and push a single package
    Package {
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Crawl and push a single person given as site:username
    Person {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Ask the coordinator to crawl a package soon
    Touch {
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Append a public package listing to the coordinator's queue
    Import,

    /// Validate the configuration and print the effective settings
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let agent = Agent::connect(&config)?;

    match cli.command {
        Command::Run => agent.run(&config).await,
        Command::Package { path } => agent.package(&config, &path).await,
        Command::Person { id } => agent.person(&config, &id).await,
        Command::Touch { path } => agent.touch(&path).await,
        Command::Import => agent.import(&config).await,
        Command::Check => {
            print_config(&config);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_agent=info,warn"),
            1 => EnvFilter::new("crawl_agent=debug,info"),
            2 => EnvFilter::new("crawl_agent=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Clients shared by every command
struct Agent {
    client: Client,
    coordinator: Arc<HttpCoordinator>,
    fetcher: Arc<HttpFetcher>,
}

impl Agent {
    fn connect(config: &Config) -> anyhow::Result<Self> {
        let client = build_http_client(config).context("failed to build HTTP client")?;
        tracing::info!("Server: {}", config.coordinator.server_addr);

        Ok(Self {
            coordinator: Arc::new(HttpCoordinator::new(
                client.clone(),
                &config.coordinator.server_addr,
            )),
            fetcher: Arc::new(HttpFetcher::new(client.clone(), &config.fetcher)),
            client,
        })
    }

    fn context(&self, config: &Config) -> CrawlContext {
        CrawlContext::new(
            self.coordinator.clone(),
            self.fetcher.clone(),
            config.crawler.fetch_timeout(),
        )
        .with_blacklist(load_optional(config.blacklist_file()))
    }

    async fn run(&self, config: &Config) -> anyhow::Result<()> {
        let ctx = self
            .context(config)
            .with_seen(load_optional(config.pushed_file()));

        tracing::info!(
            "Crawling {} entries per loop, at most {} hosts at once",
            config.crawler.entries_per_loop,
            config.crawler.max_concurrent_groups
        );
        Scheduler::new(Arc::new(ctx), &config.crawler).run().await;
        Ok(())
    }

    async fn package(&self, config: &Config, path: &str) -> anyhow::Result<()> {
        let outcome = crawl_one_package(&self.context(config), path).await;
        println!("{}: {:?}", path, outcome);
        Ok(())
    }

    async fn person(&self, config: &Config, id: &str) -> anyhow::Result<()> {
        let outcome = crawl_one_person(&self.context(config), id).await?;
        println!("{}: {:?}", id, outcome);
        Ok(())
    }

    async fn touch(&self, path: &str) -> anyhow::Result<()> {
        let scheduled = touch_package(self.coordinator.as_ref(), path).await?;
        println!("{}: scheduled early: {}", path, scheduled);
        Ok(())
    }

    async fn import(&self, config: &Config) -> anyhow::Result<()> {
        let blacklist = load_optional(config.blacklist_file());
        let appended = load_optional(config.appended_file());

        let summary = import_listing(
            &self.client,
            self.coordinator.as_ref(),
            &config.import,
            blacklist.as_deref(),
            appended.as_deref(),
        )
        .await
        .with_context(|| format!("import from {} failed", config.import.listing_url))?;

        println!(
            "Listed: {}, selected: {}, appended: {}, new: {}{}",
            summary.listed,
            summary.selected,
            summary.appended,
            summary.new_packages,
            if summary.completed { "" } else { " (interrupted)" }
        );
        Ok(())
    }
}

/// Prints the effective configuration
fn print_config(config: &Config) {
    println!("=== Crawl Agent Configuration ===\n");

    println!("Coordinator:");
    println!("  Server: {}", config.coordinator.server_addr);
    println!(
        "  Proxy: {}",
        config.coordinator.proxy.as_deref().unwrap_or("none")
    );
    println!(
        "  Request timeout: {}s",
        config.coordinator.request_timeout_secs
    );

    println!("\nCrawler:");
    println!("  Entries per loop: {}", config.crawler.entries_per_loop);
    println!("  Rest: {}s", config.crawler.rest_seconds);
    match config.crawler.max_loops {
        Some(n) => println!("  Max loops: {}", n),
        None => println!("  Max loops: unbounded"),
    }
    println!(
        "  Max concurrent groups: {}",
        config.crawler.max_concurrent_groups
    );
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);

    println!("\nUser Agent: {}", config.user_agent.name);

    println!("\nFetcher:");
    println!("  Doc service: {}", config.fetcher.doc_service);
    println!("  GitHub API: {}", config.fetcher.github_api);
    println!("  Bitbucket API: {}", config.fetcher.bitbucket_api);

    println!("\nSkip lists:");
    println!(
        "  Blacklist: {}",
        config.blacklist_file().unwrap_or("disabled")
    );
    println!("  Fast mode: {}", config.pushed_file().unwrap_or("disabled"));
    println!(
        "  Import record: {}",
        config.appended_file().unwrap_or("disabled")
    );

    println!("\n✓ Configuration is valid");
}
