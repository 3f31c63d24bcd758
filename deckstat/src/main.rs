//! deckstat - decklist affinity statistics
//!
//! Collects decklists from the catalog (or the local store), deduplicates
//! them by content and writes investigator and card affinity reports.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use deckstat::workflow::PipelineOrchestrator;
use deckstat_common::config::{BackoffKind, ConfigOverrides, ConfigResolver, ENV_LOG_LEVEL};
use deckstat_common::EventBus;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for deckstat
#[derive(Parser, Debug)]
#[command(name = "deckstat")]
#[command(about = "Decklist affinity statistics")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "DECKSTAT_CONFIG")]
    config: Option<PathBuf>,

    /// Durable record store root
    #[arg(long, env = "DECKSTAT_STORE_ROOT")]
    store_root: Option<PathBuf>,

    /// Directory for reports and aggregate documents
    #[arg(short, long, env = "DECKSTAT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Catalog API base URL
    #[arg(long, env = "DECKSTAT_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Worker tasks per phase
    #[arg(short, long, env = "DECKSTAT_WORKERS")]
    workers: Option<usize>,

    /// First deck id of the range (inclusive)
    #[arg(long, env = "DECKSTAT_FIRST_DECK_ID", requires = "last", conflicts_with = "from_store")]
    first: Option<u64>,

    /// Last deck id of the range (inclusive)
    #[arg(long, env = "DECKSTAT_LAST_DECK_ID", requires = "first", conflicts_with = "from_store")]
    last: Option<u64>,

    /// Process every decklist already in the store instead of a range
    #[arg(long)]
    from_store: bool,

    /// Relevance threshold for reports (0.0-1.0)
    #[arg(long, env = "DECKSTAT_RELEVANCE")]
    relevance: Option<f64>,

    /// Attempts per remote fetch
    #[arg(long, env = "DECKSTAT_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,

    /// Base delay between fetch attempts in milliseconds
    #[arg(long, env = "DECKSTAT_RETRY_DELAY_MS")]
    retry_delay_ms: Option<u64>,

    /// Delay growth between fetch attempts (fixed, incremental)
    #[arg(long, env = "DECKSTAT_BACKOFF")]
    backoff: Option<BackoffKind>,

    /// Minimum spacing between catalog requests in milliseconds
    #[arg(long, env = "DECKSTAT_REQUEST_INTERVAL_MS")]
    request_interval_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, env = "DECKSTAT_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    /// Skip writing per-investigator report files
    #[arg(long)]
    no_reports: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = ENV_LOG_LEVEL)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_base_url: self.api_base_url.clone(),
            store_root: self.store_root.clone(),
            output_dir: self.output_dir.clone(),
            worker_count: self.workers,
            first_deck_id: self.first,
            last_deck_id: self.last,
            from_store: self.from_store,
            relevance_threshold: self.relevance,
            max_attempts: self.max_attempts,
            retry_delay_ms: self.retry_delay_ms,
            backoff: self.backoff,
            request_interval_ms: self.request_interval_ms,
            request_timeout_secs: self.request_timeout_secs,
            write_reports: self.no_reports.then_some(false),
            log_level: self.log_level.clone(),
        }
    }
}

/// Filter directives enabling `level` for both deckstat crates
fn filter_directives(level: &str) -> String {
    format!("deckstat={0},deckstat_common={0}", level)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Tracing is up before the config is resolved. RUST_LOG wins, then
    // --log-level or DECKSTAT_LOG_LEVEL. Otherwise start at info and switch
    // to the configured level once the file has been read.
    let rust_log = EnvFilter::try_from_default_env().ok();
    let follow_config = rust_log.is_none() && args.log_level.is_none();
    let initial = rust_log.unwrap_or_else(|| {
        EnvFilter::new(filter_directives(args.log_level.as_deref().unwrap_or("info")))
    });
    let (filter, filter_handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ConfigResolver::new(args.config.clone())
        .resolve(&args.overrides())
        .context("Failed to resolve configuration")?;

    if follow_config {
        filter_handle
            .reload(EnvFilter::new(filter_directives(&config.log_level)))
            .context("Failed to apply configured log level")?;
    }

    info!(
        "Starting deckstat v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Store: {}", config.store_root.display());
    info!("Output: {}", config.output_dir.display());

    let workers = config.worker_count;
    let orchestrator = PipelineOrchestrator::from_config(config, EventBus::default())
        .await
        .context("Failed to initialize pipeline")?;

    let summary = orchestrator.run().await.context("Pipeline failed")?;
    let stats = &summary.statistics;

    println!("Unique decks: {}", stats.unique_decks);
    println!("Duplicated decks: {}", stats.duplicate_decks);
    println!("Total decks: {}", stats.total_decks());
    println!("Threads: {}", workers);
    println!("Runtime: {:.3} seconds", stats.elapsed_ms as f64 / 1000.0);

    Ok(())
}
