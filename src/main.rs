//! Site-Mirror main entry point
//!
//! This is the command-line interface for the Site-Mirror offline website mirror.

use clap::Parser;
use site_mirror::config::{load_config_with_hash, validate, Config, ContentCategory};
use site_mirror::crawler::{build_http_client, prescan, Coordinator};
use site_mirror::output::print_statistics;
use site_mirror::url::normalize_seed;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Site-Mirror: an offline website mirror
///
/// Site-Mirror crawls a website breadth-first from the given seed URLs, saves
/// every page under a folder named after its title, downloads the images,
/// stylesheets, scripts and videos it embeds, and rewrites links so the
/// result can be browsed offline.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version)]
#[command(about = "An offline website mirror", long_about = None)]
struct Cli {
    /// Seed URLs to start from (space or comma separated)
    #[arg(value_name = "SEEDS", value_delimiter = ',')]
    seeds: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short = 'C', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory the mirror is written into
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Which embedded resources to download
    #[arg(short, long, value_enum)]
    category: Option<ContentCategory>,

    /// Number of pages processed concurrently
    #[arg(short, long)]
    workers: Option<u32>,

    /// Stop after this many pages
    #[arg(long)]
    max_pages: Option<u32>,

    /// Maximum number of link hops from a seed
    #[arg(long)]
    max_depth: Option<u32>,

    /// Also crawl links that leave the seed's host
    #[arg(long)]
    follow_external: bool,

    /// Total attempts per page or resource fetch
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Delay between fetch attempts, in milliseconds
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Report which content categories the seeds offer and exit
    #[arg(long, conflicts_with = "dry_run")]
    prescan: bool,

    /// Validate the configuration and show what would be mirrored
    #[arg(long, conflicts_with = "prescan")]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e);
        }
    };

    if config.seeds.is_empty() {
        tracing::error!("No seed URLs given");
        return Err("no seed URLs given (pass them as arguments or set `seeds` in the config file)".into());
    }

    if cli.prescan {
        handle_prescan(&config).await?;
    } else if cli.dry_run {
        handle_dry_run(&config);
    } else {
        handle_mirror(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            2 => EnvFilter::new("site_mirror=trace,debug"),
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

/// Loads the config file (if any), applies command-line overrides and validates
fn build_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if !cli.seeds.is_empty() {
        config.seeds = cli.seeds.clone();
    }
    if let Some(output) = &cli.output {
        config.output.root = output.to_string_lossy().into_owned();
    }
    if let Some(category) = cli.category {
        config.output.category = category;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if cli.max_pages.is_some() {
        config.crawler.max_pages = cli.max_pages;
    }
    if cli.max_depth.is_some() {
        config.crawler.max_depth = cli.max_depth;
    }
    if cli.follow_external {
        config.crawler.follow_external = true;
    }
    if let Some(max_attempts) = cli.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    if let Some(delay_ms) = cli.retry_delay_ms {
        config.retry.delay_ms = delay_ms;
    }

    validate(&config)?;
    Ok(config)
}

/// Handles the --prescan mode: reports the content categories of each seed
async fn handle_prescan(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let client = build_http_client(
        &config.user_agent,
        Duration::from_secs(config.crawler.request_timeout_secs),
    )?;

    println!("=== Site-Mirror Pre-scan ===\n");
    for seed in &config.seeds {
        let url = normalize_seed(seed)?;
        let categories = prescan(&client, url.as_str()).await;
        if categories.is_empty() {
            println!("{}: could not be scanned", url);
        } else {
            let names: Vec<_> = categories.iter().map(|c| c.as_str()).collect();
            println!("{}: {}", url, names.join(", "));
        }
    }

    Ok(())
}

/// Handles the --dry-run mode: shows what would be mirrored
fn handle_dry_run(config: &Config) {
    println!("=== Site-Mirror Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Resource concurrency: {}", config.crawler.resource_concurrency);
    match config.crawler.max_pages {
        Some(limit) => println!("  Max pages: {}", limit),
        None => println!("  Max pages: unbounded"),
    }
    match config.crawler.max_depth {
        Some(limit) => println!("  Max depth: {}", limit),
        None => println!("  Max depth: unbounded"),
    }
    println!("  Follow external links: {}", config.crawler.follow_external);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    println!("\nRetries:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Delay: {}ms", config.retry.delay_ms);

    println!("\nUser Agent: {}", config.user_agent);

    println!("\nOutput:");
    println!("  Root: {}", config.output.root);
    println!("  Category: {}", config.output.category);

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed.trim());
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main mirror operation
async fn handle_mirror(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Mirroring {} seed(s) into {} (category: {})",
        config.seeds.len(),
        config.output.root,
        config.output.category
    );

    let token = CancellationToken::new();
    let mut coordinator = Coordinator::new(config)?.with_cancellation(token.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing pages in flight");
            token.cancel();
        }
    });

    match coordinator.run().await {
        Ok(stats) => {
            tracing::info!("Mirror completed successfully");
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Mirror failed: {}", e);
            Err(e.into())
        }
    }
}
