//! Article-Harvest main entry point
//!
//! This is the command-line interface for the Article-Harvest news crawler.

use anyhow::{bail, Context};
use article_harvest::analysis::{
    score_articles, trend_points, ChartRenderer, ScoredArticle, SvgScatterRenderer, VaderScorer,
};
use article_harvest::config::{load_config_with_hash, Config};
use article_harvest::crawler::{crawl, CrawlReport};
use article_harvest::output::{generate_markdown_summary, print_statistics, write_json, RunSummary};
use article_harvest::storage::{ArticleStore, SqliteArchive};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Article-Harvest: a polite two-stage news crawler
///
/// Article-Harvest fetches a site's category listing pages, follows each
/// article link one level down, and extracts structured article records
/// through the field mapping in the configuration file. Articles are scored
/// for sentiment and written to JSON, a markdown summary, an SQLite archive
/// and a trend chart, as configured.
#[derive(Parser, Debug)]
#[command(name = "article-harvest")]
#[command(version)]
#[command(about = "A polite two-stage news crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Category to crawl; repeat for several (defaults to the configured categories)
    #[arg(short, long = "category", value_name = "NAME")]
    categories: Vec<String>,

    /// Maximum detail pages per category (0 = unlimited)
    #[arg(short, long, default_value_t = 0)]
    limit: usize,

    /// Stop the harvest after this many seconds, keeping what has finished
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the archive and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, &cli.categories, cli.limit);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(&config, &cli, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG`, when set, takes precedence over the flags.
fn setup_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        // Only show errors
        "error"
    } else {
        match verbose {
            0 => "article_harvest=info,warn",
            1 => "article_harvest=debug,info",
            2 => "article_harvest=trace,debug",
            _ => "trace",
        }
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn selected_categories<'a>(config: &'a Config, requested: &'a [String]) -> &'a [String] {
    if requested.is_empty() {
        &config.site.categories
    } else {
        requested
    }
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, requested: &[String], limit: usize) {
    println!("=== Article-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Parallelism: {}", config.crawler.parallelism);
    println!(
        "  Per-domain concurrency: {}",
        config.crawler.per_domain_concurrency
    );
    println!(
        "  Delay: {}ms + up to {}ms random",
        config.crawler.delay_ms, config.crawler.random_delay_ms
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nAllowed Domains ({}):", config.site.allowed_domains.len());
    for domain in &config.site.allowed_domains {
        println!("  - {}", domain);
    }

    println!("\nField Mapping:");
    println!("  Listing item: {}", config.mapping.listing.item);
    println!(
        "  Detail link: {} [{}]",
        config.mapping.listing.link.selector, config.mapping.listing.link.attr
    );
    println!("  Preview rules: {}", config.mapping.listing.preview.len());
    println!("  Detail rules: {}", config.mapping.detail.len());

    let show = |label: &str, path: &Option<String>| {
        println!("  {}: {}", label, path.as_deref().unwrap_or("(disabled)"));
    };
    println!("\nOutput:");
    show("JSON", &config.output.json_path);
    show("Summary", &config.output.summary_path);
    show("Archive", &config.output.archive_path);
    show("Chart", &config.output.chart_path);

    let categories = selected_categories(config, requested);
    println!("\nCategories ({}):", categories.len());
    for category in categories {
        println!("  - {} -> {}", category, config.site.listing_url(category));
    }

    println!("\n✓ Configuration is valid");
    if limit == 0 {
        println!("✓ Would follow every article link on each listing page");
    } else {
        println!("✓ Would follow up to {} article links per category", limit);
    }
}

/// Handles the --stats mode: shows statistics from the archive
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let Some(path) = config.output.archive_path.as_deref() else {
        bail!("no archive configured; set output.archive-path");
    };
    println!("Archive: {}\n", path);

    let archive = SqliteArchive::new(Path::new(path))
        .with_context(|| format!("failed to open archive {}", path))?;
    let stats = archive.archive_stats()?;
    let latest = archive.get_latest_run()?;

    print_statistics(&stats, latest.as_ref());

    Ok(())
}

/// Cancels the token on Ctrl-C or when the deadline passes
fn spawn_cancellation(cancel: &CancellationToken, timeout_secs: Option<u64>) {
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight work");
            token.cancel();
        }
    });

    if let Some(secs) = timeout_secs {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::warn!("Deadline of {}s reached, stopping harvest", secs);
            token.cancel();
        });
    }
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, cli: &Cli, config_hash: &str) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    spawn_cancellation(&cancel, cli.timeout_secs);

    let categories = selected_categories(config, &cli.categories);
    tracing::info!(
        "Harvesting {} categories (limit: {})",
        categories.len(),
        cli.limit
    );

    let results = crawl(config, categories, cli.limit, Some(config_hash), &cancel).await?;

    let mut reports: Vec<CrawlReport> = Vec::new();
    let mut failed: Vec<(String, String)> = Vec::new();
    for (category, result) in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                tracing::error!("Category '{}' failed: {}", category, e);
                failed.push((category, e.to_string()));
            }
        }
    }

    let articles: Vec<_> = reports
        .iter()
        .flat_map(|r| r.articles.iter().cloned())
        .collect();
    let scored = score_articles(&articles, &VaderScorer::default());

    write_outputs(config, &reports, &failed, &scored)?;

    let warnings: usize = reports.iter().map(|r| r.warnings.len()).sum();
    println!(
        "Harvested {} articles from {} categories ({} warnings, {} failed)",
        articles.len(),
        reports.len(),
        warnings,
        failed.len()
    );
    if cancel.is_cancelled() {
        println!("Harvest was stopped early; results are partial");
    }

    if reports.is_empty() && !failed.is_empty() {
        bail!("every category listing failed");
    }
    Ok(())
}

/// Writes every configured output sink
fn write_outputs(
    config: &Config,
    reports: &[CrawlReport],
    failed: &[(String, String)],
    scored: &[ScoredArticle],
) -> anyhow::Result<()> {
    let output = &config.output;

    if let Some(path) = &output.json_path {
        write_json(scored, Path::new(path))?;
    }

    if let Some(path) = &output.summary_path {
        let summary = RunSummary {
            reports,
            failed_categories: failed,
            scored,
        };
        generate_markdown_summary(&summary, Path::new(path))?;
    }

    // The archive, when present, gives the chart history beyond this run
    let points = match &output.archive_path {
        Some(path) => {
            let mut archive = SqliteArchive::new(Path::new(path))
                .with_context(|| format!("failed to open archive {}", path))?;
            for report in reports {
                archive.save_report(report, scored)?;
            }
            archive.load_trend(None)?
        }
        None => trend_points(scored),
    };

    if let Some(path) = &output.chart_path {
        SvgScatterRenderer::default().render(&points, Path::new(path))?;
        tracing::info!("Wrote trend chart ({} points) to {}", points.len(), path);
    }

    Ok(())
}
