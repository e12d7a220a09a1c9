//! Crawler module for the listing-to-detail pipeline
//!
//! This module contains the core crawling logic, including:
//! - Compiling the field mapping and extracting fields from pages
//! - Discovering detail links on listing pages
//! - HTTP fetching with scope checks, robots.txt and retries
//! - Per-domain throttling
//! - Overall run coordination

mod discover;
mod extractor;
mod fetcher;
mod pipeline;
mod sink;
mod throttle;

pub use discover::{discover, DiscoveredLink, Discovery};
pub use extractor::{extract, parse_date, CompiledMapping, CompiledRule, Extraction};
pub use fetcher::{build_http_client, FetchedPage, HttpFetcher, PageFetcher};
pub use pipeline::{CrawlReport, CrawlTarget, Pipeline, TargetRole};
pub use sink::ArticleSink;
pub use throttle::DomainThrottle;

use crate::config::Config;
use crate::HarvestError;
use tokio_util::sync::CancellationToken;

/// Crawls the given categories against the live site
///
/// Builds an `HttpFetcher` from the configuration and runs every category in
/// turn. With no categories given, the configuration's defaults are used.
/// `config_hash` is stamped onto every report.
///
/// # Returns
///
/// One result per category that was started, in order.
pub async fn crawl(
    config: &Config,
    categories: &[String],
    limit: usize,
    config_hash: Option<&str>,
    cancel: &CancellationToken,
) -> Result<Vec<(String, Result<CrawlReport, HarvestError>)>, HarvestError> {
    let fetcher = HttpFetcher::new(config)?;
    let mut pipeline = Pipeline::new(fetcher, config)?;
    if let Some(hash) = config_hash {
        pipeline = pipeline.with_config_hash(hash);
    }

    let categories = if categories.is_empty() {
        &config.site.categories
    } else {
        categories
    };

    Ok(pipeline.run_many(categories, limit, cancel).await)
}
