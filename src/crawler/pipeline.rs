//! Pipeline controller - listing to detail crawl orchestration
//!
//! One run covers one category:
//! 1. Fetch the category listing page (a failure here fails the run)
//! 2. Discover detail links and the preview fields next to them
//! 3. Drop links already visited and links outside the allow-list
//! 4. Fetch and extract detail pages on a bounded pool of workers
//! 5. Merge preview and detail fields, in discovery order, into the sink
//!
//! Workers never touch the sink or the visited set. They send their outcome
//! back over a channel and the controller applies it.

use crate::config::{validate_category, Config, SiteConfig};
use crate::crawler::discover::{discover, DiscoveredLink};
use crate::crawler::extractor::{extract, CompiledMapping, Extraction};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::sink::ArticleSink;
use crate::record::{Article, ArticleFields, CrawlWarning};
use crate::url::dedup_key;
use crate::{FetchError, HarvestError};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Result of one category run
///
/// Only `articles` describes the harvested content; every other field is
/// run metadata and is expected to differ between runs.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub category: String,
    pub listing_url: String,
    pub articles: Vec<Article>,
    pub warnings: Vec<CrawlWarning>,
    /// Links found on the listing page
    pub discovered: usize,
    /// Detail pages handed to workers
    pub dispatched: usize,
    /// The run stopped early; `articles` holds what finished before that
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub requests_by_domain: BTreeMap<String, u32>,
    pub config_hash: Option<String>,
}

impl CrawlReport {
    fn new(category: &str, listing_url: &Url, config_hash: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            category: category.to_string(),
            listing_url: listing_url.to_string(),
            articles: Vec::new(),
            warnings: Vec::new(),
            discovered: 0,
            dispatched: 0,
            cancelled: false,
            started_at: now,
            finished_at: now,
            requests_by_domain: BTreeMap::new(),
            config_hash,
        }
    }

    /// Dispatched detail pages that yielded no article
    pub fn dropped(&self) -> usize {
        self.dispatched.saturating_sub(self.articles.len())
    }
}

/// What a fetched page is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRole {
    Listing,
    Detail,
}

/// A page scheduled for fetching, fetched exactly once
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    pub url: Url,
    pub role: TargetRole,
    /// Stamped on the articles this target produces
    pub category: String,
    /// Position in discovery order; 0 for the listing page
    pub index: usize,
    /// Fields read from the listing item, detail targets only
    pub preview: ArticleFields,
}

impl CrawlTarget {
    pub fn listing(url: Url, category: &str) -> Self {
        Self {
            url,
            role: TargetRole::Listing,
            category: category.to_string(),
            index: 0,
            preview: ArticleFields::default(),
        }
    }

    pub fn detail(url: Url, category: &str, index: usize, preview: ArticleFields) -> Self {
        Self {
            url,
            role: TargetRole::Detail,
            category: category.to_string(),
            index,
            preview,
        }
    }
}

struct DetailOutcome {
    target: CrawlTarget,
    result: Result<Extraction, FetchError>,
}

/// Runs listing-to-detail crawls for one site
pub struct Pipeline<F> {
    fetcher: Arc<F>,
    mapping: Arc<CompiledMapping>,
    site: SiteConfig,
    parallelism: usize,
    config_hash: Option<String>,
}

impl<F: PageFetcher + 'static> Pipeline<F> {
    /// Creates a pipeline over `fetcher`
    ///
    /// # Returns
    ///
    /// * `Ok(Pipeline)` - The mapping compiled
    /// * `Err(HarvestError::Config)` - A selector in the mapping is invalid
    pub fn new(fetcher: F, config: &Config) -> Result<Self, HarvestError> {
        Ok(Self {
            fetcher: Arc::new(fetcher),
            mapping: Arc::new(CompiledMapping::compile(&config.mapping)?),
            site: config.site.clone(),
            parallelism: config.crawler.parallelism.max(1) as usize,
            config_hash: None,
        })
    }

    /// Stamps reports with the hash of the configuration file
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Crawls one category
    ///
    /// # Arguments
    ///
    /// * `category` - Substituted into the site's `base-url` template
    /// * `limit` - Maximum number of detail pages to fetch; 0 means no limit
    /// * `cancel` - Cancelling returns the articles finished so far
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The run finished or was cancelled
    /// * `Err(HarvestError::Listing)` - The listing page could not be fetched
    pub async fn run(
        &self,
        category: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<CrawlReport, HarvestError> {
        validate_category(category)?;
        let listing = CrawlTarget::listing(Url::parse(&self.site.listing_url(category))?, category);
        let mut report = CrawlReport::new(category, &listing.url, self.config_hash.clone());

        let mut visited = HashSet::new();
        visited.insert(dedup_key(&listing.url));

        info!(category, url = %listing.url, "Fetching listing page");
        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(category, "Run cancelled before the listing page arrived");
                report.cancelled = true;
                return Ok(self.finish(report));
            }
            result = self.fetcher.fetch(&listing.url) => {
                result.map_err(|source| HarvestError::Listing {
                    category: category.to_string(),
                    source,
                })?
            }
        };

        let discovery = discover(&page.body, &page.url, &self.mapping);
        report.discovered = discovery.links.len();
        report.warnings.extend(discovery.warnings);

        let targets = self.plan(
            category,
            discovery.links,
            limit,
            &mut visited,
            &mut report.warnings,
        );
        report.dispatched = targets.len();
        info!(
            category,
            discovered = report.discovered,
            dispatched = report.dispatched,
            "Fetching detail pages"
        );

        let (outcomes, cancelled) = self.fetch_details(targets, cancel).await;
        report.cancelled = cancelled;

        let mut sink = ArticleSink::new();
        for outcome in outcomes {
            self.apply(outcome, &mut sink, &mut report.warnings);
        }
        report.articles = sink.into_vec();

        info!(
            category,
            articles = report.articles.len(),
            warnings = report.warnings.len(),
            cancelled = report.cancelled,
            "Run finished"
        );
        Ok(self.finish(report))
    }

    /// Crawls several categories one after another
    ///
    /// A failed category does not stop the others; cancellation does.
    pub async fn run_many(
        &self,
        categories: &[String],
        limit: usize,
        cancel: &CancellationToken,
    ) -> Vec<(String, Result<CrawlReport, HarvestError>)> {
        let mut results = Vec::with_capacity(categories.len());

        for category in categories {
            if cancel.is_cancelled() {
                debug!(category = %category, "Skipping category after cancellation");
                break;
            }
            let result = self.run(category, limit, cancel).await;
            if let Err(e) = &result {
                warn!(category = %category, error = %e, "Category run failed");
            }
            results.push((category.clone(), result));
        }

        results
    }

    /// Picks which discovered links become detail fetches
    ///
    /// Out-of-scope links are reported and do not count towards the limit.
    fn plan(
        &self,
        category: &str,
        links: Vec<DiscoveredLink>,
        limit: usize,
        visited: &mut HashSet<String>,
        warnings: &mut Vec<CrawlWarning>,
    ) -> Vec<CrawlTarget> {
        let mut targets = Vec::new();

        for link in links {
            if limit > 0 && targets.len() >= limit {
                break;
            }
            if !visited.insert(dedup_key(&link.url)) {
                debug!(url = %link.url, "Already visited");
                continue;
            }
            if let Err(e) = self.fetcher.check_scope(&link.url) {
                debug!(url = %link.url, "Out of scope");
                warnings.push(e.into());
                continue;
            }

            targets.push(CrawlTarget::detail(
                link.url,
                category,
                targets.len(),
                link.preview,
            ));
        }

        targets
    }

    async fn fetch_details(
        &self,
        targets: Vec<CrawlTarget>,
        cancel: &CancellationToken,
    ) -> (Vec<DetailOutcome>, bool) {
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let (tx, mut rx) = mpsc::channel(targets.len().max(1));
        let mut workers = JoinSet::new();

        for target in targets {
            let fetcher = Arc::clone(&self.fetcher);
            let mapping = Arc::clone(&self.mapping);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();

            workers.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let outcome = process_detail(fetcher.as_ref(), &mapping, target).await;
                // The receiver is gone only after cancellation
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        let mut outcomes = Vec::new();
        let cancelled = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(finished = outcomes.len(), "Run cancelled, abandoning in-flight pages");
                    workers.abort_all();
                    break true;
                }
                next = rx.recv() => match next {
                    Some(outcome) => outcomes.push(outcome),
                    None => break false,
                },
            }
        };

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    warn!(error = %e, "Detail worker panicked");
                }
            }
        }

        outcomes.sort_by_key(|outcome| outcome.target.index);
        (outcomes, cancelled)
    }

    fn apply(
        &self,
        outcome: DetailOutcome,
        sink: &mut ArticleSink,
        warnings: &mut Vec<CrawlWarning>,
    ) {
        let DetailOutcome { target, result } = outcome;
        let extraction = match result {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!(url = %target.url, error = %e, "Dropping detail page");
                warnings.push(e.into());
                return;
            }
        };

        warnings.extend(extraction.warnings);
        let fields = extraction.fields.with_preview(&target.preview);
        match fields.into_article(target.url.as_str(), &target.category) {
            Ok(article) => sink.push(article),
            Err(_) => {
                warn!(url = %target.url, "No title found, dropping article");
                warnings.push(CrawlWarning::UntitledArticle {
                    url: target.url.to_string(),
                });
            }
        }
    }

    fn finish(&self, mut report: CrawlReport) -> CrawlReport {
        report.finished_at = Utc::now();
        report.requests_by_domain = self.fetcher.requests_by_domain();
        report
    }
}

async fn process_detail<F: PageFetcher + ?Sized>(
    fetcher: &F,
    mapping: &CompiledMapping,
    target: CrawlTarget,
) -> DetailOutcome {
    let result = fetcher
        .fetch(&target.url)
        .await
        .map(|page| extract(&page.body, &target.url, mapping));
    DetailOutcome { target, result }
}
