//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the crawler's user agent
//! - Refusing out-of-scope URLs before any network I/O
//! - Honoring robots.txt and per-domain throttling
//! - Retrying transient failures with exponential backoff
//! - Error classification

use crate::config::{Config, CrawlerConfig, UserAgentConfig};
use crate::crawler::throttle::DomainThrottle;
use crate::robots::{fetch_robots, ParsedRobots};
use crate::url::{extract_domain, Scope};
use crate::{FetchCause, FetchError, ScopeError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// A fetched page body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: Url,
    /// HTTP status code
    pub status: u16,
    /// Page body content
    pub body: String,
}

/// Anything that can hand the pipeline a page body
///
/// Implementations must refuse URLs outside their scope with
/// `FetchError::OutOfScope` without touching the network.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Checks the URL against the allow-list only
    fn check_scope(&self, url: &Url) -> Result<(), ScopeError>;

    /// Fetches the page body at `url`
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;

    /// Requests issued so far, by domain
    fn requests_by_domain(&self) -> BTreeMap<String, u32> {
        BTreeMap::new()
    }
}

/// Builds an HTTP client with proper configuration
///
/// The user agent reads `Name/Version (+contact-url)`. Redirects are followed
/// by reqwest; the final URL is reported on the fetched page.
///
/// # Example
///
/// ```no_run
/// use article_harvest::config::{CrawlerConfig, UserAgentConfig};
/// use article_harvest::crawler::build_http_client;
///
/// let agent = UserAgentConfig {
///     crawler_name: "ArticleHarvest".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
/// };
///
/// let client = build_http_client(&agent, &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(agent.header_value())
        .timeout(crawler.request_timeout())
        .connect_timeout(crawler.request_timeout().min(Duration::from_secs(10)))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// The production fetcher: reqwest behind scope, robots.txt and throttling
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    scope: Scope,
    throttle: DomainThrottle,
    agent_token: String,
    respect_robots: bool,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher from the loaded configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent, &config.crawler)?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, config: &Config) -> Self {
        Self {
            client,
            scope: Scope::new(config.site.allowed_domains.clone()),
            throttle: DomainThrottle::new(&config.crawler),
            agent_token: config.user_agent.crawler_name.clone(),
            respect_robots: config.crawler.respect_robots,
            max_retries: config.crawler.max_retries,
            retry_backoff: config.crawler.retry_backoff(),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    async fn robots_for(&self, url: &Url, domain: &str) -> ParsedRobots {
        let cell = self.throttle.robots(domain);
        cell.get_or_init(|| async {
            let robots = match self.throttle.acquire(domain).await {
                Ok(_permit) => fetch_robots(&self.client, url).await,
                Err(_) => ParsedRobots::allow_all(),
            };
            if let Some(delay) = robots.crawl_delay(&self.agent_token) {
                info!(domain, delay_ms = delay.as_millis() as u64, "Applying robots.txt Crawl-delay");
                self.throttle.set_crawl_delay(domain, delay);
            }
            robots
        })
        .await
        .clone()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn check_scope(&self, url: &Url) -> Result<(), ScopeError> {
        self.scope.check(url)
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.check_scope(url)?;
        let domain = extract_domain(url).unwrap_or_default();

        if self.respect_robots {
            let robots = self.robots_for(url, &domain).await;
            if !robots.is_allowed(url.as_str(), &self.agent_token) {
                return Err(FetchError::failed(url.as_str(), FetchCause::RobotsDenied));
            }
        }

        let mut attempt = 0;
        loop {
            let result = match self.throttle.acquire(&domain).await {
                Ok(_permit) => fetch_once(&self.client, url).await,
                Err(cause) => Err(cause),
            };

            match result {
                Ok(page) => {
                    debug!(url = %url, status = page.status, bytes = page.body.len(), "Fetched page");
                    return Ok(page);
                }
                Err(cause) if cause.is_retryable() && attempt < self.max_retries => {
                    let backoff = self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    warn!(
                        url = %url,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        cause = %cause,
                        "Retrying fetch"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(cause) => return Err(FetchError::failed(url.as_str(), cause)),
            }
        }
    }

    fn requests_by_domain(&self) -> BTreeMap<String, u32> {
        self.throttle.requests_by_domain()
    }
}

/// Issues one GET and classifies the outcome
///
/// # Error Classification
///
/// | Condition | Cause | Retried |
/// |-----------|-------|---------|
/// | Timeout | `Timeout` | yes |
/// | Connection refused, DNS, TLS | `Connect` | yes |
/// | HTTP 5xx | `Status` | yes |
/// | Other non-2xx | `Status` | no |
/// | Binary content type | `ContentType` | no |
async fn fetch_once(client: &Client, url: &Url) -> Result<FetchedPage, FetchCause> {
    let response = client.get(url.clone()).send().await.map_err(classify)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchCause::Status(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !is_textual(&content_type) {
        return Err(FetchCause::ContentType(content_type));
    }

    let final_url = response.url().clone();
    let body = response
        .text()
        .await
        .map_err(|e| FetchCause::Body(e.to_string()))?;

    Ok(FetchedPage {
        url: final_url,
        status: status.as_u16(),
        body,
    })
}

fn classify(error: reqwest::Error) -> FetchCause {
    if error.is_timeout() {
        FetchCause::Timeout
    } else if error.is_connect() {
        FetchCause::Connect(error.to_string())
    } else {
        FetchCause::Other(error.to_string())
    }
}

/// Missing content types are accepted; servers often omit them
fn is_textual(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.starts_with("text/")
        || content_type.contains("html")
        || content_type.contains("xml")
}
