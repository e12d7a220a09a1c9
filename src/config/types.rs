use crate::config::mapping::FieldMapping;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Article-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub site: SiteConfig,
    pub mapping: FieldMapping,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of detail pages fetched concurrently
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,

    /// Maximum number of in-flight requests to a single domain
    #[serde(
        rename = "per-domain-concurrency",
        default = "default_per_domain_concurrency"
    )]
    pub per_domain_concurrency: u32,

    /// Minimum time between requests to the same domain (milliseconds)
    #[serde(rename = "delay-ms", default)]
    pub delay_ms: u64,

    /// Upper bound of the random delay added before each request (milliseconds)
    #[serde(rename = "random-delay-ms", default = "default_random_delay_ms")]
    pub random_delay_ms: u64,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Extra attempts for timeouts, connection failures and 5xx responses
    #[serde(rename = "max-retries", default)]
    pub max_retries: u32,

    /// Base backoff between retries, doubled on every attempt (milliseconds)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Honour robots.txt Disallow and Crawl-delay directives
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,
}

impl CrawlerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn random_delay(&self) -> Duration {
        Duration::from_millis(self.random_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            per_domain_concurrency: default_per_domain_concurrency(),
            delay_ms: 0,
            random_delay_ms: default_random_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            respect_robots: true,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// The site being harvested
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Listing URL template; `{category}` is replaced by the category name
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Domain patterns the fetcher may contact (e.g., "rte.ie" or "*.rte.ie")
    #[serde(rename = "allowed-domains")]
    pub allowed_domains: Vec<String>,

    /// Categories crawled when none are given on the command line
    #[serde(default)]
    pub categories: Vec<String>,
}

impl SiteConfig {
    /// Builds the listing URL for a category
    pub fn listing_url(&self, category: &str) -> String {
        self.base_url.replace("{category}", category)
    }
}

/// Output configuration; every sink is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Where harvested articles are written as JSON
    #[serde(rename = "json-path", default)]
    pub json_path: Option<String>,

    /// Path to the markdown run summary
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,

    /// SQLite archive accumulating articles and scores across runs
    #[serde(rename = "archive-path", default)]
    pub archive_path: Option<String>,

    /// SVG sentiment trend chart
    #[serde(rename = "chart-path", default)]
    pub chart_path: Option<String>,
}

fn default_parallelism() -> u32 {
    2
}

fn default_per_domain_concurrency() -> u32 {
    1
}

fn default_random_delay_ms() -> u64 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}
