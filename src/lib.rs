//! Article-Harvest: a polite two-stage news crawler
//!
//! This crate walks a news site's category listing page, follows each article
//! link one level down, and extracts article records through a declarative
//! field mapping. Records can then be scored for sentiment and charted over time.

pub mod analysis;
pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Article-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Listing page for category '{category}' could not be fetched: {source}")]
    Listing {
        category: String,
        #[source]
        source: FetchError,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// A request aimed at a domain outside the allow-list
///
/// Raised before any network I/O takes place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{url} is outside the crawl scope (domain '{domain}' is not allowed)")]
pub struct ScopeError {
    pub url: String,
    pub domain: String,
}

/// Why a single fetch failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchCause {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("unexpected content type: {0}")]
    ContentType(String),

    #[error("disallowed by robots.txt")]
    RobotsDenied,

    #[error("{0}")]
    Other(String),
}

impl FetchCause {
    /// Transient failures worth another attempt: timeouts, connection errors and 5xx
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) => true,
            Self::Status(code) => (500..600).contains(code),
            _ => false,
        }
    }
}

/// Errors returned by a page fetcher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error(transparent)]
    OutOfScope(#[from] ScopeError),

    #[error("Fetch failed for {url}: {cause}")]
    Failed { url: String, cause: FetchCause },
}

impl FetchError {
    pub fn failed(url: impl Into<String>, cause: FetchCause) -> Self {
        Self::Failed {
            url: url.into(),
            cause,
        }
    }

    /// The URL the failed request was aimed at
    pub fn url(&self) -> &str {
        match self {
            Self::OutOfScope(scope) => &scope.url,
            Self::Failed { url, .. } => url,
        }
    }
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{ArticleSink, CrawlReport, HttpFetcher, PageFetcher, Pipeline};
pub use record::{Article, ArticleFields, CrawlWarning, FieldName};
pub use crate::url::{extract_domain, normalize_url, Scope};
