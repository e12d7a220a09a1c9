use crate::record::FieldName;
use crate::{FetchError, ScopeError};
use serde::Serialize;
use std::fmt;

/// A non-fatal problem encountered while crawling
///
/// Warnings never abort a run; they are returned next to the articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CrawlWarning {
    /// No rule for this field produced a value
    MissingField { url: String, field: FieldName },

    /// A date value did not match the configured format; the date is left absent
    DateParseFailure {
        url: String,
        field: FieldName,
        raw: String,
        format: String,
    },

    /// A listing item had no resolvable detail link
    MissingLink { url: String, item: usize },

    /// A discovered link points outside the allow-list
    OutOfScope { url: String, domain: String },

    /// A detail page could not be fetched and was dropped
    FetchFailed { url: String, cause: String },

    /// A detail page produced no title, so no article was emitted
    UntitledArticle { url: String },
}

impl CrawlWarning {
    /// Short kebab-case name of the warning kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "missing-field",
            Self::DateParseFailure { .. } => "date-parse-failure",
            Self::MissingLink { .. } => "missing-link",
            Self::OutOfScope { .. } => "out-of-scope",
            Self::FetchFailed { .. } => "fetch-failed",
            Self::UntitledArticle { .. } => "untitled-article",
        }
    }

    /// The page the warning is about
    pub fn url(&self) -> &str {
        match self {
            Self::MissingField { url, .. }
            | Self::DateParseFailure { url, .. }
            | Self::MissingLink { url, .. }
            | Self::OutOfScope { url, .. }
            | Self::FetchFailed { url, .. }
            | Self::UntitledArticle { url } => url,
        }
    }
}

impl From<ScopeError> for CrawlWarning {
    fn from(err: ScopeError) -> Self {
        Self::OutOfScope {
            url: err.url,
            domain: err.domain,
        }
    }
}

impl From<FetchError> for CrawlWarning {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::OutOfScope(scope) => scope.into(),
            FetchError::Failed { url, cause } => Self::FetchFailed {
                url,
                cause: cause.to_string(),
            },
        }
    }
}

impl fmt::Display for CrawlWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { url, field } => write!(f, "{}: no value for '{}'", url, field),
            Self::DateParseFailure {
                url,
                field,
                raw,
                format,
            } => write!(
                f,
                "{}: '{}' value '{}' does not match '{}'",
                url, field, raw, format
            ),
            Self::MissingLink { url, item } => {
                write!(f, "{}: listing item #{} has no link", url, item)
            }
            Self::OutOfScope { url, domain } => {
                write!(f, "{}: domain '{}' is outside the crawl scope", url, domain)
            }
            Self::FetchFailed { url, cause } => write!(f, "{}: fetch failed: {}", url, cause),
            Self::UntitledArticle { url } => write!(f, "{}: no title, article dropped", url),
        }
    }
}
