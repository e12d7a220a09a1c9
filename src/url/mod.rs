//! URL handling module for Article-Harvest
//!
//! This module provides URL normalization (used as the de-duplication key),
//! link resolution, domain extraction, and the allow-list scope check.

mod normalize;
mod scope;

pub use normalize::{dedup_key, normalize_url, resolve_link};
pub use scope::{matches_wildcard, Scope};

use url::Url;

/// Extracts the lowercase host of a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use article_harvest::url::extract_domain;
///
/// let url = Url::parse("https://WWW.RTE.IE/news/").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.rte.ie".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
