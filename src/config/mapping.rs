//! Declarative field mapping
//!
//! A mapping describes where each article field lives in a site's markup. Every
//! layout change on the target site is a new mapping, never new code.
//!
//! ```toml
//! [mapping.listing]
//! item = "article"
//!
//! [[mapping.listing.preview]]
//! field = "title"
//! selector = "h1"
//! post = ["trim"]
//!
//! [[mapping.detail]]
//! field = "body"
//! selector = "div.article-body p"
//! cardinality = "multiple"
//! post = ["trim", "join"]
//!
//! [[mapping.detail]]
//! field = "published-at"
//! selector = "time"
//! post = ["trim", { parse-date = "%d %b %Y %H:%M" }]
//! ```

use crate::record::FieldName;
use serde::Deserialize;

/// Complete mapping for a listing page and its detail pages
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMapping {
    pub listing: ListingMapping,

    /// Rules evaluated against each detail page, in order
    #[serde(default)]
    pub detail: Vec<FieldRule>,

    /// Separator used when paragraph values are joined
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

/// How article blocks and their links are found on a listing page
#[derive(Debug, Clone, Deserialize)]
pub struct ListingMapping {
    /// Selector matching one element per article block
    pub item: String,

    /// Where the detail link sits inside an item
    #[serde(default)]
    pub link: LinkRule,

    /// Fields already visible on the listing page, evaluated inside each item
    #[serde(default)]
    pub preview: Vec<FieldRule>,
}

/// Locates the detail-page link inside a listing item
#[derive(Debug, Clone, Deserialize)]
pub struct LinkRule {
    #[serde(default = "default_link_selector")]
    pub selector: String,

    #[serde(default = "default_link_attr")]
    pub attr: String,
}

impl Default for LinkRule {
    fn default() -> Self {
        Self {
            selector: default_link_selector(),
            attr: default_link_attr(),
        }
    }
}

/// One extraction rule: a selector feeding a single article field
///
/// Several rules may target the same field; the first one that yields a value
/// wins, so older layouts can stay in the mapping as fallbacks.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldRule {
    pub field: FieldName,

    pub selector: String,

    #[serde(default)]
    pub cardinality: Cardinality,

    /// Read this attribute instead of the element text
    #[serde(default)]
    pub attr: Option<String>,

    /// Post-processing steps, applied in order
    #[serde(default)]
    pub post: Vec<PostProcess>,
}

impl FieldRule {
    /// The configured date format, if this rule parses dates
    pub fn date_format(&self) -> Option<&str> {
        self.post.iter().find_map(|step| match step {
            PostProcess::ParseDate(format) => Some(format.as_str()),
            _ => None,
        })
    }
}

/// How many matches a selector contributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    /// First match only
    #[default]
    Single,
    /// Every match, in document order
    Multiple,
}

/// A post-processing step applied to extracted values
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostProcess {
    /// Collapse whitespace runs, trim, and drop empty values
    Trim,
    /// Join all values with the mapping delimiter
    Join,
    /// Parse the first value with a chrono format string
    ParseDate(String),
}

fn default_delimiter() -> String {
    "\n".to_string()
}

fn default_link_selector() -> String {
    "a[href]".to_string()
}

fn default_link_attr() -> String {
    "href".to_string()
}
