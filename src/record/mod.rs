//! Article records and crawl warnings
//!
//! - `ArticleFields`: best-effort field bundle produced by extraction; any field
//!   may be missing because upstream markup drifts.
//! - `Article`: a well-formed record (non-empty title and URL), immutable once built.
//! - `CrawlWarning`: non-fatal problems collected alongside the records.

mod warning;

pub use warning::CrawlWarning;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Logical article fields a mapping rule can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldName {
    Title,
    Body,
    Author,
    AuthorRole,
    PublishedAt,
    Tags,
}

impl FieldName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Body => "body",
            Self::Author => "author",
            Self::AuthorRole => "author-role",
            Self::PublishedAt => "published-at",
            Self::Tags => "tags",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields extracted from a page before the record is finalized
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFields {
    pub title: Option<String>,
    pub body: Option<String>,
    pub author: Option<String>,
    pub author_role: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl ArticleFields {
    /// Returns true if the field already carries a value
    pub fn has(&self, field: FieldName) -> bool {
        match field {
            FieldName::Title => self.title.is_some(),
            FieldName::Body => self.body.is_some(),
            FieldName::Author => self.author.is_some(),
            FieldName::AuthorRole => self.author_role.is_some(),
            FieldName::PublishedAt => self.published_at.is_some(),
            FieldName::Tags => !self.tags.is_empty(),
        }
    }

    /// Merges listing-page preview fields into detail-page fields
    ///
    /// A non-empty listing title always wins over the detail title. Every other
    /// field keeps the detail value and only falls back to the preview.
    pub fn with_preview(self, preview: &ArticleFields) -> Self {
        Self {
            title: preview.title.clone().or(self.title),
            body: self.body.or_else(|| preview.body.clone()),
            author: self.author.or_else(|| preview.author.clone()),
            author_role: self.author_role.or_else(|| preview.author_role.clone()),
            published_at: self.published_at.or(preview.published_at),
            tags: if self.tags.is_empty() {
                preview.tags.clone()
            } else {
                self.tags
            },
        }
    }

    /// Finalizes the fields into an `Article`
    ///
    /// Fails, handing the fields back, when the title is missing or blank.
    pub fn into_article(self, url: &str, category: &str) -> Result<Article, ArticleFields> {
        let title = match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() && !url.is_empty() => t.to_string(),
            _ => return Err(self),
        };

        Ok(Article {
            title,
            body: self.body.unwrap_or_default(),
            url: url.to_string(),
            author: self.author,
            author_role: self.author_role,
            published_at: self.published_at,
            category: category.to_string(),
            tags: self.tags,
        })
    }
}

/// A harvested article
///
/// Serializes as `title`, `body`, `url`, `author`, `authorRole`, `publishDate`
/// (RFC 3339 or `"unknown"`), `category`, `tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub body: String,
    pub url: String,
    pub author: Option<String>,
    pub author_role: Option<String>,
    #[serde(rename = "publishDate", serialize_with = "serialize_publish_date")]
    pub published_at: Option<DateTime<Utc>>,
    pub category: String,
    pub tags: Vec<String>,
}

impl Article {
    /// Publish date as RFC 3339, or `"unknown"` when absent
    pub fn publish_date_label(&self) -> String {
        self.published_at
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Text handed to sentiment scoring: title followed by body
    pub fn scoring_text(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{}\n{}", self.title, self.body)
        }
    }
}

fn serialize_publish_date<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(date) => serializer.serialize_str(&date.to_rfc3339()),
        None => serializer.serialize_str("unknown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn detail_fields() -> ArticleFields {
        ArticleFields {
            title: Some("Detail headline".to_string()),
            body: Some("p1\np2".to_string()),
            author: Some("Sean Whelan".to_string()),
            author_role: None,
            published_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()),
            tags: vec![],
        }
    }

    #[test]
    fn test_listing_title_wins() {
        let preview = ArticleFields {
            title: Some("Listing headline".to_string()),
            ..ArticleFields::default()
        };
        let merged = detail_fields().with_preview(&preview);
        assert_eq!(merged.title.as_deref(), Some("Listing headline"));
        assert_eq!(merged.body.as_deref(), Some("p1\np2"));
    }

    #[test]
    fn test_detail_title_used_without_preview() {
        let merged = detail_fields().with_preview(&ArticleFields::default());
        assert_eq!(merged.title.as_deref(), Some("Detail headline"));
    }

    #[test]
    fn test_preview_fills_gaps_only() {
        let preview = ArticleFields {
            author: Some("Listing Author".to_string()),
            author_role: Some("Economics Editor".to_string()),
            tags: vec!["economy".to_string()],
            ..ArticleFields::default()
        };
        let merged = detail_fields().with_preview(&preview);
        assert_eq!(merged.author.as_deref(), Some("Sean Whelan"));
        assert_eq!(merged.author_role.as_deref(), Some("Economics Editor"));
        assert_eq!(merged.tags, vec!["economy".to_string()]);
    }

    #[test]
    fn test_into_article_requires_title() {
        let fields = ArticleFields {
            title: Some("   ".to_string()),
            ..ArticleFields::default()
        };
        assert!(fields.into_article("https://rte.ie/a", "business").is_err());

        let article = detail_fields()
            .into_article("https://rte.ie/a", "business")
            .unwrap();
        assert_eq!(article.title, "Detail headline");
        assert_eq!(article.category, "business");
    }

    #[test]
    fn test_into_article_keeps_empty_optional_fields() {
        let fields = ArticleFields {
            title: Some("Only a title".to_string()),
            ..ArticleFields::default()
        };
        let article = fields.into_article("https://rte.ie/b", "news").unwrap();
        assert_eq!(article.body, "");
        assert_eq!(article.published_at, None);
        assert!(article.tags.is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let article = detail_fields()
            .into_article("https://rte.ie/a", "business")
            .unwrap();
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["publishDate"], "2024-01-01T10:00:00+00:00");
        assert_eq!(json["authorRole"], serde_json::Value::Null);
        assert_eq!(json["url"], "https://rte.ie/a");
        assert_eq!(json["body"], "p1\np2");
    }

    #[test]
    fn test_unknown_publish_date() {
        let article = ArticleFields {
            title: Some("Undated".to_string()),
            ..ArticleFields::default()
        }
        .into_article("https://rte.ie/c", "news")
        .unwrap();
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["publishDate"], "unknown");
        assert_eq!(article.publish_date_label(), "unknown");
    }

    #[test]
    fn test_field_name_display() {
        assert_eq!(FieldName::AuthorRole.to_string(), "author-role");
        assert_eq!(FieldName::PublishedAt.as_str(), "published-at");
    }
}
