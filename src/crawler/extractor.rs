//! Field extraction through the declarative mapping
//!
//! Selectors are compiled once per run into a `CompiledMapping` and then
//! evaluated against each page. Extraction never fails: anything that cannot
//! be found is reported as a `CrawlWarning` and the field stays empty.

use crate::config::{Cardinality, FieldMapping, FieldRule, PostProcess};
use crate::record::{ArticleFields, CrawlWarning, FieldName};
use crate::ConfigError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A field rule with its selector parsed
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: FieldRule,
    selector: Selector,
}

impl CompiledRule {
    fn compile(rule: &FieldRule) -> Result<Self, ConfigError> {
        Ok(Self {
            rule: rule.clone(),
            selector: compile_selector(&rule.selector)?,
        })
    }

    pub fn field(&self) -> FieldName {
        self.rule.field
    }
}

/// Listing-page selectors, compiled
#[derive(Debug, Clone)]
pub struct CompiledListing {
    pub(crate) item: Selector,
    pub(crate) link: Selector,
    pub(crate) link_attr: String,
    pub(crate) preview: Vec<CompiledRule>,
}

/// A whole mapping with every selector parsed up front
#[derive(Debug, Clone)]
pub struct CompiledMapping {
    pub(crate) listing: CompiledListing,
    pub(crate) detail: Vec<CompiledRule>,
    pub(crate) delimiter: String,
}

impl CompiledMapping {
    /// Parses every selector in the mapping
    ///
    /// # Returns
    ///
    /// * `Ok(CompiledMapping)` - All selectors are valid
    /// * `Err(ConfigError::InvalidSelector)` - The first selector that failed to parse
    pub fn compile(mapping: &FieldMapping) -> Result<Self, ConfigError> {
        let listing = CompiledListing {
            item: compile_selector(&mapping.listing.item)?,
            link: compile_selector(&mapping.listing.link.selector)?,
            link_attr: mapping.listing.link.attr.clone(),
            preview: mapping
                .listing
                .preview
                .iter()
                .map(CompiledRule::compile)
                .collect::<Result<_, _>>()?,
        };

        let detail = mapping
            .detail
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<_, _>>()?;

        Ok(Self {
            listing,
            detail,
            delimiter: mapping.delimiter.clone(),
        })
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }
}

/// Fields pulled from one page plus whatever went wrong along the way
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub fields: ArticleFields,
    pub warnings: Vec<CrawlWarning>,
}

/// Runs the detail rules against a detail page
///
/// `page_url` is only used to stamp warnings.
pub fn extract(html: &str, page_url: &Url, mapping: &CompiledMapping) -> Extraction {
    let document = Html::parse_document(html);
    apply_rules(
        document.root_element(),
        &mapping.detail,
        &mapping.delimiter,
        page_url.as_str(),
    )
}

/// Evaluates rules under `root`, first successful rule per field wins
pub(crate) fn apply_rules(
    root: ElementRef<'_>,
    rules: &[CompiledRule],
    delimiter: &str,
    url: &str,
) -> Extraction {
    let mut extraction = Extraction::default();
    let mut targeted: Vec<FieldName> = Vec::new();
    let mut unparsed: Vec<FieldName> = Vec::new();
    let mut date_failures: Vec<CrawlWarning> = Vec::new();

    for compiled in rules {
        let field = compiled.rule.field;
        if !targeted.contains(&field) {
            targeted.push(field);
        }
        if extraction.fields.has(field) {
            continue;
        }

        let values = post_process(select_values(root, compiled), &compiled.rule, delimiter);
        if values.is_empty() {
            continue;
        }

        if field == FieldName::PublishedAt {
            let raw = &values[0];
            let format = compiled.rule.date_format();
            match parse_date(raw, format) {
                Some(date) => extraction.fields.published_at = Some(date),
                None => {
                    date_failures.push(CrawlWarning::DateParseFailure {
                        url: url.to_string(),
                        field,
                        raw: raw.clone(),
                        format: format.unwrap_or("rfc3339").to_string(),
                    });
                    if !unparsed.contains(&field) {
                        unparsed.push(field);
                    }
                }
            }
            continue;
        }

        assign(&mut extraction.fields, field, values, delimiter);
    }

    // A later rule may still have produced the date
    if !extraction.fields.has(FieldName::PublishedAt) {
        extraction.warnings.extend(date_failures);
    }

    for field in targeted {
        if !extraction.fields.has(field) && !unparsed.contains(&field) {
            extraction.warnings.push(CrawlWarning::MissingField {
                url: url.to_string(),
                field,
            });
        }
    }

    extraction
}

fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

fn select_values(root: ElementRef<'_>, compiled: &CompiledRule) -> Vec<String> {
    let read = |element: ElementRef<'_>| match &compiled.rule.attr {
        Some(attr) => element.value().attr(attr).map(str::to_string),
        None => Some(element.text().collect::<String>()),
    };

    let mut matches = root.select(&compiled.selector);
    match compiled.rule.cardinality {
        Cardinality::Single => matches.next().and_then(read).into_iter().collect(),
        Cardinality::Multiple => matches.filter_map(read).collect(),
    }
}

fn post_process(mut values: Vec<String>, rule: &FieldRule, delimiter: &str) -> Vec<String> {
    for step in &rule.post {
        match step {
            PostProcess::Trim => {
                values = values
                    .iter()
                    .map(|v| collapse_whitespace(v))
                    .filter(|v| !v.is_empty())
                    .collect();
            }
            PostProcess::Join => {
                if !values.is_empty() {
                    values = vec![values.join(delimiter)];
                }
            }
            // Applied when the value is assigned
            PostProcess::ParseDate(_) => {}
        }
    }

    values.retain(|v| !v.trim().is_empty());
    values
}

fn assign(fields: &mut ArticleFields, field: FieldName, values: Vec<String>, delimiter: &str) {
    match field {
        FieldName::Title => fields.title = Some(values.join(" ")),
        FieldName::Body => fields.body = Some(values.join(delimiter)),
        FieldName::Author => fields.author = Some(values.join(", ")),
        FieldName::AuthorRole => fields.author_role = Some(values.join(", ")),
        FieldName::Tags => {
            for tag in values {
                if !fields.tags.contains(&tag) {
                    fields.tags.push(tag);
                }
            }
        }
        FieldName::PublishedAt => {}
    }
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a date value, returning None instead of guessing
///
/// With a format, offset-aware parsing is tried first, then a naive timestamp
/// taken as UTC, then a bare date at midnight UTC. Without a format the value
/// must be RFC 3339.
pub fn parse_date(raw: &str, format: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let Some(format) = format else {
        return DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|d| d.with_timezone(&Utc));
    };

    if let Ok(date) = DateTime::parse_from_str(raw, format) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
