//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of a harvest,
//! including per-category counts, warnings, request totals and the
//! article list.

use crate::analysis::ScoredArticle;
use crate::crawler::CrawlReport;
use crate::output::{write_file, OutputResult};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Number of warnings listed individually per category
const MAX_LISTED_WARNINGS: usize = 20;

/// Everything the summary reports on
#[derive(Debug, Clone, Copy)]
pub struct RunSummary<'a> {
    /// Categories whose listing page was crawled
    pub reports: &'a [CrawlReport],

    /// Categories that failed outright, with the error message
    pub failed_categories: &'a [(String, String)],

    /// Sentiment scores, matched to articles by URL
    pub scored: &'a [ScoredArticle],
}

/// Generates a markdown summary and writes it to disk
///
/// # Arguments
///
/// * `summary` - The harvest results
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &RunSummary<'_>, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);
    write_file(output_path, markdown.as_bytes())?;
    tracing::info!("Wrote summary to {}", output_path.display());
    Ok(())
}

/// Formats a harvest as markdown
pub fn format_markdown_summary(summary: &RunSummary<'_>) -> String {
    let scores: HashMap<&str, f64> = summary
        .scored
        .iter()
        .map(|s| (s.article.url.as_str(), s.score))
        .collect();

    let mut md = String::new();

    md.push_str("# Article Harvest Summary\n\n");

    // Overall statistics
    let total_articles: usize = summary.reports.iter().map(|r| r.articles.len()).sum();
    let total_warnings: usize = summary.reports.iter().map(|r| r.warnings.len()).sum();
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!(
        "- **Categories**: {} crawled, {} failed\n",
        summary.reports.len(),
        summary.failed_categories.len()
    ));
    md.push_str(&format!("- **Articles**: {}\n", total_articles));
    md.push_str(&format!("- **Warnings**: {}\n", total_warnings));
    if !summary.scored.is_empty() {
        let mean = summary.scored.iter().map(|s| s.score).sum::<f64>() / summary.scored.len() as f64;
        md.push_str(&format!("- **Mean Sentiment**: {:.3}\n", mean));
    }
    if let Some(hash) = summary.reports.iter().find_map(|r| r.config_hash.as_deref()) {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Per-category breakdown
    if !summary.reports.is_empty() {
        md.push_str("## Categories\n\n");
        md.push_str("| Category | Discovered | Fetched | Articles | Dropped | Warnings | Status |\n");
        md.push_str("|----------|------------|---------|----------|---------|----------|--------|\n");
        for report in summary.reports {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} |\n",
                report.category,
                report.discovered,
                report.dispatched,
                report.articles.len(),
                report.dropped(),
                report.warnings.len(),
                if report.cancelled { "interrupted" } else { "completed" }
            ));
        }
        md.push('\n');
    }

    if !summary.failed_categories.is_empty() {
        md.push_str("## Failed Categories\n\n");
        for (category, error) in summary.failed_categories {
            md.push_str(&format!("- **{}**: {}\n", category, error));
        }
        md.push('\n');
    }

    // Requests per domain, summed across categories
    let mut requests: BTreeMap<&str, u32> = BTreeMap::new();
    for report in summary.reports {
        for (domain, count) in &report.requests_by_domain {
            *requests.entry(domain.as_str()).or_default() += count;
        }
    }
    if !requests.is_empty() {
        md.push_str("## Requests by Domain\n\n");
        md.push_str("| Domain | Requests |\n");
        md.push_str("|--------|----------|\n");
        for (domain, count) in &requests {
            md.push_str(&format!("| {} | {} |\n", domain, count));
        }
        md.push('\n');
    }

    // Warning summary
    let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
    for warning in summary.reports.iter().flat_map(|r| &r.warnings) {
        *by_kind.entry(warning.kind()).or_default() += 1;
    }
    if !by_kind.is_empty() {
        md.push_str("## Warnings\n\n");
        md.push_str("| Kind | Count |\n");
        md.push_str("|------|-------|\n");
        for (kind, count) in &by_kind {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');

        for report in summary.reports.iter().filter(|r| !r.warnings.is_empty()) {
            md.push_str(&format!("### {}\n\n", report.category));
            for warning in report.warnings.iter().take(MAX_LISTED_WARNINGS) {
                md.push_str(&format!("- {}\n", warning));
            }
            if report.warnings.len() > MAX_LISTED_WARNINGS {
                md.push_str(&format!(
                    "\n... and {} more\n",
                    report.warnings.len() - MAX_LISTED_WARNINGS
                ));
            }
            md.push('\n');
        }
    }

    // Article list
    if total_articles > 0 {
        md.push_str("## Articles\n\n");
        md.push_str("| Published | Category | Title | Sentiment |\n");
        md.push_str("|-----------|----------|-------|-----------|\n");
        for article in summary.reports.iter().flat_map(|r| &r.articles) {
            let published = article
                .published_at
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let sentiment = scores
                .get(article.url.as_str())
                .map(|s| format!("{:.2}", s))
                .unwrap_or_else(|| "-".to_string());
            md.push_str(&format!(
                "| {} | {} | [{}]({}) | {} |\n",
                published,
                article.category,
                escape_cell(&article.title),
                article.url,
                sentiment
            ));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Article, ArticleFields, CrawlWarning, FieldName};
    use chrono::{TimeZone, Utc};

    fn article(url: &str, title: &str) -> Article {
        ArticleFields {
            title: Some(title.to_string()),
            published_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()),
            ..ArticleFields::default()
        }
        .into_article(url, "news")
        .unwrap()
    }

    fn create_test_report() -> CrawlReport {
        let now = Utc::now();
        CrawlReport {
            category: "news".to_string(),
            listing_url: "https://www.rte.ie/news/".to_string(),
            articles: vec![
                article("https://www.rte.ie/news/a", "X"),
                article("https://www.rte.ie/news/b", "Pipes | and more"),
            ],
            warnings: vec![
                CrawlWarning::MissingField {
                    url: "https://www.rte.ie/news/a".to_string(),
                    field: FieldName::Author,
                },
                CrawlWarning::UntitledArticle {
                    url: "https://www.rte.ie/news/c".to_string(),
                },
            ],
            discovered: 3,
            dispatched: 3,
            cancelled: false,
            started_at: now,
            finished_at: now,
            requests_by_domain: [("www.rte.ie".to_string(), 4)].into_iter().collect(),
            config_hash: Some("abc123".to_string()),
        }
    }

    #[test]
    fn test_format_markdown_summary() {
        let reports = vec![create_test_report()];
        let markdown = format_markdown_summary(&RunSummary {
            reports: &reports,
            failed_categories: &[],
            scored: &[],
        });

        assert!(markdown.contains("# Article Harvest Summary"));
        assert!(markdown.contains("- **Articles**: 2"));
        assert!(markdown.contains("| news | 3 | 3 | 2 | 1 | 2 | completed |"));
        assert!(markdown.contains("| www.rte.ie | 4 |"));
        assert!(markdown.contains("abc123"));
        assert!(!markdown.contains("Mean Sentiment"));
    }

    #[test]
    fn test_markdown_warnings_by_kind() {
        let reports = vec![create_test_report()];
        let markdown = format_markdown_summary(&RunSummary {
            reports: &reports,
            failed_categories: &[],
            scored: &[],
        });

        assert!(markdown.contains("| missing-field | 1 |"));
        assert!(markdown.contains("| untitled-article | 1 |"));
    }

    #[test]
    fn test_markdown_article_list_with_scores() {
        let reports = vec![create_test_report()];
        let scored = vec![ScoredArticle {
            article: reports[0].articles[0].clone(),
            score: 0.5,
        }];
        let markdown = format_markdown_summary(&RunSummary {
            reports: &reports,
            failed_categories: &[],
            scored: &scored,
        });

        assert!(markdown.contains("| 2024-01-01 10:00 | news | [X](https://www.rte.ie/news/a) | 0.50 |"));
        assert!(markdown.contains("Pipes \\| and more"));
        assert!(markdown.contains("- **Mean Sentiment**: 0.500"));
    }

    #[test]
    fn test_markdown_failed_categories() {
        let failed = vec![("sport".to_string(), "HTTP status 404".to_string())];
        let markdown = format_markdown_summary(&RunSummary {
            reports: &[],
            failed_categories: &failed,
            scored: &[],
        });

        assert!(markdown.contains("0 crawled, 1 failed"));
        assert!(markdown.contains("- **sport**: HTTP status 404"));
        assert!(!markdown.contains("## Articles"));
    }

    #[test]
    fn test_generate_markdown_summary_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.md");
        let reports = vec![create_test_report()];

        generate_markdown_summary(
            &RunSummary {
                reports: &reports,
                failed_categories: &[],
                scored: &[],
            },
            &path,
        )
        .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Article Harvest Summary"));
    }
}
