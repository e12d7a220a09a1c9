//! Statistics display for the article archive
//!
//! This module renders archive statistics loaded from the storage layer.

use crate::storage::{ArchiveStats, RunRecord};

/// Formats archive statistics for the terminal
///
/// # Arguments
///
/// * `stats` - Aggregate figures from the archive
/// * `latest` - The most recent run, if any
pub fn format_statistics(stats: &ArchiveStats, latest: Option<&RunRecord>) -> String {
    let mut out = String::from("=== Archive Statistics ===\n\n");

    out.push_str("Overview:\n");
    out.push_str(&format!("  Runs recorded: {}\n", stats.runs));
    out.push_str(&format!("  Articles archived: {}\n", stats.articles));
    out.push_str(&format!(
        "  With publish date: {} ({:.1}%)\n",
        stats.dated_articles,
        percentage(stats.dated_articles, stats.articles)
    ));
    out.push_str(&format!(
        "  With sentiment score: {} ({:.1}%)\n",
        stats.scored_articles,
        percentage(stats.scored_articles, stats.articles)
    ));
    if let Some(mean) = stats.mean_score {
        out.push_str(&format!("  Mean sentiment: {:.3}\n", mean));
    }
    out.push('\n');

    if !stats.articles_by_category.is_empty() {
        out.push_str("Articles by Category:\n");
        // Largest categories first
        let mut counts: Vec<_> = stats.articles_by_category.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (category, count) in counts {
            out.push_str(&format!("  {}: {}\n", category, count));
        }
        out.push('\n');
    }

    if let Some(run) = latest {
        out.push_str(&format!(
            "Latest run: #{} '{}' {} ({} articles, {} warnings, started {})\n",
            run.id,
            run.category,
            run.status.to_db_string(),
            run.article_count,
            run.warning_count,
            run.started_at
        ));
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ArchiveStats, latest: Option<&RunRecord>) {
    print!("{}", format_statistics(stats, latest));
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}
