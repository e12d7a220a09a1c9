//! Output module for exporting crawl results
//!
//! This module handles:
//! - Exporting articles (optionally scored) as JSON
//! - Generating markdown summaries of crawl runs
//! - Printing archive statistics

mod json;
mod markdown;
pub mod stats;

pub use json::{articles_to_json, write_json};
pub use markdown::{format_markdown_summary, generate_markdown_summary, RunSummary};
pub use stats::{format_statistics, print_statistics};

use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to draw chart: {0}")]
    Chart(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes `contents` to `path`, creating missing parent directories
pub(crate) fn write_file(path: &Path, contents: &[u8]) -> OutputResult<()> {
    let wrap = |source| OutputError::Write {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    fs::write(path, contents).map_err(wrap)?;

    tracing::debug!(path = %path.display(), bytes = contents.len(), "Wrote output file");
    Ok(())
}
