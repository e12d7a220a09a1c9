//! Storage traits and error types
//!
//! This module defines the trait interface for archive backends and
//! associated error types.

use crate::analysis::TrendPoint;
use crate::record::Article;
use crate::storage::{ArchiveStats, RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for archive backend implementations
///
/// The archive accumulates articles and their sentiment scores across runs
/// so trends can span more than one crawl.
pub trait ArticleStore {
    // ===== Run Management =====

    /// Creates a new run in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(
        &mut self,
        category: &str,
        config_hash: &str,
        started_at: &DateTime<Utc>,
    ) -> StorageResult<i64>;

    /// Gets the most recently created run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Stamps the end time, final status and counts of a run
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        finished_at: &DateTime<Utc>,
        article_count: usize,
        warning_count: usize,
    ) -> StorageResult<()>;

    // ===== Articles =====

    /// Inserts an article or refreshes the stored copy with the same URL
    ///
    /// A missing score never erases a score stored earlier.
    fn upsert_article(
        &mut self,
        run_id: i64,
        article: &Article,
        score: Option<f64>,
    ) -> StorageResult<()>;

    /// Dated, scored articles as a time-ordered series
    ///
    /// # Arguments
    ///
    /// * `category` - Restrict to one category, or `None` for all
    fn load_trend(&self, category: Option<&str>) -> StorageResult<Vec<TrendPoint>>;

    // ===== Statistics =====

    fn archive_stats(&self) -> StorageResult<ArchiveStats>;
}
