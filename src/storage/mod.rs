//! Storage module for the article archive
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Run tracking per category
//! - Article upserts keyed by URL, with sentiment scores
//! - Trend and statistics queries

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{init_database, SqliteArchive};
pub use traits::{ArticleStore, StorageError, StorageResult};

use std::collections::BTreeMap;

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub category: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub article_count: u64,
    pub warning_count: u64,
}

/// Aggregate figures over the whole archive
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchiveStats {
    pub runs: u64,
    pub articles: u64,
    pub dated_articles: u64,
    pub scored_articles: u64,
    pub mean_score: Option<f64>,
    pub articles_by_category: BTreeMap<String, u64>,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}
