//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ArticleStore trait.

use crate::analysis::{ScoredArticle, TrendPoint};
use crate::crawler::CrawlReport;
use crate::record::Article;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ArticleStore, StorageError, StorageResult};
use crate::storage::{ArchiveStats, RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const RUN_COLUMNS: &str =
    "id, category, started_at, finished_at, config_hash, status, article_count, warning_count";

/// SQLite archive backend
pub struct SqliteArchive {
    conn: Connection,
}

impl SqliteArchive {
    /// Opens or creates an archive file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteArchive)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = init_database(path)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Records a whole category run in one transaction
    ///
    /// Every article in the report is upserted; scores are matched by URL
    /// against `scored`. A cancelled report finishes as `interrupted`.
    ///
    /// # Returns
    ///
    /// The ID of the recorded run
    pub fn save_report(
        &mut self,
        report: &CrawlReport,
        scored: &[ScoredArticle],
    ) -> StorageResult<i64> {
        let scores: HashMap<&str, f64> = scored
            .iter()
            .map(|s| (s.article.url.as_str(), s.score))
            .collect();

        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        let run_id = match self.record_report(report, &scores) {
            Ok(run_id) => run_id,
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    tracing::warn!("Rollback after failed archive write failed: {}", rollback);
                }
                return Err(e);
            }
        };
        self.conn.execute_batch("COMMIT")?;

        tracing::info!(
            "Archived run {} for '{}': {} articles",
            run_id,
            report.category,
            report.articles.len()
        );
        Ok(run_id)
    }

    fn record_report(
        &mut self,
        report: &CrawlReport,
        scores: &HashMap<&str, f64>,
    ) -> StorageResult<i64> {
        let config_hash = report.config_hash.as_deref().unwrap_or("");
        let status = if report.cancelled {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };

        let run_id = self.create_run(&report.category, config_hash, &report.started_at)?;
        for article in &report.articles {
            let score = scores.get(article.url.as_str()).copied();
            self.upsert_article(run_id, article, score)?;
        }
        self.finish_run(
            run_id,
            status,
            &report.finished_at,
            report.articles.len(),
            report.warnings.len(),
        )?;
        Ok(run_id)
    }
}

impl ArticleStore for SqliteArchive {
    // ===== Run Management =====

    fn create_run(
        &mut self,
        category: &str,
        config_hash: &str,
        started_at: &DateTime<Utc>,
    ) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO runs (category, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                category,
                started_at.to_rfc3339(),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        let run = self.conn.query_row(&sql, [], run_from_row).optional()?;
        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        finished_at: &DateTime<Utc>,
        article_count: usize,
        warning_count: usize,
    ) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET finished_at = ?1, status = ?2, article_count = ?3, warning_count = ?4
             WHERE id = ?5",
            params![
                finished_at.to_rfc3339(),
                status.to_db_string(),
                article_count as i64,
                warning_count as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Articles =====

    fn upsert_article(
        &mut self,
        run_id: i64,
        article: &Article,
        score: Option<f64>,
    ) -> StorageResult<()> {
        let tags = serde_json::to_string(&article.tags)?;
        self.conn.execute(
            "INSERT INTO articles (url, title, body, author, author_role, published_at, category,
                                   tags, sentiment_score, first_seen_run, last_seen_run, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10, ?11)
             ON CONFLICT(url) DO UPDATE SET
                 title = excluded.title,
                 body = excluded.body,
                 author = excluded.author,
                 author_role = excluded.author_role,
                 published_at = excluded.published_at,
                 category = excluded.category,
                 tags = excluded.tags,
                 sentiment_score = COALESCE(excluded.sentiment_score, articles.sentiment_score),
                 last_seen_run = excluded.last_seen_run,
                 updated_at = excluded.updated_at",
            params![
                article.url,
                article.title,
                article.body,
                article.author,
                article.author_role,
                article.published_at.map(|d| d.to_rfc3339()),
                article.category,
                tags,
                score,
                run_id,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn load_trend(&self, category: Option<&str>) -> StorageResult<Vec<TrendPoint>> {
        let mut stmt = self.conn.prepare(
            "SELECT published_at, sentiment_score, title FROM articles
             WHERE published_at IS NOT NULL
               AND sentiment_score IS NOT NULL
               AND (?1 IS NULL OR category = ?1)
             ORDER BY published_at, id",
        )?;

        let rows = stmt
            .query_map(params![category], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut points: Vec<TrendPoint> = rows
            .into_iter()
            .filter_map(|(at, score, label)| {
                parse_timestamp(&at).map(|at| TrendPoint { at, score, label })
            })
            .collect();
        // Stored strings may carry different offsets; order by instant
        points.sort_by_key(|p| p.at);
        Ok(points)
    }

    // ===== Statistics =====

    fn archive_stats(&self) -> StorageResult<ArchiveStats> {
        let runs: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;

        let (articles, dated, scored, mean): (i64, i64, i64, Option<f64>) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(published_at), COUNT(sentiment_score), AVG(sentiment_score)
             FROM articles",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT category, COUNT(*) FROM articles GROUP BY category")?;
        let articles_by_category: BTreeMap<String, u64> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<_, _>>()?;

        Ok(ArchiveStats {
            runs: runs as u64,
            articles: articles as u64,
            dated_articles: dated as u64,
            scored_articles: scored as u64,
            mean_score: mean,
            articles_by_category,
        })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        category: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
        article_count: row.get::<_, i64>(6)? as u64,
        warning_count: row.get::<_, i64>(7)? as u64,
    })
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Opens a database file with the archive's pragmas and schema applied
pub fn init_database(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )?;

    initialize_schema(&conn)?;

    Ok(conn)
}
