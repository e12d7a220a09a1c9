//! Downstream analysis of harvested articles
//!
//! Sentiment scoring (VADER) and trend charting (plotters), each behind a
//! narrow trait.

mod chart;
mod sentiment;

pub use chart::{trend_points, ChartRenderer, SvgScatterRenderer, TrendPoint};
pub use sentiment::{score_articles, ScoredArticle, SentimentScorer, VaderScorer};
