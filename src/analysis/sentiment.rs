use crate::record::Article;
use serde::Serialize;
use vader_sentiment::SentimentIntensityAnalyzer;

/// Scores text polarity
///
/// Scores fall in `[-1, 1]`: negative text below zero, positive above.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> f64;
}

/// VADER scorer backed by `vader_sentiment`
///
/// Uses the analyzer's `compound` score, which is already normalized
/// into `[-1, 1]`.
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VaderScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaderScorer").finish_non_exhaustive()
    }
}

impl SentimentScorer for VaderScorer {
    fn score(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }
        let scores = self.analyzer.polarity_scores(text);
        scores
            .get("compound")
            .copied()
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0)
    }
}

/// An article paired with its sentiment score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredArticle {
    #[serde(flatten)]
    pub article: Article,
    #[serde(rename = "sentimentScore")]
    pub score: f64,
}

/// Scores every article's title and body, keeping article order
pub fn score_articles(articles: &[Article], scorer: &dyn SentimentScorer) -> Vec<ScoredArticle> {
    articles
        .iter()
        .map(|article| ScoredArticle {
            score: scorer.score(&article.scoring_text()),
            article: article.clone(),
        })
        .collect()
}
