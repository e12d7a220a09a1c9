use crate::record::Article;

/// Ordered, append-only collection of harvested articles
///
/// Only the pipeline controller writes to a sink; workers hand their results
/// back over a channel instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleSink {
    articles: Vec<Article>,
}

impl ArticleSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, article: Article) {
        self.articles.push(article);
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Article> {
        self.articles.iter()
    }

    /// Takes every article out, leaving the sink empty
    pub fn drain(&mut self) -> Vec<Article> {
        std::mem::take(&mut self.articles)
    }

    pub fn into_vec(self) -> Vec<Article> {
        self.articles
    }
}

impl<'a> IntoIterator for &'a ArticleSink {
    type Item = &'a Article;
    type IntoIter = std::slice::Iter<'a, Article>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
