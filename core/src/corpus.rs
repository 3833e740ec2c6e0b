use crate::normalize::normalize;
use crate::{ArticleId, ArticleRecord, ArticleSummary, Error, RawArticle, Result};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Deduplicated articles; an article's id is its position here and its row in the
/// similarity matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    articles: Vec<ArticleRecord>,
}

impl Corpus {
    /// Drop incomplete rows and exact duplicates (first occurrence wins), assign dense ids in
    /// input order, and normalize every article's text.
    pub fn load(rows: Vec<RawArticle>) -> Self {
        let total = rows.len();
        let mut seen: HashSet<RawArticle> = HashSet::new();
        let mut incomplete = 0usize;
        let mut kept = Vec::new();
        for row in rows {
            let complete = row.date.is_some() && row.title.is_some() && row.text.is_some() && row.link.is_some();
            if !complete {
                incomplete += 1;
                continue;
            }
            if seen.insert(row.clone()) {
                kept.push(row);
            }
        }
        let duplicates = total - incomplete - kept.len();

        let articles: Vec<ArticleRecord> = kept
            .into_par_iter()
            .enumerate()
            .map(|(id, row)| {
                let text = row.text.unwrap_or_default();
                ArticleRecord {
                    id,
                    title: row.title.unwrap_or_default(),
                    date: row.date.unwrap_or_default(),
                    link: row.link.unwrap_or_default(),
                    cleaned_text: normalize(&text),
                    text,
                }
            })
            .collect();
        tracing::info!(total, incomplete, duplicates, kept = articles.len(), "corpus loaded");
        Self { articles }
    }

    /// Rebuild from persisted records, checking ids are `0..len` in order.
    pub fn from_records(articles: Vec<ArticleRecord>) -> Result<Self> {
        if let Some((pos, a)) = articles.iter().enumerate().find(|(pos, a)| a.id != *pos) {
            return Err(Error::InvalidArgument(format!("article at position {pos} has id {}", a.id)));
        }
        Ok(Self { articles })
    }

    pub fn len(&self) -> usize { self.articles.len() }

    pub fn is_empty(&self) -> bool { self.articles.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &ArticleRecord> { self.articles.iter() }

    pub fn records(&self) -> &[ArticleRecord] { &self.articles }

    pub fn get(&self, id: ArticleId) -> Result<&ArticleRecord> {
        self.articles.get(id).ok_or(Error::NotFound { id })
    }

    /// `k` distinct articles chosen uniformly without replacement.
    pub fn sample<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Result<Vec<&ArticleRecord>> {
        if k < 1 || k > self.articles.len() {
            return Err(Error::InvalidArgument(format!(
                "sample size {k} must be between 1 and {}",
                self.articles.len()
            )));
        }
        Ok(rand::seq::index::sample(rng, self.articles.len(), k)
            .into_iter()
            .map(|i| &self.articles[i])
            .collect())
    }

    pub fn list_summaries(&self) -> Vec<ArticleSummary> {
        self.articles
            .iter()
            .map(|a| ArticleSummary { id: a.id, title: a.title.clone() })
            .collect()
    }
}
