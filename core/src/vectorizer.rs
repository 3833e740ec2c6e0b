use crate::stopwords::is_term_stopword;
use crate::{Error, Result, TermId};
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

lazy_static! {
    static ref TERM_RE: Regex = Regex::new(r"(?u)\b\w\w+\b").expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// Inclusive range of n-gram lengths.
    pub ngram_range: (usize, usize),
    /// Terms must appear in at least this many documents.
    pub min_df: usize,
    /// Terms appearing in more than this fraction of documents are dropped.
    pub max_df: f32,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self { ngram_range: (1, 3), min_df: 2, max_df: 0.8 }
    }
}

impl VectorizerConfig {
    pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> Self {
        self.ngram_range = (min_n, max_n);
        self
    }

    pub fn with_min_df(mut self, min_df: usize) -> Self {
        self.min_df = min_df;
        self
    }

    pub fn with_max_df(mut self, max_df: f32) -> Self {
        self.max_df = max_df;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = self.ngram_range;
        if lo == 0 || lo > hi {
            return Err(Error::InvalidArgument(format!("invalid ngram range ({lo}, {hi})")));
        }
        if !(self.max_df > 0.0 && self.max_df <= 1.0) {
            return Err(Error::InvalidArgument(format!("max_df must be in (0, 1], got {}", self.max_df)));
        }
        Ok(())
    }
}

/// Sparse TF-IDF vector: `(term id, weight)` pairs sorted by term id, weights non-negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermVector {
    entries: Vec<(TermId, f32)>,
}

impl TermVector {
    pub fn from_entries(mut entries: Vec<(TermId, f32)>) -> Self {
        entries.sort_by_key(|&(t, _)| t);
        Self { entries }
    }

    pub fn entries(&self) -> &[(TermId, f32)] { &self.entries }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn get(&self, term: TermId) -> Option<f32> {
        self.entries.binary_search_by_key(&term, |&(t, _)| t).ok().map(|i| self.entries[i].1)
    }

    pub fn norm(&self) -> f32 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    vocabulary: HashMap<String, TermId>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    pub fn new(config: VectorizerConfig) -> Self {
        Self { config, vocabulary: HashMap::new(), idf: Vec::new() }
    }

    pub fn config(&self) -> &VectorizerConfig { &self.config }

    pub fn vocabulary(&self) -> &HashMap<String, TermId> { &self.vocabulary }

    pub fn vocabulary_size(&self) -> usize { self.vocabulary.len() }

    /// Smoothed IDF per term id.
    pub fn idf(&self) -> &[f32] { &self.idf }

    /// Word n-grams of a document after dropping short tokens and stopwords.
    pub fn analyze(&self, document: &str) -> Vec<String> {
        let lowered = document.to_lowercase();
        let tokens: Vec<&str> = TERM_RE
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !is_term_stopword(t))
            .collect();
        let (lo, hi) = self.config.ngram_range;
        let mut terms = Vec::new();
        for n in lo..=hi {
            for gram in tokens.windows(n) {
                terms.push(gram.join(" "));
            }
        }
        terms
    }

    /// Learn the vocabulary and IDF weights. Replaces any previous fit.
    pub fn fit<S: AsRef<str> + Sync>(&mut self, documents: &[S]) -> Result<()> {
        self.config.validate()?;
        if documents.is_empty() {
            return Err(Error::EmptyVocabulary("corpus is empty".into()));
        }

        let per_doc: Vec<HashSet<String>> = documents
            .par_iter()
            .map(|d| self.analyze(d.as_ref()).into_iter().collect())
            .collect();
        let mut df: HashMap<String, usize> = HashMap::new();
        for terms in per_doc {
            for term in terms {
                *df.entry(term).or_insert(0) += 1;
            }
        }
        if df.is_empty() {
            return Err(Error::EmptyVocabulary("documents contain only stop words".into()));
        }

        let n_docs = documents.len();
        let max_doc_count = self.config.max_df * n_docs as f32;
        if max_doc_count < self.config.min_df as f32 {
            return Err(Error::InvalidArgument(format!(
                "max_df={} allows at most {max_doc_count} of {n_docs} documents, fewer than min_df={}",
                self.config.max_df, self.config.min_df
            )));
        }
        let kept: BTreeSet<(&String, usize)> = df
            .iter()
            .filter(|(_, &count)| count >= self.config.min_df && count as f32 <= max_doc_count)
            .map(|(term, &count)| (term, count))
            .collect();
        if kept.is_empty() {
            return Err(Error::EmptyVocabulary(format!(
                "no terms remain after pruning {} candidates (min_df={}, max_df={})",
                df.len(),
                self.config.min_df,
                self.config.max_df
            )));
        }

        let mut vocabulary = HashMap::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (term_id, (term, count)) in kept.into_iter().enumerate() {
            vocabulary.insert(term.clone(), term_id as TermId);
            let smoothed = ((1.0 + n_docs as f64) / (1.0 + count as f64)).ln() + 1.0;
            idf.push(smoothed as f32);
        }
        tracing::debug!(candidates = df.len(), vocabulary_size = vocabulary.len(), "vocabulary fitted");
        self.vocabulary = vocabulary;
        self.idf = idf;
        Ok(())
    }

    /// Project documents into the fitted space. Unknown terms are ignored; a document with no
    /// known terms becomes the zero vector.
    pub fn transform<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Result<Vec<TermVector>> {
        if self.vocabulary.is_empty() {
            return Err(Error::InvalidArgument("vectorizer is not fitted".into()));
        }
        Ok(documents.par_iter().map(|d| self.vectorize(d.as_ref())).collect())
    }

    pub fn fit_transform<S: AsRef<str> + Sync>(&mut self, documents: &[S]) -> Result<Vec<TermVector>> {
        self.fit(documents)?;
        self.transform(documents)
    }

    fn vectorize(&self, document: &str) -> TermVector {
        let mut counts: HashMap<TermId, u32> = HashMap::new();
        for term in self.analyze(document) {
            if let Some(&tid) = self.vocabulary.get(&term) {
                *counts.entry(tid).or_insert(0) += 1;
            }
        }
        let mut entries: Vec<(TermId, f32)> = counts
            .into_iter()
            .map(|(tid, tf)| (tid, tf as f32 * self.idf[tid as usize]))
            .collect();
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in entries.iter_mut() { *w /= norm; }
        }
        TermVector::from_entries(entries)
    }
}
