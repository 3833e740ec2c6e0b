use crate::{ArticleId, ArticleRecord, ArticleSummary, BuiltIndex, Corpus, Error, Recommendation, Result, SimilarityMatrix};
use rand::Rng;

/// Read-only serving view over a built index. Safe to share across threads once constructed.
#[derive(Debug)]
pub struct Recommender {
    corpus: Corpus,
    similarity: SimilarityMatrix,
}

impl Recommender {
    pub fn new(corpus: Corpus, similarity: SimilarityMatrix) -> Result<Self> {
        similarity.validate()?;
        if corpus.len() != similarity.dim() {
            return Err(Error::DimensionMismatch { articles: corpus.len(), dim: similarity.dim() });
        }
        Ok(Self { corpus, similarity })
    }

    pub fn from_built(built: BuiltIndex) -> Result<Self> {
        Self::new(built.corpus, built.similarity)
    }

    pub fn corpus(&self) -> &Corpus { &self.corpus }

    pub fn similarity(&self) -> &SimilarityMatrix { &self.similarity }

    /// Top `n` articles most similar to `article_id`, never including the article itself.
    pub fn recommend(&self, article_id: ArticleId, n: usize) -> Result<Vec<Recommendation>> {
        self.corpus.get(article_id)?;
        self.similarity
            .top_n(article_id, n)?
            .into_iter()
            .map(|(idx, score)| -> Result<Recommendation> {
                let a = self.corpus.get(idx)?;
                Ok(Recommendation {
                    id: a.id,
                    title: a.title.clone(),
                    date: a.date.clone(),
                    link: a.link.clone(),
                    score: round3(score),
                })
            })
            .collect()
    }

    pub fn list_articles(&self) -> Vec<ArticleSummary> { self.corpus.list_summaries() }

    pub fn featured<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Result<Vec<&ArticleRecord>> {
        self.corpus.sample(k, rng)
    }
}

fn round3(score: f32) -> f64 {
    (f64::from(score) * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_three_places() {
        assert_eq!(round3(0.123_456), 0.123);
        assert_eq!(round3(0.9996), 1.0);
        assert_eq!(round3(0.0), 0.0);
    }

    #[test]
    fn rejects_mismatched_parts() {
        let err = Recommender::new(Corpus::default(), SimilarityMatrix::compute(&[Default::default()])).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { articles: 0, dim: 1 }));
    }
}
