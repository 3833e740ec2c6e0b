pub mod corpus;
pub mod error;
pub mod normalize;
pub mod persist;
pub mod recommend;
pub mod similarity;
pub mod stopwords;
pub mod vectorizer;

use serde::{Deserialize, Serialize};

pub use corpus::Corpus;
pub use error::{Error, Result};
pub use recommend::Recommender;
pub use similarity::SimilarityMatrix;
pub use vectorizer::{TermVector, TfidfVectorizer, VectorizerConfig};

pub type ArticleId = usize;
pub type TermId = u32;

/// One input row as it arrives from the corpus source. Rows missing any field are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawArticle {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Row position in the corpus and in the similarity matrix.
    pub id: ArticleId,
    pub title: String,
    pub date: String,
    pub link: String,
    pub text: String,
    pub cleaned_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: ArticleId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: ArticleId,
    pub title: String,
    pub date: String,
    pub link: String,
    pub score: f64, // rounded to 3 decimals
}

/// Everything the offline build produces. Nothing here exists unless every stage succeeded.
#[derive(Debug)]
pub struct BuiltIndex {
    pub corpus: Corpus,
    pub vectorizer: TfidfVectorizer,
    pub similarity: SimilarityMatrix,
}

/// Run the full offline pipeline: dedup + normalize, fit TF-IDF, compute pairwise cosine similarity.
pub fn build_index(rows: Vec<RawArticle>, config: VectorizerConfig) -> Result<BuiltIndex> {
    let start = std::time::Instant::now();
    let corpus = Corpus::load(rows);
    let documents: Vec<&str> = corpus.iter().map(|a| a.cleaned_text.as_str()).collect();
    let mut vectorizer = TfidfVectorizer::new(config);
    let vectors = vectorizer.fit_transform(&documents)?;
    let similarity = SimilarityMatrix::compute(&vectors);
    tracing::info!(
        num_articles = corpus.len(),
        vocabulary_size = vectorizer.vocabulary_size(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "index built"
    );
    Ok(BuiltIndex { corpus, vectorizer, similarity })
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn row(date: &str, title: &str, text: &str, link: &str) -> RawArticle {
        RawArticle {
            date: Some(date.into()),
            title: Some(title.into()),
            text: Some(text.into()),
            link: Some(link.into()),
        }
    }

    #[test]
    fn build_index_aligns_corpus_and_matrix() {
        let rows = vec![
            row("2024-01-01", "A", "a river flows", "http://a"),
            row("2024-01-02", "B", "a river flows fast", "http://b"),
            row("2024-01-03", "C", "completely unrelated text", "http://c"),
        ];
        let built = build_index(rows, VectorizerConfig::default()).unwrap();
        assert_eq!(built.corpus.len(), 3);
        assert_eq!(built.similarity.dim(), 3);
        assert!(built.vectorizer.vocabulary().contains_key("river flows"));
    }

    #[test]
    fn build_index_fails_on_empty_corpus() {
        let err = build_index(Vec::new(), VectorizerConfig::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyVocabulary(_)));
    }
}
