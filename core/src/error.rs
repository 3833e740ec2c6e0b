use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("article {id} not found")]
    NotFound { id: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Build-time failure: no term survived the document-frequency filters.
    #[error("empty vocabulary: {0}")]
    EmptyVocabulary(String),

    #[error("row {row} out of range for matrix of dimension {dim}")]
    IndexOutOfRange { row: usize, dim: usize },

    #[error("corpus has {articles} articles but similarity matrix has dimension {dim}")]
    DimensionMismatch { articles: usize, dim: usize },
}
