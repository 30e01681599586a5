//! Embedding model contract.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure raised while producing embeddings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    /// The model could not be loaded or invoked.
    ModelUnavailable(String),
    /// The model produced a vector of unexpected length.
    DimensionMismatch { expected: usize, actual: usize },
}

impl Display for EmbeddingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModelUnavailable(reason) => write!(f, "embedding model unavailable: {reason}"),
            Self::DimensionMismatch { expected, actual } => write!(
                f,
                "embedding dimension mismatch: expected {expected}, got {actual}"
            ),
        }
    }
}

impl Error for EmbeddingError {}

/// Black-box text encoder.
///
/// Implementations are shared across threads behind `Arc<dyn EmbeddingModel>`
/// once loaded and must not require exclusive access from callers.
pub trait EmbeddingModel: Send + Sync {
    /// Model identifier, recorded in logs.
    fn name(&self) -> &str;

    /// Length of every vector this model produces.
    fn dimensions(&self) -> usize;

    /// Encodes `texts` in order, one vector per input.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}
