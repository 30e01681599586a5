//! Projection provider contract.
//!
//! A provider maps `n` input vectors to `n` output rows of the requested
//! arity. Scaling into the unit range is owned by the reducer, so providers
//! return raw coordinates.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    /// Provider cannot honor a fixed seed while determinism is required.
    Unseeded(String),
    /// Provider returned rows of the wrong count, arity, or non-finite values.
    InvalidOutput(String),
    /// Provider-internal failure.
    Provider(String),
}

impl Display for ProjectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unseeded(name) => write!(
                f,
                "projection provider `{name}` cannot be seeded and deterministic output is required"
            ),
            Self::InvalidOutput(message) => write!(f, "invalid projection output: {message}"),
            Self::Provider(message) => write!(f, "projection provider error: {message}"),
        }
    }
}

impl Error for ProjectionError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cosine,
}

/// Starting layout handed to the iterative optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initialization {
    /// Leading eigenvectors of the double-centered distance matrix.
    Spectral,
    /// Leading principal components of the input vectors.
    Pca,
}

/// Method-specific tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionParams {
    /// Fuzzy neighbor-graph layout with a minimum point spacing; used for
    /// the spatial view.
    DistanceEmphasis {
        n_neighbors: usize,
        min_dist: f64,
        init: Initialization,
    },
    /// Perplexity-calibrated neighborhood layout; used for the cluster view.
    ClusterEmphasis {
        perplexity: f64,
        init: Initialization,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionRequest {
    pub dimensions: usize,
    pub seed: u64,
    pub metric: Metric,
    pub params: ProjectionParams,
}

pub trait ProjectionProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether identical input and seed always produce identical output.
    fn supports_seed(&self) -> bool;

    fn project(
        &self,
        data: &[Vec<f32>],
        request: &ProjectionRequest,
    ) -> Result<Vec<Vec<f64>>, ProjectionError>;
}
