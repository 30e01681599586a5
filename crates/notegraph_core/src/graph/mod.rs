//! Pairwise similarity graph over note embeddings.

pub mod similarity;

pub use similarity::{
    cosine_similarity, GraphError, GraphNode, GraphStats, SimilarityEdge, SimilarityGraph,
    SimilarityGraphBuilder, DEFAULT_THRESHOLD,
};
