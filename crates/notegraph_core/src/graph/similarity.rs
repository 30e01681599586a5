//! Thresholded cosine-similarity graph.
//!
//! # Invariants
//! - Pairs are visited as `i < j`, `i` ascending outer, `j` ascending inner;
//!   edge order in the output follows that visit order.
//! - An edge exists iff the unrounded similarity is `>= threshold`; the
//!   reported similarity is rounded to 3 decimals.
//! - Edge endpoints are canonical: `source < target`.
//! - Zero-norm vectors and length mismatches exclude the pair only.
//!
//! The pass is O(n²·D) with no caching.

use crate::model::embedding::EmbeddedNote;
use crate::model::note::NoteId;
use log::debug;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_THRESHOLD: f64 = 0.5;

const LABEL_MAX_CHARS: usize = 100;
const LABEL_ELLIPSIS: &str = "...";
const NODE_SIZE_MIN: f64 = 5.0;
const NODE_SIZE_MAX: f64 = 20.0;
const CHARS_PER_SIZE_UNIT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GraphError {
    InvalidThreshold(f64),
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidThreshold(value) => {
                write!(f, "similarity threshold must be a finite number, got {value}")
            }
        }
    }
}

impl Error for GraphError {}

/// Visualization node for one note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NoteId,
    pub label: String,
    /// Note creation time, Unix epoch milliseconds.
    pub timestamp: i64,
    pub size: f64,
}

/// Undirected similarity edge with canonical endpoint order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub source: NoteId,
    pub target: NoteId,
    pub similarity: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub pairs_compared: usize,
    /// Pairs skipped because similarity is undefined for them.
    pub pairs_excluded: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<SimilarityEdge>,
    pub stats: GraphStats,
}

/// Cosine similarity of two vectors, clamped to `[-1, 1]`.
///
/// Returns `None` when either norm is zero or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}

/// Builds similarity graphs for a fixed threshold.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityGraphBuilder {
    threshold: f64,
}

impl Default for SimilarityGraphBuilder {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl SimilarityGraphBuilder {
    /// Any finite threshold is accepted; values above 1 yield no edges and
    /// values below -1 connect every defined pair.
    pub fn new(threshold: f64) -> Result<Self, GraphError> {
        if !threshold.is_finite() {
            return Err(GraphError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Builds nodes and edges for embedded notes, in input order.
    pub fn build(&self, items: &[EmbeddedNote]) -> SimilarityGraph {
        let nodes: Vec<GraphNode> = items
            .iter()
            .map(|item| GraphNode {
                id: item.note.id,
                label: node_label(&item.note.content),
                timestamp: item.note.created_at,
                size: node_size(&item.note.content),
            })
            .collect();

        let vectors: Vec<(NoteId, &[f32])> = items
            .iter()
            .map(|item| (item.note.id, item.vector.as_slice()))
            .collect();
        let (edges, mut stats) = self.edges(&vectors);
        stats.nodes = nodes.len();

        SimilarityGraph {
            nodes,
            edges,
            stats,
        }
    }

    /// Computes thresholded edges for `(id, vector)` pairs.
    pub fn edges(&self, vectors: &[(NoteId, &[f32])]) -> (Vec<SimilarityEdge>, GraphStats) {
        let mut edges = Vec::new();
        let mut stats = GraphStats {
            nodes: vectors.len(),
            ..GraphStats::default()
        };

        for (i, (left_id, left)) in vectors.iter().enumerate() {
            for (right_id, right) in &vectors[i + 1..] {
                stats.pairs_compared += 1;
                let Some(similarity) = cosine_similarity(left, right) else {
                    stats.pairs_excluded += 1;
                    continue;
                };
                if similarity >= self.threshold {
                    let (source, target) = if left_id <= right_id {
                        (*left_id, *right_id)
                    } else {
                        (*right_id, *left_id)
                    };
                    edges.push(SimilarityEdge {
                        source,
                        target,
                        similarity: round3(similarity),
                    });
                }
            }
        }

        stats.edges = edges.len();
        if stats.pairs_excluded > 0 {
            debug!(
                "event=graph_build module=graph status=degenerate pairs_excluded={}",
                stats.pairs_excluded
            );
        }
        (edges, stats)
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn node_label(content: &str) -> String {
    if content.chars().count() <= LABEL_MAX_CHARS {
        return content.to_string();
    }
    let mut label: String = content.chars().take(LABEL_MAX_CHARS).collect();
    label.push_str(LABEL_ELLIPSIS);
    label
}

fn node_size(content: &str) -> f64 {
    (content.chars().count() as f64 / CHARS_PER_SIZE_UNIT).clamp(NODE_SIZE_MIN, NODE_SIZE_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_similarity_is_one() {
        for vector in [vec![1.0_f32, 2.0, 3.0], vec![-0.2, 0.0, 7.5, 1e-3]] {
            let similarity = cosine_similarity(&vector, &vector).unwrap();
            assert!((similarity - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = [0.3_f32, -1.2, 4.0];
        let b = [2.0_f32, 0.5, -0.7];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn zero_vector_has_no_similarity() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
    }

    #[test]
    fn rejects_nan_threshold() {
        assert!(SimilarityGraphBuilder::new(f64::NAN).is_err());
        assert!(SimilarityGraphBuilder::new(1.1).is_ok());
    }

    #[test]
    fn label_truncates_to_100_chars_with_ellipsis() {
        let long = "é".repeat(150);
        let label = node_label(&long);
        assert_eq!(label.chars().count(), 103);
        assert!(label.ends_with("..."));
        assert_eq!(node_label("short"), "short");
        assert_eq!(node_label(&"a".repeat(100)), "a".repeat(100));
    }

    #[test]
    fn size_is_clamped() {
        assert_eq!(node_size("tiny"), 5.0);
        assert_eq!(node_size(&"x".repeat(500)), 10.0);
        assert_eq!(node_size(&"x".repeat(5000)), 20.0);
    }

    #[test]
    fn rounding_keeps_three_decimals() {
        assert_eq!(round3(0.123_456), 0.123);
        assert_eq!(round3(-0.9996), -1.0);
    }
}
