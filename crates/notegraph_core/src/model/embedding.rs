//! Embedding and coordinate records attached to notes.

use crate::model::note::{Note, NoteId};
use serde::{Deserialize, Serialize};

/// Projected positions of one note.
///
/// Both tuples are absent until the first projection pass for the scope and
/// are rewritten together on every later pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Distance-emphasis projection used by the spatial view.
    pub spatial: Option<[f64; 3]>,
    /// Cluster-emphasis projection used by the cluster view.
    pub cluster: Option<[f64; 2]>,
}

impl Coordinates {
    pub fn is_empty(&self) -> bool {
        self.spatial.is_none() && self.cluster.is_none()
    }
}

/// Stored embedding for one note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub note_id: NoteId,
    pub vector: Vec<f32>,
    pub coordinates: Coordinates,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// A note joined with its embedding, as returned by scope listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedNote {
    pub note: Note,
    pub vector: Vec<f32>,
    pub coordinates: Coordinates,
}

/// Full replacement of one record's projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateUpdate {
    pub note_id: NoteId,
    pub spatial: [f64; 3],
    pub cluster: [f64; 2],
}
