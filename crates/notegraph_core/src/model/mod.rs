//! Domain model for notes, their embeddings and projected coordinates.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId`.
//! - Stored embedding vectors have exactly [`EMBEDDING_DIM`] components.
//! - Stored coordinates lie within `[-1, 1]` on every axis.

pub mod embedding;
pub mod note;

/// Fixed dimensionality of every persisted embedding vector.
pub const EMBEDDING_DIM: usize = 384;
