//! Core embedding and similarity-graph logic for NoteGraph.
//! Notes come in as text; vectors, coordinates and graphs come out.

pub mod config;
pub mod db;
pub mod embedding;
pub mod graph;
pub mod logging;
pub mod model;
pub mod projection;
pub mod repo;
pub mod service;

pub use config::AppConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use embedding::{CodecError, EmbeddingError, EmbeddingGenerator, EmbeddingModel};
pub use graph::{cosine_similarity, GraphError, SimilarityGraph, SimilarityGraphBuilder};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::embedding::{Coordinates, EmbeddedNote, EmbeddingRecord};
pub use model::note::{Note, NoteId, NoteScope, OwnerId};
pub use projection::{BuiltinProjector, CoordinateReducer, ProjectionError, ProjectionProvider};
pub use repo::embedding_store::{EmbeddingStore, SqliteEmbeddingStore};
pub use repo::note_repo::{NoteRepository, SqliteNoteRepository};
pub use repo::{RepoError, RepoResult};
pub use service::backfill::{BackfillOrchestrator, BackfillReport, GenerationReport};
pub use service::graph_service::NoteGraphService;
pub use service::lifecycle::{NoteLifecycle, SavedNote};
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
