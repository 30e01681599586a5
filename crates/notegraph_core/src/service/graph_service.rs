//! Facade exposing embeddings, backfill and similarity graphs per scope.

use crate::embedding::EmbeddingGenerator;
use crate::graph::{SimilarityGraph, SimilarityGraphBuilder, DEFAULT_THRESHOLD};
use crate::model::embedding::EmbeddedNote;
use crate::model::note::NoteScope;
use crate::projection::CoordinateReducer;
use crate::repo::embedding_store::EmbeddingStore;
use crate::repo::note_repo::NoteRepository;
use crate::service::backfill::{BackfillOrchestrator, BackfillReport, GenerationReport};
use crate::service::lifecycle::NoteLifecycle;
use crate::service::ServiceResult;
use log::info;

pub struct NoteGraphService<'a, N: ?Sized, S: ?Sized> {
    notes: &'a N,
    store: &'a S,
    generator: &'a EmbeddingGenerator,
    reducer: &'a CoordinateReducer,
    default_threshold: f64,
}

impl<'a, N, S> NoteGraphService<'a, N, S>
where
    N: NoteRepository + ?Sized,
    S: EmbeddingStore + ?Sized,
{
    pub fn new(
        notes: &'a N,
        store: &'a S,
        generator: &'a EmbeddingGenerator,
        reducer: &'a CoordinateReducer,
    ) -> Self {
        Self {
            notes,
            store,
            generator,
            reducer,
            default_threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Threshold used when [`Self::similarity_graph`] gets `None`.
    pub fn with_default_threshold(mut self, threshold: f64) -> Self {
        self.default_threshold = threshold;
        self
    }

    /// Embeddings and coordinates of every embedded note in `scope`.
    pub fn embeddings(&self, scope: &NoteScope) -> ServiceResult<Vec<EmbeddedNote>> {
        Ok(self.store.list_all(scope)?)
    }

    pub fn generate_missing(&self, scope: &NoteScope) -> ServiceResult<GenerationReport> {
        self.backfill().generate_missing(scope)
    }

    pub fn recompute_coordinates(&self, scope: &NoteScope) -> ServiceResult<usize> {
        self.backfill().recompute_coordinates(scope)
    }

    pub fn run_backfill(&self, scope: &NoteScope) -> ServiceResult<BackfillReport> {
        self.backfill().run(scope)
    }

    /// Thresholded similarity graph over the embedded notes of `scope`.
    pub fn similarity_graph(
        &self,
        scope: &NoteScope,
        threshold: Option<f64>,
    ) -> ServiceResult<SimilarityGraph> {
        let builder = SimilarityGraphBuilder::new(threshold.unwrap_or(self.default_threshold))?;
        let items = self.store.list_all(scope)?;
        let graph = builder.build(&items);
        info!(
            "event=similarity_graph module=service status=ok nodes={} edges={} excluded={}",
            graph.stats.nodes, graph.stats.edges, graph.stats.pairs_excluded
        );
        Ok(graph)
    }

    pub fn lifecycle(&self) -> NoteLifecycle<'a, N, S> {
        NoteLifecycle::new(self.notes, self.store, self.generator)
    }

    fn backfill(&self) -> BackfillOrchestrator<'a, N, S> {
        BackfillOrchestrator::new(self.notes, self.store, self.generator, self.reducer)
    }
}
