//! Bulk embedding generation and coordinate recomputation.
//!
//! # Responsibility
//! - Embed every note of a scope that has no stored vector.
//! - Recompute projected coordinates for a whole scope.
//!
//! # Invariants
//! - Notes that already have a vector are never re-embedded.
//! - A failed batch call falls back to per-note calls; successes are kept
//!   and failures reported by id.
//! - Coordinate recompute rewrites every record of the scope in one
//!   transaction, or none.

use crate::embedding::EmbeddingGenerator;
use crate::model::embedding::CoordinateUpdate;
use crate::model::note::{Note, NoteId, NoteScope};
use crate::projection::CoordinateReducer;
use crate::repo::embedding_store::EmbeddingStore;
use crate::repo::note_repo::NoteRepository;
use crate::repo::RepoError;
use crate::service::ServiceResult;
use log::{info, warn};
use serde::Serialize;
use std::time::Instant;

/// Outcome of one generation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Vectors written during this pass.
    pub generated: usize,
    /// Notes in the scope.
    pub total: usize,
    /// Notes whose vector could not be generated or stored.
    pub failed: Vec<NoteId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub generation: GenerationReport,
    /// Records whose coordinates were rewritten.
    pub coordinates: usize,
}

pub struct BackfillOrchestrator<'a, N: ?Sized, S: ?Sized> {
    notes: &'a N,
    store: &'a S,
    generator: &'a EmbeddingGenerator,
    reducer: &'a CoordinateReducer,
}

impl<'a, N, S> BackfillOrchestrator<'a, N, S>
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
        }
    }

    /// Embeds every note of `scope` that lacks a stored vector.
    pub fn generate_missing(&self, scope: &NoteScope) -> ServiceResult<GenerationReport> {
        let started_at = Instant::now();
        let notes = self.notes.list_notes(scope)?;
        let ids: Vec<NoteId> = notes.iter().map(|note| note.id).collect();
        let missing = self.store.get_missing(&ids)?;
        let pending: Vec<&Note> = notes
            .iter()
            .filter(|note| missing.contains(&note.id))
            .collect();

        let mut report = GenerationReport {
            total: notes.len(),
            ..GenerationReport::default()
        };
        if pending.is_empty() {
            info!(
                "event=backfill_generate module=service status=noop total={}",
                report.total
            );
            return Ok(report);
        }

        let texts: Vec<String> = pending.iter().map(|note| note.content.clone()).collect();
        match self.generator.embed_batch(&texts) {
            Ok(vectors) => {
                for (note, vector) in pending.iter().zip(vectors) {
                    self.store_vector(note.id, &vector, &mut report)?;
                }
            }
            Err(err) => {
                warn!(
                    "event=backfill_generate module=service status=batch_failed pending={} error={err}",
                    pending.len()
                );
                for note in &pending {
                    match self.generator.embed_one(&note.content) {
                        Ok(vector) => self.store_vector(note.id, &vector, &mut report)?,
                        Err(err) => {
                            warn!(
                                "event=backfill_generate module=service status=item_failed note_id={} error={err}",
                                note.id
                            );
                            report.failed.push(note.id);
                        }
                    }
                }
            }
        }

        info!(
            "event=backfill_generate module=service status=ok generated={} failed={} total={} duration_ms={}",
            report.generated,
            report.failed.len(),
            report.total,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Projects every stored vector of `scope` and overwrites all coordinates.
    pub fn recompute_coordinates(&self, scope: &NoteScope) -> ServiceResult<usize> {
        let started_at = Instant::now();
        let (ids, vectors): (Vec<NoteId>, Vec<Vec<f32>>) = self
            .store
            .list_all(scope)?
            .into_iter()
            .map(|item| (item.note.id, item.vector))
            .unzip();
        if ids.is_empty() {
            return Ok(0);
        }

        let spatial = self.reducer.reduce_3d(&vectors)?;
        let cluster = self.reducer.reduce_2d(&vectors)?;
        let updates: Vec<CoordinateUpdate> = ids
            .into_iter()
            .zip(spatial)
            .zip(cluster)
            .map(|((note_id, spatial), cluster)| CoordinateUpdate {
                note_id,
                spatial,
                cluster,
            })
            .collect();
        let written = self.store.write_coordinates(&updates)?;

        info!(
            "event=backfill_coordinates module=service status=ok written={written} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(written)
    }

    /// Generation followed by a full coordinate recompute.
    pub fn run(&self, scope: &NoteScope) -> ServiceResult<BackfillReport> {
        let generation = self.generate_missing(scope)?;
        let coordinates = self.recompute_coordinates(scope)?;
        Ok(BackfillReport {
            generation,
            coordinates,
        })
    }

    fn store_vector(
        &self,
        note_id: NoteId,
        vector: &[f32],
        report: &mut GenerationReport,
    ) -> ServiceResult<()> {
        match self.store.put(note_id, vector) {
            Ok(()) => {
                report.generated += 1;
                Ok(())
            }
            // Note removed mid-pass, or a model returning the wrong width.
            Err(err @ (RepoError::NotFound(_) | RepoError::DimensionMismatch { .. })) => {
                warn!(
                    "event=backfill_generate module=service status=store_failed note_id={note_id} error={err}"
                );
                report.failed.push(note_id);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
