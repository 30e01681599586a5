//! Note lifecycle hooks.
//!
//! # Invariants
//! - Embedding failures never fail note creation.
//! - Deleting a note removes its embedding in the same transaction.
//! - Content edits do not regenerate the embedding.

use crate::embedding::EmbeddingGenerator;
use crate::model::note::{Note, NoteId, OwnerId};
use crate::repo::embedding_store::EmbeddingStore;
use crate::repo::note_repo::NoteRepository;
use crate::service::ServiceResult;
use log::{info, warn};
use serde::Serialize;

/// A created note and whether its embedding was stored inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedNote {
    pub note: Note,
    pub embedded: bool,
}

pub struct NoteLifecycle<'a, N: ?Sized, S: ?Sized> {
    notes: &'a N,
    store: &'a S,
    generator: &'a EmbeddingGenerator,
}

impl<'a, N, S> NoteLifecycle<'a, N, S>
where
    N: NoteRepository + ?Sized,
    S: EmbeddingStore + ?Sized,
{
    pub fn new(notes: &'a N, store: &'a S, generator: &'a EmbeddingGenerator) -> Self {
        Self {
            notes,
            store,
            generator,
        }
    }

    /// Persists a new note, then embeds it best-effort.
    pub fn create_note(
        &self,
        owner_id: OwnerId,
        content: impl Into<String>,
    ) -> ServiceResult<SavedNote> {
        let note = Note::new(owner_id, content);
        self.notes.insert_note(&note)?;
        let embedded = self.on_note_saved(&note);
        Ok(SavedNote { note, embedded })
    }

    /// Embeds and stores a freshly saved note.
    ///
    /// Returns `false` on any failure; the note stays without a vector until
    /// the next backfill.
    pub fn on_note_saved(&self, note: &Note) -> bool {
        let Some(vector) = self.generator.try_embed_one(&note.content) else {
            return false;
        };
        match self.store.put(note.id, &vector) {
            Ok(()) => {
                info!(
                    "event=note_embed module=service status=ok note_id={}",
                    note.id
                );
                true
            }
            Err(err) => {
                warn!(
                    "event=note_embed module=service status=error note_id={} error={err}",
                    note.id
                );
                false
            }
        }
    }

    /// Deletes a note together with its embedding.
    pub fn delete_note(&self, id: NoteId) -> ServiceResult<()> {
        self.notes.delete_note(id)?;
        Ok(())
    }
}
