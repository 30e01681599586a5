//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Read notes by id or by scope for embedding and graph use-cases.
//! - Delete a note together with its embedding in one transaction.
//!
//! # Invariants
//! - Scope listings are sorted by `created_at ASC, id ASC`.
//! - A note and its embedding disappear together or not at all.

use crate::model::note::{Note, NoteId, NoteScope};
use crate::repo::{parse_uuid, scope_params, RepoError, RepoResult, SCOPE_PREDICATE_SQL};
use log::info;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const NOTE_SELECT_SQL: &str = "SELECT
    n.id AS id,
    n.owner_id AS owner_id,
    n.content AS content,
    n.created_at AS created_at
FROM notes n";

/// Repository interface over the external note store.
pub trait NoteRepository {
    /// Inserts one note; used by import paths and fixtures.
    fn insert_note(&self, note: &Note) -> RepoResult<NoteId>;
    /// Gets one note by id.
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Lists notes in the scope, oldest first.
    fn list_notes(&self, scope: &NoteScope) -> RepoResult<Vec<Note>>;
    /// Deletes a note and its embedding atomically.
    fn delete_note(&self, id: NoteId) -> RepoResult<()>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn insert_note(&self, note: &Note) -> RepoResult<NoteId> {
        self.conn.execute(
            "INSERT INTO notes (id, owner_id, content, created_at) VALUES (?1, ?2, ?3, ?4);",
            params![
                note.id.to_string(),
                note.owner_id.to_string(),
                note.content.as_str(),
                note.created_at,
            ],
        )?;
        Ok(note.id)
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE n.id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn list_notes(&self, scope: &NoteScope) -> RepoResult<Vec<Note>> {
        scope.validate()?;
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             WHERE {SCOPE_PREDICATE_SQL}
             ORDER BY n.created_at ASC, n.id ASC;"
        ))?;
        let mut rows = stmt.query(params_from_iter(scope_params(scope)))?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        let id_text = id.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let embeddings_removed = tx.execute(
            "DELETE FROM note_embeddings WHERE note_id = ?1;",
            [id_text.as_str()],
        )?;
        let notes_removed = tx.execute("DELETE FROM notes WHERE id = ?1;", [id_text.as_str()])?;
        if notes_removed == 0 {
            // Dropping the transaction rolls back the embedding delete.
            return Err(RepoError::NotFound(id));
        }
        tx.commit()?;

        info!(
            "event=note_delete module=repo status=ok embeddings_removed={embeddings_removed}"
        );
        Ok(())
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id_text: String = row.get("id")?;
    let owner_text: String = row.get("owner_id")?;
    Ok(Note {
        id: parse_uuid(&id_text, "notes.id")?,
        owner_id: parse_uuid(&owner_text, "notes.owner_id")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
    })
}
