//! Embedding store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist exactly one vector per note, plus its projected coordinates.
//! - Discover notes that still lack a vector (backfill input).
//! - Replace the coordinates of a whole scope in one transaction.
//!
//! # Invariants
//! - `note_embeddings.note_id` is the primary key, so concurrent writers
//!   cannot create two rows for one note; `put` is a single upsert statement.
//! - Vectors of any length other than the store dimension are rejected.
//! - Replacing a vector with a different one clears its coordinates.
//! - Stored coordinate values are finite and within `[-1, 1]`.

use crate::embedding::codec::{
    decode_coords2, decode_coords3, decode_vector, encode_coords2, encode_coords3, encode_vector,
};
use crate::model::embedding::{Coordinates, CoordinateUpdate, EmbeddedNote, EmbeddingRecord};
use crate::model::note::{now_epoch_ms, Note, NoteId, NoteScope, OwnerId};
use crate::model::EMBEDDING_DIM;
use crate::repo::{parse_uuid, scope_params, RepoError, RepoResult, SCOPE_PREDICATE_SQL};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, Row, Transaction, TransactionBehavior,
};
use std::collections::BTreeSet;

// Stays well below SQLite's bound-parameter limit.
const MISSING_LOOKUP_CHUNK: usize = 500;

/// Persistence contract for note embeddings.
pub trait EmbeddingStore {
    /// Inserts or replaces the vector for `note_id`.
    fn put(&self, note_id: NoteId, vector: &[f32]) -> RepoResult<()>;
    /// Returns the stored vector or `NotFound`.
    fn get(&self, note_id: NoteId) -> RepoResult<Vec<f32>>;
    /// Returns the full stored record or `NotFound`.
    fn get_record(&self, note_id: NoteId) -> RepoResult<EmbeddingRecord>;
    /// Returns the subset of `note_ids` without a stored vector.
    fn get_missing(&self, note_ids: &[NoteId]) -> RepoResult<BTreeSet<NoteId>>;
    /// Lists notes of the scope that have a vector, oldest first.
    fn list_all(&self, scope: &NoteScope) -> RepoResult<Vec<EmbeddedNote>>;
    /// Overwrites coordinates for every listed record, all or nothing.
    fn write_coordinates(&self, updates: &[CoordinateUpdate]) -> RepoResult<usize>;
    /// Removes the vector of one note; returns whether a row existed.
    fn delete(&self, note_id: NoteId) -> RepoResult<bool>;
    /// Number of stored vectors for one owner.
    fn count(&self, owner_id: OwnerId) -> RepoResult<usize>;
}

/// SQLite-backed embedding store.
pub struct SqliteEmbeddingStore<'conn> {
    conn: &'conn Connection,
    dimensions: usize,
}

impl<'conn> SqliteEmbeddingStore<'conn> {
    /// Store for the standard embedding dimension.
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_dimensions(conn, EMBEDDING_DIM)
    }

    /// Store with a custom vector length; intended for small test corpora.
    pub fn with_dimensions(conn: &'conn Connection, dimensions: usize) -> Self {
        Self { conn, dimensions }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn check_dimensions(&self, vector: &[f32]) -> RepoResult<()> {
        if vector.len() != self.dimensions {
            return Err(RepoError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl EmbeddingStore for SqliteEmbeddingStore<'_> {
    fn put(&self, note_id: NoteId, vector: &[f32]) -> RepoResult<()> {
        self.check_dimensions(vector)?;
        let encoded = encode_vector(vector)?;

        self.conn
            .execute(
                "INSERT INTO note_embeddings (note_id, embedding, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(note_id) DO UPDATE SET
                    coords_3d = CASE WHEN note_embeddings.embedding = excluded.embedding
                        THEN note_embeddings.coords_3d ELSE NULL END,
                    coords_2d = CASE WHEN note_embeddings.embedding = excluded.embedding
                        THEN note_embeddings.coords_2d ELSE NULL END,
                    embedding = excluded.embedding;",
                params![note_id.to_string(), encoded, now_epoch_ms()],
            )
            .map_err(|err| match err.sqlite_error_code() {
                // The note row is missing (foreign key).
                Some(ErrorCode::ConstraintViolation) => RepoError::NotFound(note_id),
                _ => RepoError::from(err),
            })?;

        debug!("event=embedding_put module=repo status=ok dim={}", vector.len());
        Ok(())
    }

    fn get(&self, note_id: NoteId) -> RepoResult<Vec<f32>> {
        self.get_record(note_id).map(|record| record.vector)
    }

    fn get_record(&self, note_id: NoteId) -> RepoResult<EmbeddingRecord> {
        let mut stmt = self.conn.prepare(
            "SELECT note_id, embedding, coords_3d, coords_2d, created_at
             FROM note_embeddings
             WHERE note_id = ?1;",
        )?;
        let mut rows = stmt.query([note_id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(EmbeddingRecord {
                note_id: parse_uuid(&row.get::<_, String>("note_id")?, "note_embeddings.note_id")?,
                vector: decode_vector(&row.get::<_, String>("embedding")?, self.dimensions)?,
                coordinates: parse_coordinates(row)?,
                created_at: row.get("created_at")?,
            }),
            None => Err(RepoError::NotFound(note_id)),
        }
    }

    fn get_missing(&self, note_ids: &[NoteId]) -> RepoResult<BTreeSet<NoteId>> {
        let mut missing: BTreeSet<NoteId> = note_ids.iter().copied().collect();
        let requested: Vec<NoteId> = missing.iter().copied().collect();

        for chunk in requested.chunks(MISSING_LOOKUP_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let mut stmt = self.conn.prepare(&format!(
                "SELECT note_id FROM note_embeddings WHERE note_id IN ({placeholders});"
            ))?;
            let mut rows = stmt.query(params_from_iter(chunk.iter().map(|id| id.to_string())))?;
            while let Some(row) = rows.next()? {
                let present: String = row.get(0)?;
                missing.remove(&parse_uuid(&present, "note_embeddings.note_id")?);
            }
        }

        Ok(missing)
    }

    fn list_all(&self, scope: &NoteScope) -> RepoResult<Vec<EmbeddedNote>> {
        scope.validate()?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                n.id AS id,
                n.owner_id AS owner_id,
                n.content AS content,
                n.created_at AS created_at,
                e.embedding AS embedding,
                e.coords_3d AS coords_3d,
                e.coords_2d AS coords_2d
             FROM notes n
             INNER JOIN note_embeddings e ON e.note_id = n.id
             WHERE {SCOPE_PREDICATE_SQL}
             ORDER BY n.created_at ASC, n.id ASC;"
        ))?;
        let mut rows = stmt.query(params_from_iter(scope_params(scope)))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let note = Note {
                id: parse_uuid(&row.get::<_, String>("id")?, "notes.id")?,
                owner_id: parse_uuid(&row.get::<_, String>("owner_id")?, "notes.owner_id")?,
                content: row.get("content")?,
                created_at: row.get("created_at")?,
            };
            items.push(EmbeddedNote {
                vector: decode_vector(&row.get::<_, String>("embedding")?, self.dimensions)?,
                coordinates: parse_coordinates(row)?,
                note,
            });
        }
        Ok(items)
    }

    fn write_coordinates(&self, updates: &[CoordinateUpdate]) -> RepoResult<usize> {
        for update in updates {
            check_unit_range(update)?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare(
                "UPDATE note_embeddings
                 SET coords_3d = ?2, coords_2d = ?3
                 WHERE note_id = ?1;",
            )?;
            for update in updates {
                let changed = stmt.execute(params![
                    update.note_id.to_string(),
                    encode_coords3(&update.spatial)?,
                    encode_coords2(&update.cluster)?,
                ])?;
                if changed == 0 {
                    return Err(RepoError::NotFound(update.note_id));
                }
            }
        }
        tx.commit()?;

        Ok(updates.len())
    }

    fn delete(&self, note_id: NoteId) -> RepoResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM note_embeddings WHERE note_id = ?1;",
            [note_id.to_string()],
        )?;
        Ok(removed > 0)
    }

    fn count(&self, owner_id: OwnerId) -> RepoResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM note_embeddings e
             INNER JOIN notes n ON n.id = e.note_id
             WHERE n.owner_id = ?1;",
            [Value::Text(owner_id.to_string())],
            |row| row.get(0),
        )?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative embedding count {count}")))
    }
}

fn parse_coordinates(row: &Row<'_>) -> RepoResult<Coordinates> {
    let spatial = row
        .get::<_, Option<String>>("coords_3d")?
        .map(|text| decode_coords3(&text))
        .transpose()?;
    let cluster = row
        .get::<_, Option<String>>("coords_2d")?
        .map(|text| decode_coords2(&text))
        .transpose()?;
    Ok(Coordinates { spatial, cluster })
}

fn check_unit_range(update: &CoordinateUpdate) -> RepoResult<()> {
    let in_range = update
        .spatial
        .iter()
        .chain(update.cluster.iter())
        .all(|value| value.is_finite() && (-1.0..=1.0).contains(value));
    if in_range {
        Ok(())
    } else {
        Err(RepoError::InvalidData(format!(
            "coordinates for note {} fall outside [-1, 1]",
            update.note_id
        )))
    }
}
