//! Repository layer: note read model and the embedding store.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Keep SQL details out of the service layer.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`,
//!   `DimensionMismatch`) in addition to DB transport errors.
//! - Persisted blobs that fail to decode surface as `InvalidData`, never as
//!   silently skipped rows.

use crate::db::DbError;
use crate::embedding::CodecError;
use crate::model::note::{NoteId, ScopeValidationError};
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod embedding_store;
pub mod note_repo;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(NoteId),
    DimensionMismatch { expected: usize, actual: usize },
    InvalidScope(ScopeValidationError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "no record for note {id}"),
            Self::DimensionMismatch { expected, actual } => write!(
                f,
                "embedding dimension mismatch: expected {expected}, got {actual}"
            ),
            Self::InvalidScope(err) => write!(f, "invalid scope: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidScope(err) => Some(err),
            Self::NotFound(_) | Self::DimensionMismatch { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ScopeValidationError> for RepoError {
    fn from(value: ScopeValidationError) -> Self {
        Self::InvalidScope(value)
    }
}

impl From<CodecError> for RepoError {
    fn from(value: CodecError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// SQL predicate selecting notes (aliased `n`) of one owner, year and month.
///
/// Binds: `?1` owner id, `?2` year or NULL, `?3` month or NULL.
pub(crate) const SCOPE_PREDICATE_SQL: &str = "n.owner_id = ?1
   AND (?2 IS NULL OR CAST(strftime('%Y', n.created_at / 1000, 'unixepoch') AS INTEGER) = ?2)
   AND (?3 IS NULL OR CAST(strftime('%m', n.created_at / 1000, 'unixepoch') AS INTEGER) = ?3)";

pub(crate) fn scope_params(scope: &crate::model::note::NoteScope) -> [Value; 3] {
    [
        Value::Text(scope.owner_id.to_string()),
        scope.year.map_or(Value::Null, |year| Value::Integer(i64::from(year))),
        scope
            .month
            .map_or(Value::Null, |month| Value::Integer(i64::from(month))),
    ]
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}
