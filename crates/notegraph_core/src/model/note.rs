//! Note read model and scope filters.
//!
//! Notes are owned by the surrounding application; this crate reads them
//! and derives embeddings from their content. It never edits note text.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub type NoteId = Uuid;
pub type OwnerId = Uuid;

/// One free-text note as supplied by the note repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub owner_id: OwnerId,
    pub content: String,
    /// Unix epoch milliseconds, UTC.
    pub created_at: i64,
}

impl Note {
    /// Creates a note with a generated id, timestamped now.
    pub fn new(owner_id: OwnerId, content: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), owner_id, content, now_epoch_ms())
    }

    /// Creates a note with caller-provided identity and timestamp.
    ///
    /// Used by import paths and tests where identity already exists.
    pub fn with_id(
        id: NoteId,
        owner_id: OwnerId,
        content: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            owner_id,
            content: content.into(),
            created_at,
        }
    }
}

/// Owner-level selection of notes, optionally narrowed to a calendar
/// year and/or month of the note timestamp (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteScope {
    pub owner_id: OwnerId,
    pub year: Option<i32>,
    /// 1-based month, `1..=12`.
    pub month: Option<u32>,
}

impl NoteScope {
    /// Every note of one owner.
    pub fn owner(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            year: None,
            month: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    /// Checks filter ranges before they reach SQL.
    pub fn validate(&self) -> Result<(), ScopeValidationError> {
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(ScopeValidationError::InvalidMonth(month));
            }
        }
        if let Some(year) = self.year {
            if !(1970..=9999).contains(&year) {
                return Err(ScopeValidationError::InvalidYear(year));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeValidationError {
    InvalidMonth(u32),
    InvalidYear(i32),
}

impl Display for ScopeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMonth(month) => write!(f, "month must be within 1..=12, got {month}"),
            Self::InvalidYear(year) => write!(f, "year must be within 1970..=9999, got {year}"),
        }
    }
}

impl Error for ScopeValidationError {}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}
