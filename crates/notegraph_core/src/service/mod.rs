//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, model and projection calls into use-case APIs.
//! - Keep the CLI decoupled from storage details.

use crate::embedding::EmbeddingError;
use crate::graph::GraphError;
use crate::model::note::{NoteId, ScopeValidationError};
use crate::projection::ProjectionError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod backfill;
pub mod graph_service;
pub mod lifecycle;

/// Service error for embedding and graph use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Scope filter out of range.
    InvalidScope(ScopeValidationError),
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Persistence-layer failure.
    Repo(RepoError),
    Embedding(EmbeddingError),
    Projection(ProjectionError),
    Graph(GraphError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidScope(err) => write!(f, "invalid scope: {err}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Embedding(err) => write!(f, "{err}"),
            Self::Projection(err) => write!(f, "{err}"),
            Self::Graph(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidScope(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Embedding(err) => Some(err),
            Self::Projection(err) => Some(err),
            Self::Graph(err) => Some(err),
            Self::NoteNotFound(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            RepoError::InvalidScope(err) => Self::InvalidScope(err),
            other => Self::Repo(other),
        }
    }
}

impl From<EmbeddingError> for ServiceError {
    fn from(value: EmbeddingError) -> Self {
        Self::Embedding(value)
    }
}

impl From<ProjectionError> for ServiceError {
    fn from(value: ProjectionError) -> Self {
        Self::Projection(value)
    }
}

impl From<GraphError> for ServiceError {
    fn from(value: GraphError) -> Self {
        Self::Graph(value)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
