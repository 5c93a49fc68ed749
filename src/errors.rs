//! Typed error hierarchy for the neo coordination engine.
//!
//! `StoreError` covers everything the ticket store, the reservation manager
//! and the pipeline document can report. The CLI layer wraps it in
//! `anyhow::Error` with extra context.

use std::path::PathBuf;
use thiserror::Error;

use crate::ticket::TicketStatus;

/// Errors from the on-disk store and the operations layered on it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{} not found. Run `neo init` first.", path.display())]
    StoreMissing { path: PathBuf },

    #[error("{id} not found.")]
    NotFound { id: String },

    #[error("No pipeline generated yet. Run `neo pipeline generate` first.")]
    PipelineNotGenerated,

    #[error("{ticket} depends on unknown ticket {dependency}")]
    UnknownDependency { ticket: String, dependency: String },

    #[error("Cannot set {id} to {requested}: {reason}")]
    InvalidTransition {
        id: String,
        requested: TicketStatus,
        reason: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to lock store at {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means a referenced record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::PipelineNotGenerated)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
