//! Typed error hierarchy for the pipeline board.
//!
//! Two top-level enums cover the two layers:
//! - `StoreError` — deal store and stage catalog failures
//! - `BoardError` — board session failures surfaced to the user

use thiserror::Error;
use uuid::Uuid;

/// Errors from the deal store / stage catalog.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Deal {id} not found")]
    DealNotFound { id: Uuid },

    #[error("Stage {id} not found")]
    UnknownStage { id: Uuid },

    #[error("Company {id} not found")]
    UnknownCompany { id: Uuid },

    #[error("Contact {id} not found")]
    UnknownContact { id: Uuid },

    #[error("Invalid {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DealNotFound { .. })
    }

    /// Caller-side mistakes as opposed to storage failures.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::UnknownStage { .. }
                | Self::UnknownCompany { .. }
                | Self::UnknownContact { .. }
                | Self::InvalidField { .. }
        )
    }

    /// Recover a typed error raised inside a database closure, wrapping
    /// anything else as a database failure.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        match err.downcast::<StoreError>() {
            Ok(store_err) => store_err,
            Err(other) => Self::Database(other),
        }
    }
}

/// Errors from the board session.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Board has not been loaded")]
    NotLoaded,

    #[error("Failed to load board: {0}")]
    FetchFailed(#[source] StoreError),

    #[error("Failed to {operation} deal: {source}")]
    MutationFailed {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}
