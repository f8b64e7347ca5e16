//! Error types for Clawarts Core

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("No winning idea found for round {0}")]
    WinnerNotFound(String),

    #[error("Participant not found: {0}")]
    MissingParticipant(String),

    #[error("Round already settled: {0}")]
    AlreadySettled(String),

    #[error("World not initialized")]
    WorldNotInitialized,

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Amount overflow: {0}")]
    Overflow(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl CoreError {
    pub fn overflow(what: impl Into<String>) -> Self {
        CoreError::Overflow(what.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
