use thiserror::Error;
use validator::ValidationErrors;

use crate::state::{catalog::CatalogError, dealer::DealError, state_machine::InvalidTransition};

/// Errors that can occur while handling a room command.
///
/// All of them are recoverable and reported to the issuing connection only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Unknown room or participant.
    #[error("not found: {0}")]
    NotFound(String),
    /// Missing or malformed input.
    #[error("invalid input: {0}")]
    Validation(String),
    /// The caller may not issue this command.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The room is in a phase where the command makes no sense.
    #[error("phase conflict: {0}")]
    PhaseConflict(String),
}

impl ServiceError {
    /// Stable snake_case name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Validation(_) => "validation",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::PhaseConflict(_) => "phase_conflict",
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::Validation(format!("validation failed: {}", err))
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::PhaseConflict(err.to_string())
    }
}

impl From<DealError> for ServiceError {
    fn from(err: DealError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<CatalogError> for ServiceError {
    fn from(err: CatalogError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}
