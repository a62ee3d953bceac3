//! Fable API error types.

use fable_content::DeckError;
use fable_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The card deck could not be loaded.
    #[error("deck error: {0}")]
    Deck(#[from] DeckError),

    /// A collaborator could not be constructed.
    #[error("startup error: {0}")]
    Startup(#[from] DomainError),

    /// The tracing exporter could not be installed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Error payload carried in a failed acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// Transport-layer wrapper around `DomainError`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// Machine-readable code for the error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match &self.0 {
            DomainError::SessionNotFound(_) => "session_not_found",
            DomainError::ParticipantNotFound(_) => "participant_not_found",
            DomainError::Validation(_) => "validation_error",
            DomainError::ExternalService(_) => "external_service_error",
            DomainError::Infrastructure(_) => "infrastructure_error",
        }
    }

    #[must_use]
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.code(),
            message: self.0.to_string(),
        }
    }
}
