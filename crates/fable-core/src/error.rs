//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No session is registered under the given join code.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The participant is not part of the addressed session.
    #[error("participant not found: {0}")]
    ParticipantNotFound(Uuid),

    /// The action is not valid in the session's current state.
    #[error("validation error: {0}")]
    Validation(String),

    /// An external collaborator (text generation) failed or timed out.
    #[error("external service error: {0}")]
    ExternalService(String),

    /// An infrastructure error (lock poisoning, resource exhaustion).
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Shorthand for a [`DomainError::Validation`] with a static message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_variant_prefix() {
        let err = DomainError::SessionNotFound("ABCDEF".to_owned());
        assert_eq!(err.to_string(), "session not found: ABCDEF");

        let err = DomainError::validation("cannot vote for yourself");
        assert_eq!(err.to_string(), "validation error: cannot vote for yourself");
    }
}
