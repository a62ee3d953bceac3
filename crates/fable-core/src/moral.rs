//! Moral text generation abstraction.

use async_trait::async_trait;

use crate::error::DomainError;

/// External collaborator that writes a short moral for a narrative.
///
/// Callers apply their own deadline; implementations should return
/// `DomainError::ExternalService` on any failure rather than retrying.
#[async_trait]
pub trait MoralGenerator: Send + Sync {
    /// Generates a moral for the given narrative text.
    async fn generate_moral(&self, narrative: &str) -> Result<String, DomainError>;
}
