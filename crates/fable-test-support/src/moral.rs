//! Test moral generators — canned `MoralGenerator` implementations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fable_core::error::DomainError;
use fable_core::moral::MoralGenerator;

/// A generator that always answers with the same moral and counts calls.
#[derive(Debug)]
pub struct StubMoralGenerator {
    moral: String,
    calls: AtomicUsize,
}

impl StubMoralGenerator {
    /// Create a generator that answers every request with `moral`.
    #[must_use]
    pub fn new(moral: impl Into<String>) -> Self {
        Self {
            moral: moral.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of generation requests received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MoralGenerator for StubMoralGenerator {
    async fn generate_moral(&self, _narrative: &str) -> Result<String, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.moral.clone())
    }
}

/// A generator that always fails with an external service error.
#[derive(Debug)]
pub struct FailingMoralGenerator;

#[async_trait]
impl MoralGenerator for FailingMoralGenerator {
    async fn generate_moral(&self, _narrative: &str) -> Result<String, DomainError> {
        Err(DomainError::ExternalService("connection refused".into()))
    }
}

/// A generator that never answers within any reasonable deadline.
#[derive(Debug)]
pub struct StallingMoralGenerator;

#[async_trait]
impl MoralGenerator for StallingMoralGenerator {
    async fn generate_moral(&self, _narrative: &str) -> Result<String, DomainError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("too late".to_owned())
    }
}
