//! Shared application state.

use std::sync::Arc;

use fable_game::application::registry::SessionRegistry;

use crate::hub::ConnectionHub;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live game sessions.
    pub registry: Arc<SessionRegistry>,
    /// Open WebSocket connections, keyed by participant.
    pub hub: Arc<ConnectionHub>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>, hub: Arc<ConnectionHub>) -> Self {
        Self { registry, hub }
    }
}
