//! Outbound delivery of session snapshots.

use uuid::Uuid;

use crate::domain::projection::SessionView;

/// Pushes participant-scoped snapshots to whoever is connected.
///
/// Delivery is best effort. Implementations must not block; a participant
/// without a live connection is silently skipped.
pub trait BroadcastGateway: Send + Sync {
    /// Delivers `view` to `participant_id`.
    fn send_to(&self, participant_id: Uuid, view: SessionView);
}

/// Gateway that drops every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGateway;

impl BroadcastGateway for NoopGateway {
    fn send_to(&self, _participant_id: Uuid, _view: SessionView) {}
}
