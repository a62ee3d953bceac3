//! Query handlers for game sessions.

use fable_core::error::DomainError;
use uuid::Uuid;

use super::registry::SessionRegistry;
use crate::domain::projection::SessionView;

/// Returns the session as `viewer_id` is allowed to see it.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` for an unknown session and
/// `DomainError::ParticipantNotFound` if the viewer is not part of it.
pub fn get_session_view(
    registry: &SessionRegistry,
    session_id: &str,
    viewer_id: Uuid,
) -> Result<SessionView, DomainError> {
    registry.inspect(session_id, |session| {
        session
            .participant(viewer_id)
            .map(|_| SessionView::for_participant(session, viewer_id))
            .ok_or(DomainError::ParticipantNotFound(viewer_id))
    })?
}
