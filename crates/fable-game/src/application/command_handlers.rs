//! Command handlers for game sessions.
//!
//! Each handler resolves the session in the registry, runs the matching
//! domain operation under the session's lock and lets the registry publish
//! snapshots and schedule simulated participants.

use std::sync::Arc;

use fable_core::command::Command;
use fable_core::error::DomainError;
use tracing::{info, instrument};
use uuid::Uuid;

use super::registry::{SessionRegistry, normalize_join_code};
use crate::domain::commands::{
    CastVote, CreateSession, JoinSession, LeaveSession, NextRound, SelectCard, StartSession,
    SubmitMoral, UpdateCustomCardText,
};

/// Result of a successfully handled command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCommandResult {
    /// Join code of the affected session.
    pub session_id: String,
    /// The participant the command acted for.
    pub participant_id: Uuid,
}

impl SessionCommandResult {
    fn new(session_id: &str, participant_id: Uuid) -> Self {
        Self {
            session_id: normalize_join_code(session_id),
            participant_id,
        }
    }
}

/// Handles the `CreateSession` command: opens a session with the sender as
/// host.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an invalid name.
#[instrument(skip_all, fields(command = command.command_type(), correlation_id = %command.correlation_id))]
pub fn handle_create_session(
    command: &CreateSession,
    registry: &Arc<SessionRegistry>,
) -> Result<SessionCommandResult, DomainError> {
    let (session_id, participant_id) = registry.open(&command.name)?;
    info!(session = %session_id, participant = %participant_id, "session created");
    Ok(SessionCommandResult {
        session_id,
        participant_id,
    })
}

/// Handles the `JoinSession` command.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` for an unknown join code and
/// `DomainError::Validation` if the lobby is closed, full or the name is
/// taken.
#[instrument(skip_all, fields(command = command.command_type(), correlation_id = %command.correlation_id, session = %command.session_id))]
pub fn handle_join_session(
    command: &JoinSession,
    registry: &Arc<SessionRegistry>,
) -> Result<SessionCommandResult, DomainError> {
    let mut joined = None;
    let mut session_id = String::new();
    registry.apply(&command.session_id, |session, _| {
        joined = Some(session.join(&command.name)?);
        session_id = session.id().to_owned();
        Ok(Vec::new())
    })?;
    let participant_id =
        joined.ok_or_else(|| DomainError::Infrastructure("join produced no participant".into()))?;
    Ok(SessionCommandResult {
        session_id,
        participant_id,
    })
}

/// Handles the `StartSession` command (host only).
///
/// # Errors
///
/// Returns `DomainError` if the requester is not the host or the session has
/// already started.
#[instrument(skip_all, fields(command = command.command_type(), correlation_id = %command.correlation_id, session = %command.session_id, participant = %command.participant_id))]
pub fn handle_start_session(
    command: &StartSession,
    registry: &Arc<SessionRegistry>,
) -> Result<SessionCommandResult, DomainError> {
    registry.apply(&command.session_id, |session, rng| {
        session.start(command.participant_id, registry.deck(), rng, registry.clock())?;
        Ok(Vec::new())
    })?;
    Ok(SessionCommandResult::new(&command.session_id, command.participant_id))
}

/// Handles the `SelectCard` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` outside the selection phase or for a
/// card that cannot be selected.
#[instrument(skip_all, fields(command = command.command_type(), correlation_id = %command.correlation_id, session = %command.session_id, participant = %command.participant_id))]
pub fn handle_select_card(
    command: &SelectCard,
    registry: &Arc<SessionRegistry>,
) -> Result<SessionCommandResult, DomainError> {
    registry.apply(&command.session_id, |session, _| {
        session.select_card(
            command.participant_id,
            command.card_id,
            command.custom_text.as_deref(),
            registry.clock(),
        )
    })?;
    Ok(SessionCommandResult::new(&command.session_id, command.participant_id))
}

/// Handles the `UpdateCustomCardText` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the card is not an unselected custom
/// card in the participant's hand.
#[instrument(skip_all, fields(command = command.command_type(), correlation_id = %command.correlation_id, session = %command.session_id, participant = %command.participant_id))]
pub fn handle_update_custom_card_text(
    command: &UpdateCustomCardText,
    registry: &Arc<SessionRegistry>,
) -> Result<SessionCommandResult, DomainError> {
    registry.apply(&command.session_id, |session, _| {
        session.update_custom_card_text(command.participant_id, command.card_id, &command.text)?;
        Ok(Vec::new())
    })?;
    Ok(SessionCommandResult::new(&command.session_id, command.participant_id))
}

/// Handles the `SubmitMoral` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` outside the storytelling phase or for
/// an invalid moral.
#[instrument(skip_all, fields(command = command.command_type(), correlation_id = %command.correlation_id, session = %command.session_id, participant = %command.participant_id))]
pub fn handle_submit_moral(
    command: &SubmitMoral,
    registry: &Arc<SessionRegistry>,
) -> Result<SessionCommandResult, DomainError> {
    registry.apply(&command.session_id, |session, _| {
        session.submit_moral(command.participant_id, &command.text, registry.clock())
    })?;
    Ok(SessionCommandResult::new(&command.session_id, command.participant_id))
}

/// Handles the `CastVote` command.
///
/// # Errors
///
/// Returns `DomainError` for votes outside the voting phase, self-votes,
/// duplicate votes or unknown votees.
#[instrument(skip_all, fields(command = command.command_type(), correlation_id = %command.correlation_id, session = %command.session_id, participant = %command.participant_id))]
pub fn handle_cast_vote(
    command: &CastVote,
    registry: &Arc<SessionRegistry>,
) -> Result<SessionCommandResult, DomainError> {
    registry.apply(&command.session_id, |session, _| {
        session.cast_vote(command.participant_id, command.votee_id, registry.clock())
    })?;
    Ok(SessionCommandResult::new(&command.session_id, command.participant_id))
}

/// Handles the `NextRound` command (host only, from results).
///
/// # Errors
///
/// Returns `DomainError::Validation` if the requester is not the host, the
/// round has not resolved or the session is completed.
#[instrument(skip_all, fields(command = command.command_type(), correlation_id = %command.correlation_id, session = %command.session_id, participant = %command.participant_id))]
pub fn handle_next_round(
    command: &NextRound,
    registry: &Arc<SessionRegistry>,
) -> Result<SessionCommandResult, DomainError> {
    registry.apply(&command.session_id, |session, rng| {
        session.next_round(command.participant_id, registry.deck(), rng, registry.clock())?;
        Ok(Vec::new())
    })?;
    Ok(SessionCommandResult::new(&command.session_id, command.participant_id))
}

/// Handles the `LeaveSession` command, also used when a connection drops.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` or
/// `DomainError::ParticipantNotFound` if there is nothing to leave.
#[instrument(skip_all, fields(command = command.command_type(), correlation_id = %command.correlation_id, session = %command.session_id, participant = %command.participant_id))]
pub fn handle_leave_session(
    command: &LeaveSession,
    registry: &Arc<SessionRegistry>,
) -> Result<SessionCommandResult, DomainError> {
    registry.apply(&command.session_id, |session, _| {
        session.leave(command.participant_id, registry.clock())
    })?;
    Ok(SessionCommandResult::new(&command.session_id, command.participant_id))
}
