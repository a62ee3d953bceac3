//! Inbound commands for a game session.
//!
//! Each command carries the participant it acts for; the transport layer
//! fills that in from the connection's identity.

use fable_core::command::Command;
use uuid::Uuid;

use super::card::CardId;

macro_rules! impl_command {
    ($ty:ty, $name:literal) => {
        impl Command for $ty {
            fn command_type(&self) -> &'static str {
                $name
            }

            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }
        }
    };
}

/// Command to open a new session with the sender as host.
#[derive(Debug, Clone)]
pub struct CreateSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The host's display name.
    pub name: String,
}

/// Command to join a session that is still in the lobby.
#[derive(Debug, Clone)]
pub struct JoinSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Join code of the session.
    pub session_id: String,
    /// The joining participant's display name.
    pub name: String,
}

/// Command to start the game (host only).
#[derive(Debug, Clone)]
pub struct StartSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Join code of the session.
    pub session_id: String,
    /// The requesting participant.
    pub participant_id: Uuid,
}

/// Command to pick a card from the hand.
#[derive(Debug, Clone)]
pub struct SelectCard {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Join code of the session.
    pub session_id: String,
    /// The selecting participant.
    pub participant_id: Uuid,
    /// The card to select.
    pub card_id: CardId,
    /// Text to write on a custom card as it is selected.
    pub custom_text: Option<String>,
}

/// Command to edit the text of an unselected custom card.
#[derive(Debug, Clone)]
pub struct UpdateCustomCardText {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Join code of the session.
    pub session_id: String,
    /// The card owner.
    pub participant_id: Uuid,
    /// The custom card to edit.
    pub card_id: CardId,
    /// New card text.
    pub text: String,
}

/// Command to submit a moral for the round's narrative.
#[derive(Debug, Clone)]
pub struct SubmitMoral {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Join code of the session.
    pub session_id: String,
    /// The submitting participant.
    pub participant_id: Uuid,
    /// The moral.
    pub text: String,
}

/// Command to vote for another participant's moral.
#[derive(Debug, Clone)]
pub struct CastVote {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Join code of the session.
    pub session_id: String,
    /// The voter.
    pub participant_id: Uuid,
    /// The participant whose moral is voted for.
    pub votee_id: Uuid,
}

/// Command to move from results to the next round (host only).
#[derive(Debug, Clone)]
pub struct NextRound {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Join code of the session.
    pub session_id: String,
    /// The requesting participant.
    pub participant_id: Uuid,
}

/// Command to leave a session (also issued on disconnect).
#[derive(Debug, Clone)]
pub struct LeaveSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Join code of the session.
    pub session_id: String,
    /// The departing participant.
    pub participant_id: Uuid,
}

impl_command!(CreateSession, "session.create");
impl_command!(JoinSession, "session.join");
impl_command!(StartSession, "session.start");
impl_command!(SelectCard, "round.select_card");
impl_command!(UpdateCustomCardText, "round.update_custom_card_text");
impl_command!(SubmitMoral, "round.submit_moral");
impl_command!(CastVote, "round.cast_vote");
impl_command!(NextRound, "session.next_round");
impl_command!(LeaveSession, "session.leave");
