//! Participant-scoped, read-only views of a session.
//!
//! A view is what one participant is allowed to see. Other participants'
//! hands are replaced by placeholders, and their picks, morals and vote
//! counts only appear once the phase that hides them has ended.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::card::{Card, CardId};
use super::participant::{Participant, ParticipantKind};
use super::round::{Phase, Round, Submission};
use super::session::{GameSession, SessionSettings, SessionStatus};
use fable_core::role::RoleType;

/// A session as seen by one participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,
    pub status: SessionStatus,
    pub viewer_id: Uuid,
    pub host_id: Option<Uuid>,
    pub settings: SettingsView,
    pub created_at: DateTime<Utc>,
    pub round: RoundView,
    pub participants: Vec<ParticipantView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub max_participants: usize,
    pub rounds_to_play: u32,
    pub hand_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub number: u32,
    pub phase: Phase,
    pub phase_started_at: DateTime<Utc>,
    /// Empty until selection has ended.
    pub narrative: String,
    pub submissions: Vec<SubmissionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub participant_id: Uuid,
    pub card_id: CardId,
    pub moral: Option<String>,
    /// Only known once the round has resolved.
    pub votes: Option<u32>,
    pub has_voted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub id: Uuid,
    pub name: String,
    pub kind: ParticipantKind,
    pub is_host: bool,
    pub score: u32,
    pub role: Option<RoleType>,
    pub hand: Vec<CardSlot>,
    pub selected_card: Option<Card>,
    pub has_selected: bool,
    pub has_submitted: bool,
    pub has_voted: bool,
}

/// One position in a hand: the card itself, or a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardSlot {
    Hidden,
    Card(Card),
}

impl SessionView {
    /// Projects `session` for `viewer_id`.
    #[must_use]
    pub fn for_participant(session: &GameSession, viewer_id: Uuid) -> Self {
        let settings = session.settings();
        Self {
            session_id: session.id().to_owned(),
            status: session.status(),
            viewer_id,
            host_id: session.host_id(),
            settings: SettingsView::from(settings),
            created_at: session.created_at(),
            round: RoundView::project(session.round(), viewer_id),
            participants: session
                .participants()
                .iter()
                .map(|p| ParticipantView::project(p, session.round(), viewer_id))
                .collect(),
        }
    }

    /// The viewer's own entry.
    #[must_use]
    pub fn me(&self) -> Option<&ParticipantView> {
        self.participants.iter().find(|p| p.id == self.viewer_id)
    }
}

impl From<&SessionSettings> for SettingsView {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            max_participants: settings.max_participants,
            rounds_to_play: settings.rounds_to_play,
            hand_size: settings.hand_size,
        }
    }
}

/// Whether picks are public: selection is over for this round.
fn selection_ended(phase: Phase) -> bool {
    !matches!(phase, Phase::Waiting | Phase::Selection)
}

fn morals_public(phase: Phase) -> bool {
    matches!(phase, Phase::Voting | Phase::Results | Phase::Completed)
}

fn votes_public(phase: Phase) -> bool {
    matches!(phase, Phase::Results | Phase::Completed)
}

impl RoundView {
    fn project(round: &Round, viewer_id: Uuid) -> Self {
        let narrative = if selection_ended(round.phase) {
            round.narrative.clone()
        } else {
            String::new()
        };
        Self {
            number: round.number,
            phase: round.phase,
            phase_started_at: round.phase_started_at,
            narrative,
            submissions: round
                .submissions
                .iter()
                .map(|s| SubmissionView::project(s, round.phase, viewer_id))
                .collect(),
        }
    }
}

impl SubmissionView {
    fn project(submission: &Submission, phase: Phase, viewer_id: Uuid) -> Self {
        let own = submission.participant_id == viewer_id;
        Self {
            participant_id: submission.participant_id,
            card_id: submission.card_id,
            moral: if own || morals_public(phase) {
                submission.moral.clone()
            } else {
                None
            },
            votes: votes_public(phase).then_some(submission.votes),
            has_voted: submission.has_voted,
        }
    }
}

impl ParticipantView {
    fn project(participant: &Participant, round: &Round, viewer_id: Uuid) -> Self {
        let own = participant.id == viewer_id;
        let hand = participant
            .hand
            .iter()
            .map(|card| {
                if own {
                    CardSlot::Card(card.clone())
                } else {
                    CardSlot::Hidden
                }
            })
            .collect();
        let selected_card = if own || selection_ended(round.phase) {
            participant.selected_card().cloned()
        } else {
            None
        };

        Self {
            id: participant.id,
            name: participant.name.clone(),
            kind: participant.kind,
            is_host: participant.is_host,
            score: participant.score,
            role: participant.role,
            hand,
            selected_card,
            has_selected: participant.selected_card_id.is_some(),
            has_submitted: participant.submitted_text.is_some(),
            has_voted: round.has_voted(participant.id),
        }
    }
}
