//! Rounds, phases and submissions.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::card::CardId;

/// One stage of the per-round state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Lobby; no round has started.
    Waiting,
    /// Participants pick a card from their hand.
    Selection,
    /// Participants write a moral for the assembled narrative.
    Storytelling,
    /// Participants vote for the best moral.
    Voting,
    /// Votes are tallied and shown.
    Results,
    /// The session was abandoned.
    Completed,
}

impl Phase {
    /// Lowercase name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Selection => "selection",
            Self::Storytelling => "storytelling",
            Self::Voting => "voting",
            Self::Results => "results",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (round, phase) pair a deferred action was scheduled against.
///
/// A continuation only commits when the session is still in exactly this
/// round and phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTicket {
    /// Round number at scheduling time.
    pub round: u32,
    /// Phase at scheduling time.
    pub phase: Phase,
}

/// A participant's round-scoped record: chosen card, moral and votes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Whose submission this is.
    pub participant_id: Uuid,
    /// The card they picked.
    pub card_id: CardId,
    /// Their moral, once written.
    pub moral: Option<String>,
    /// Votes received.
    pub votes: u32,
    /// Whether this participant has cast their own vote.
    pub has_voted: bool,
}

impl Submission {
    /// A fresh submission with no moral and no votes.
    #[must_use]
    pub fn new(participant_id: Uuid, card_id: CardId) -> Self {
        Self {
            participant_id,
            card_id,
            moral: None,
            votes: 0,
            has_voted: false,
        }
    }
}

/// The current round of a session.
#[derive(Debug, Clone)]
pub struct Round {
    /// Round number, starting at 1 (0 while waiting).
    pub number: u32,
    /// Current phase.
    pub phase: Phase,
    /// When the current phase began.
    pub phase_started_at: DateTime<Utc>,
    /// The assembled story; empty until selection ends.
    pub narrative: String,
    /// One submission per participant, seeded when the narrative is built.
    pub submissions: Vec<Submission>,
    /// Simulated participants with an in-flight continuation this phase.
    pub(crate) pending: BTreeSet<Uuid>,
}

impl Round {
    /// The pre-game placeholder round.
    #[must_use]
    pub fn waiting(now: DateTime<Utc>) -> Self {
        Self::starting(0, Phase::Waiting, now)
    }

    /// A new round entering `phase`.
    #[must_use]
    pub fn starting(number: u32, phase: Phase, now: DateTime<Utc>) -> Self {
        Self {
            number,
            phase,
            phase_started_at: now,
            narrative: String::new(),
            submissions: Vec::new(),
            pending: BTreeSet::new(),
        }
    }

    /// The ticket for the round's current phase.
    #[must_use]
    pub const fn ticket(&self) -> PhaseTicket {
        PhaseTicket {
            round: self.number,
            phase: self.phase,
        }
    }

    /// Moves to `phase`, dropping any in-flight bookkeeping.
    pub(crate) fn enter(&mut self, phase: Phase, now: DateTime<Utc>) {
        self.phase = phase;
        self.phase_started_at = now;
        self.pending.clear();
    }

    /// Looks up a participant's submission.
    #[must_use]
    pub fn submission(&self, participant_id: Uuid) -> Option<&Submission> {
        self.submissions
            .iter()
            .find(|submission| submission.participant_id == participant_id)
    }

    pub(crate) fn submission_mut(&mut self, participant_id: Uuid) -> Option<&mut Submission> {
        self.submissions
            .iter_mut()
            .find(|submission| submission.participant_id == participant_id)
    }

    /// Whether the participant has voted this round.
    #[must_use]
    pub fn has_voted(&self, participant_id: Uuid) -> bool {
        self.submission(participant_id)
            .is_some_and(|submission| submission.has_voted)
    }

    /// Whether any other participant has a moral the voter could pick.
    #[must_use]
    pub fn has_eligible_votee(&self, voter_id: Uuid) -> bool {
        self.submissions
            .iter()
            .any(|s| s.participant_id != voter_id && s.moral.is_some())
    }

    /// Number of participants who have voted.
    #[must_use]
    pub fn voters(&self) -> usize {
        self.submissions.iter().filter(|s| s.has_voted).count()
    }

    /// Sum of votes received across all submissions.
    #[must_use]
    pub fn total_votes(&self) -> u32 {
        self.submissions.iter().map(|s| s.votes).sum()
    }
}
