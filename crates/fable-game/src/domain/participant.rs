//! Participants of a session.

use fable_core::role::RoleType;
use serde::Serialize;
use uuid::Uuid;

use super::card::{Card, CardId};

/// Names handed out to simulated participants, in seat order.
const SIMULATED_NAMES: [&str; 8] = [
    "Aesop",
    "Perrault",
    "Grimm",
    "Andersen",
    "La Fontaine",
    "Kipling",
    "Potter",
    "Carroll",
];

/// Suffix marking a simulated participant's name.
const SIMULATED_SUFFIX: &str = " (bot)";

/// Whether a seat is played by a connected human or by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    /// A connected player.
    Human,
    /// A server-driven stand-in.
    Simulated,
}

/// A seat in a session.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Participant identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Human or simulated.
    pub kind: ParticipantKind,
    /// Whether this participant controls the session.
    pub is_host: bool,
    /// Accumulated votes across rounds.
    pub score: u32,
    /// Role for the current round.
    pub role: Option<RoleType>,
    /// Cards dealt for the current round.
    pub hand: Vec<Card>,
    /// The card picked this round.
    pub selected_card_id: Option<CardId>,
    /// The moral written this round.
    pub submitted_text: Option<String>,
}

impl Participant {
    /// Creates a human participant.
    #[must_use]
    pub fn human(id: Uuid, name: String) -> Self {
        Self::new(id, name, ParticipantKind::Human)
    }

    /// Creates the simulated participant filling the `seat`-th empty seat.
    #[must_use]
    pub fn simulated(id: Uuid, seat: usize) -> Self {
        let base = SIMULATED_NAMES[seat % SIMULATED_NAMES.len()];
        Self::new(
            id,
            format!("{base}{SIMULATED_SUFFIX}"),
            ParticipantKind::Simulated,
        )
    }

    fn new(id: Uuid, name: String, kind: ParticipantKind) -> Self {
        Self {
            id,
            name,
            kind,
            is_host: false,
            score: 0,
            role: None,
            hand: Vec::new(),
            selected_card_id: None,
            submitted_text: None,
        }
    }

    /// Whether a connected human plays this seat.
    #[must_use]
    pub fn is_human(&self) -> bool {
        self.kind == ParticipantKind::Human
    }

    /// Looks up a card in the hand.
    #[must_use]
    pub fn card(&self, card_id: CardId) -> Option<&Card> {
        self.hand.iter().find(|card| card.id == card_id)
    }

    pub(crate) fn card_mut(&mut self, card_id: CardId) -> Option<&mut Card> {
        self.hand.iter_mut().find(|card| card.id == card_id)
    }

    /// The card picked this round, if any.
    #[must_use]
    pub fn selected_card(&self) -> Option<&Card> {
        self.selected_card_id.and_then(|id| self.card(id))
    }

    /// Clears everything that is scoped to a single round.
    pub(crate) fn reset_for_round(&mut self) {
        self.role = None;
        self.hand.clear();
        self.selected_card_id = None;
        self.submitted_text = None;
    }

    /// Turns a departed human into a simulated stand-in, keeping score,
    /// role, hand, selection and moral.
    pub(crate) fn convert_to_stand_in(&mut self) {
        self.kind = ParticipantKind::Simulated;
        self.is_host = false;
        if !self.name.ends_with(SIMULATED_SUFFIX) {
            self.name.push_str(SIMULATED_SUFFIX);
        }
    }
}
