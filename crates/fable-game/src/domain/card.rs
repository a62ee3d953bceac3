//! Cards dealt to participants.

use std::fmt;

use fable_core::deck::{CUSTOM_CARD_ID_BASE, DeckCard};
use fable_core::role::RoleType;
use serde::{Deserialize, Serialize};

/// Identifier of a dealt card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u32);

impl CardId {
    /// Whether the id falls in the range reserved for custom cards.
    #[must_use]
    pub const fn is_custom_range(self) -> bool {
        self.0 >= CUSTOM_CARD_ID_BASE
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A card in a participant's hand for the current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Card identifier, unique within the session's round.
    pub id: CardId,
    /// Narrative fragment; empty on a blank custom card until written.
    pub text: String,
    /// The role this card belongs to.
    pub role: RoleType,
    /// Whether this is an editable blank card.
    pub is_custom: bool,
    /// Writing prompt shown on custom cards.
    pub custom_prompt: Option<String>,
}

impl Card {
    /// Builds a hand card from a deck entry.
    #[must_use]
    pub fn from_deck(card: &DeckCard, role: RoleType) -> Self {
        Self {
            id: CardId(card.id),
            text: card.text.clone(),
            role,
            is_custom: false,
            custom_prompt: None,
        }
    }

    /// Builds a blank custom card for the given role.
    #[must_use]
    pub fn blank(id: CardId, role: RoleType) -> Self {
        Self {
            id,
            text: String::new(),
            role,
            is_custom: true,
            custom_prompt: Some(role.custom_prompt().to_owned()),
        }
    }
}
