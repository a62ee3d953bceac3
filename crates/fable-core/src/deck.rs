//! Card deck abstraction.
//!
//! The deck is static narrative content supplied from outside the game
//! domain. It is loaded once at startup and only ever read afterwards.

use serde::{Deserialize, Serialize};

use crate::role::RoleType;

/// Card ids at or above this value are reserved for blank custom cards, so
/// deck-provided ids must stay below it.
pub const CUSTOM_CARD_ID_BASE: u32 = 1_000_000;

/// A candidate card supplied by the deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckCard {
    /// Deck-unique card identifier (below [`CUSTOM_CARD_ID_BASE`]).
    pub id: u32,
    /// The narrative fragment printed on the card.
    pub text: String,
}

/// Read-only supplier of per-role candidate cards.
pub trait DeckProvider: Send + Sync {
    /// Returns every candidate card for the given role.
    fn cards(&self, role: RoleType) -> &[DeckCard];
}
