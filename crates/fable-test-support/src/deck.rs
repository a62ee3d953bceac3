//! Test deck — a small in-memory `DeckProvider`.

use std::collections::HashMap;

use fable_core::deck::{DeckCard, DeckProvider};
use fable_core::role::RoleType;

/// A deck with a fixed number of generated cards per role.
///
/// Card ids are `role_index * 100 + n` and texts are `"<role> card <n>"`, so
/// tests can recognise which role a narrative fragment came from.
#[derive(Debug)]
pub struct InMemoryDeck {
    cards: HashMap<RoleType, Vec<DeckCard>>,
}

impl InMemoryDeck {
    /// Builds a deck with `per_role` cards for every role type.
    #[must_use]
    pub fn with_cards_per_role(per_role: u32) -> Self {
        let mut cards = HashMap::new();
        for (index, role) in (0u32..).zip(RoleType::ALL) {
            let role_cards = (0..per_role)
                .map(|n| DeckCard {
                    id: index * 100 + n,
                    text: format!("{role} card {n}"),
                })
                .collect();
            cards.insert(role, role_cards);
        }
        Self { cards }
    }
}

impl Default for InMemoryDeck {
    fn default() -> Self {
        Self::with_cards_per_role(6)
    }
}

impl DeckProvider for InMemoryDeck {
    fn cards(&self, role: RoleType) -> &[DeckCard] {
        self.cards.get(&role).map_or(&[], Vec::as_slice)
    }
}
