//! YAML-backed deck provider.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use fable_core::deck::{CUSTOM_CARD_ID_BASE, DeckCard, DeckProvider};
use fable_core::role::RoleType;
use thiserror::Error;
use tracing::info;

const DEFAULT_DECK: &str = include_str!("../decks/default.yaml");

/// Fewest cards a role may have; one full hand.
pub const MIN_CARDS_PER_ROLE: usize = 3;

/// Reasons a deck cannot be loaded.
#[derive(Debug, Error)]
pub enum DeckError {
    #[error("failed to read deck file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse deck: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("role {role} has {found} cards, at least {min} required", min = MIN_CARDS_PER_ROLE)]
    TooFewCards { role: RoleType, found: usize },

    #[error("card id {0} is used more than once")]
    DuplicateId(u32),

    #[error("card id {0} is in the range reserved for custom cards")]
    ReservedId(u32),

    #[error("card {0} has no text")]
    EmptyText(u32),
}

/// A deck parsed from YAML, read-only after loading.
#[derive(Debug, Clone)]
pub struct YamlDeck {
    cards: BTreeMap<RoleType, Vec<DeckCard>>,
}

impl YamlDeck {
    /// The deck compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns `DeckError` if the embedded deck is malformed.
    pub fn builtin() -> Result<Self, DeckError> {
        Self::from_yaml(DEFAULT_DECK)
    }

    /// Loads a deck file.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::Io` if the file cannot be read, or any parse or
    /// validation error.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let deck = Self::from_yaml(&raw)?;
        info!(path = %path.display(), cards = deck.len(), "deck loaded");
        Ok(deck)
    }

    /// Parses and validates a YAML deck document.
    ///
    /// # Errors
    ///
    /// Returns `DeckError` if the document does not parse or breaks a deck
    /// rule: every role needs at least [`MIN_CARDS_PER_ROLE`] cards, ids are
    /// unique and below [`CUSTOM_CARD_ID_BASE`], and no text is blank.
    pub fn from_yaml(raw: &str) -> Result<Self, DeckError> {
        let mut cards: BTreeMap<RoleType, Vec<DeckCard>> = serde_yaml::from_str(raw)?;

        let mut seen = HashSet::new();
        for role in RoleType::ALL {
            let role_cards = cards.entry(role).or_default();
            if role_cards.len() < MIN_CARDS_PER_ROLE {
                return Err(DeckError::TooFewCards {
                    role,
                    found: role_cards.len(),
                });
            }
            for card in role_cards.iter_mut() {
                if card.id >= CUSTOM_CARD_ID_BASE {
                    return Err(DeckError::ReservedId(card.id));
                }
                if !seen.insert(card.id) {
                    return Err(DeckError::DuplicateId(card.id));
                }
                card.text = card.text.trim().to_owned();
                if card.text.is_empty() {
                    return Err(DeckError::EmptyText(card.id));
                }
            }
        }

        Ok(Self { cards })
    }

    /// Total number of cards across all roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DeckProvider for YamlDeck {
    fn cards(&self, role: RoleType) -> &[DeckCard] {
        self.cards.get(&role).map_or(&[], Vec::as_slice)
    }
}
