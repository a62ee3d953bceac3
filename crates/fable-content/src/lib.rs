//! Fable — card deck content.
//!
//! Decks are static YAML documents mapping each role type to its candidate
//! cards. They are parsed and validated once at startup.

pub mod deck;

pub use deck::{DeckError, YamlDeck};
