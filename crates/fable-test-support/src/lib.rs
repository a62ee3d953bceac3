//! Shared test mocks and utilities for the Fable party game server.

mod clock;
mod deck;
mod moral;
mod rng;

pub use clock::FixedClock;
pub use deck::InMemoryDeck;
pub use moral::{FailingMoralGenerator, StallingMoralGenerator, StubMoralGenerator};
pub use rng::{MockRng, SequenceRng};
