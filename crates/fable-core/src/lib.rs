//! Fable Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that the game domain
//! and its adapters depend on: time, randomness, errors, commands, the closed
//! set of narrative role types, and the two external collaborators (the card
//! deck and the moral text generator). It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod deck;
pub mod error;
pub mod moral;
pub mod rng;
pub mod role;
