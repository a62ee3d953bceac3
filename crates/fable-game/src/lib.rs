//! Fable — the party game engine.
//!
//! Responsible for sessions, role rotation, dealing, card selection,
//! narrative assembly, moral submissions, voting and scoring, plus the
//! registry that serializes access to each session and drives simulated
//! participants.

pub mod application;
pub mod domain;
