//! Domain model and rules of a game session.

pub mod card;
pub mod commands;
pub mod dealer;
pub mod morals;
pub mod narrative;
pub mod participant;
pub mod projection;
pub mod random;
pub mod roles;
pub mod round;
pub mod scoring;
pub mod session;
pub mod text;
pub mod voting;
