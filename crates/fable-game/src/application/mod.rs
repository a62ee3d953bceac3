//! Application layer: the session registry, command and query handlers, and
//! the continuations that drive simulated participants.

pub mod command_handlers;
pub mod config;
pub mod continuations;
pub mod gateway;
pub mod query_handlers;
pub mod registry;
