//! Fable — moral text generation.
//!
//! The game asks an external text-generation service for a short moral
//! whenever a simulated participant has to write one. The caller owns the
//! deadline and the fallback; this crate only talks HTTP.

mod http;

pub use http::{DisabledMoralGenerator, HttpMoralGenerator, MoralServiceConfig};
