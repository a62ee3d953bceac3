//! Deferred work for simulated participants.
//!
//! Each continuation runs as its own task, waits (or calls the text
//! generator) without holding any lock, then re-enters the registry. The
//! session decides whether the ticket is still current.

use std::sync::Arc;
use std::time::Duration;

use fable_core::error::DomainError;
use fable_core::moral::MoralGenerator;
use tracing::{debug, warn};

use super::registry::SessionRegistry;
use crate::domain::morals::{fallback_moral, normalize_generated};
use crate::domain::session::FollowUp;

/// Runs one follow-up to completion.
pub(crate) async fn run(
    registry: Arc<SessionRegistry>,
    session_id: String,
    follow_up: FollowUp,
    delay: Duration,
) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    match follow_up {
        FollowUp::SimulatedSelection {
            participant_id,
            ticket,
        } => registry.commit(&session_id, |session, rng, clock| {
            session.commit_simulated_selection(ticket, participant_id, rng, clock)
        }),
        FollowUp::SimulatedMoral {
            participant_id,
            ticket,
            narrative,
        } => {
            let generator = registry.moral_generator();
            let timeout = registry.config().moral_timeout;
            let moral = request_moral(generator.as_ref(), &narrative, timeout).await;
            registry.commit(&session_id, |session, _, clock| {
                session.commit_simulated_moral(ticket, participant_id, moral, clock)
            });
        }
        FollowUp::SimulatedVote {
            participant_id,
            ticket,
        } => registry.commit(&session_id, |session, rng, clock| {
            session.commit_simulated_vote(ticket, participant_id, rng, clock)
        }),
    }
}

/// Asks the generator for a moral under a hard deadline.
///
/// Never fails: a timeout, an error or an unusable answer all fall back to
/// the canned moral picked from the narrative's length.
pub async fn request_moral(
    generator: &dyn MoralGenerator,
    narrative: &str,
    timeout: Duration,
) -> String {
    let failure = match tokio::time::timeout(timeout, generator.generate_moral(narrative)).await {
        Ok(Ok(raw)) => match normalize_generated(&raw) {
            Some(moral) => {
                debug!(chars = moral.chars().count(), "moral generated");
                return moral;
            }
            None => DomainError::ExternalService("empty moral".to_owned()),
        },
        Ok(Err(err)) => err,
        Err(_) => DomainError::ExternalService(format!("no answer within {timeout:?}")),
    };

    warn!(error = %failure, "moral generation failed, using fallback");
    fallback_moral(narrative).to_owned()
}
