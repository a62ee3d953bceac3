//! Turning votes into scores.

use super::participant::Participant;
use super::round::Submission;

/// Adds each submission's votes to its participant's score.
pub fn tally(participants: &mut [Participant], submissions: &[Submission]) {
    for submission in submissions {
        if let Some(participant) = participants
            .iter_mut()
            .find(|p| p.id == submission.participant_id)
        {
            participant.score = participant.score.saturating_add(submission.votes);
        }
    }
}

/// Whether `round_number` is the last round of the session.
#[must_use]
pub const fn is_final_round(round_number: u32, rounds_to_play: u32) -> bool {
    round_number >= rounds_to_play
}
