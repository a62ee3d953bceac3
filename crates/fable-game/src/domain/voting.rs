//! Weighting used by simulated voters.

/// Multiplier for morals written by humans.
pub const HUMAN_BONUS: f64 = 2.0;

/// Moral length (in characters) at which the length factor saturates.
pub const LENGTH_CAP: u32 = 100;

/// Multiplier for morals that have not received a vote yet.
pub const UNDERDOG_BONUS: f64 = 1.5;

/// Weight of a candidate moral for a simulated vote.
///
/// `human bonus × length factor × underdog factor`, where the length factor
/// grows linearly with the moral's length up to [`LENGTH_CAP`] and the
/// underdog factor favours morals with few votes.
#[must_use]
pub fn vote_weight(votee_is_human: bool, moral_chars: usize, current_votes: u32) -> f64 {
    let human = if votee_is_human { HUMAN_BONUS } else { 1.0 };
    let capped = u32::try_from(moral_chars).map_or(LENGTH_CAP, |len| len.min(LENGTH_CAP));
    let length = f64::from(capped) / f64::from(LENGTH_CAP);
    let underdog = if current_votes == 0 {
        UNDERDOG_BONUS
    } else {
        1.0 / (f64::from(current_votes) + 1.0)
    };
    human * length * underdog
}
