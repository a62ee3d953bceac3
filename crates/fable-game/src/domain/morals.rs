//! Fallback and cleanup for generated morals.

use super::text::MAX_MORAL_CHARS;

/// Morals used when the text generator cannot answer in time.
pub const FALLBACK_MORALS: [&str; 8] = [
    "Slow and steady wins the race.",
    "Look before you leap.",
    "Every cloud has a silver lining.",
    "Honesty is the best policy.",
    "Don't count your chickens before they hatch.",
    "Actions speak louder than words.",
    "Fortune favours the bold.",
    "There is no place like home.",
];

/// The deterministic fallback moral for a narrative.
///
/// Chosen by narrative length (in characters), so every stand-in moral for
/// the same story is identical and reproducible.
#[must_use]
pub fn fallback_moral(narrative: &str) -> &'static str {
    FALLBACK_MORALS[narrative.chars().count() % FALLBACK_MORALS.len()]
}

/// Cleans a generated moral: trims whitespace and wrapping quotes and caps
/// the length. Returns `None` when nothing usable is left.
#[must_use]
pub fn normalize_generated(raw: &str) -> Option<String> {
    let cleaned = raw
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”'))
        .trim();
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.chars().take(MAX_MORAL_CHARS).collect())
}
