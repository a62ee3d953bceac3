//! Limits and cleanup for participant-supplied text.

use fable_core::error::DomainError;

/// Maximum length of a participant name.
pub const MAX_NAME_CHARS: usize = 24;

/// Maximum length of the text written on a custom card.
pub const MAX_CUSTOM_CARD_CHARS: usize = 120;

/// Maximum length of a moral.
pub const MAX_MORAL_CHARS: usize = 200;

/// Trims `raw` and checks it is non-empty and within `max_chars`.
///
/// # Errors
///
/// Returns `DomainError::Validation` naming `field` when the text is empty
/// or too long.
pub fn clean_text(field: &str, raw: &str, max_chars: usize) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(DomainError::Validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(trimmed.to_owned())
}
