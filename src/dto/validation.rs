//! Validation helpers for game settings.

use validator::ValidationError;

use crate::presets::{
    CARD_COUNT_MAX, CARD_COUNT_MIN, COUNTDOWN_SECONDS_MAX, COUNTDOWN_SECONDS_MIN,
    MAX_BAD_GUESSES_MIN,
};

fn error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Validates that the player name is not blank.
pub fn validate_user_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(error("user_name_required", "User name is required".into()));
    }
    Ok(())
}

/// Validates that the card count is even and within the accepted bounds.
///
/// # Examples
///
/// ```ignore
/// validate_card_count(8)   // Ok
/// validate_card_count(7)   // Err - odd
/// validate_card_count(102) // Err - too large
/// ```
pub fn validate_card_count(count: u32) -> Result<(), ValidationError> {
    if count < CARD_COUNT_MIN {
        return Err(error(
            "card_count_min",
            format!("Must be at least {CARD_COUNT_MIN}"),
        ));
    }
    if count > CARD_COUNT_MAX {
        return Err(error(
            "card_count_max",
            format!("Must be at most {CARD_COUNT_MAX}"),
        ));
    }
    if count % 2 != 0 {
        return Err(error("card_count_even", "Must be even".into()));
    }
    Ok(())
}

/// Validates the countdown duration in seconds.
pub fn validate_countdown_seconds(seconds: u32) -> Result<(), ValidationError> {
    if !(COUNTDOWN_SECONDS_MIN..=COUNTDOWN_SECONDS_MAX).contains(&seconds) {
        return Err(error(
            "countdown_seconds_range",
            format!("Must be between {COUNTDOWN_SECONDS_MIN} and {COUNTDOWN_SECONDS_MAX}"),
        ));
    }
    Ok(())
}

/// Validates an optional bad-guess limit.
pub fn validate_max_bad_guesses(limit: Option<u32>) -> Result<(), ValidationError> {
    match limit {
        Some(n) if n < MAX_BAD_GUESSES_MIN => Err(error(
            "max_bad_guesses_min",
            format!("Must be at least {MAX_BAD_GUESSES_MIN} or empty"),
        )),
        _ => Ok(()),
    }
}

/// Parses the free-text bad-guess limit: empty means unlimited, otherwise a whole number >= 1.
pub fn parse_max_bad_guesses(text: &str) -> Result<Option<u32>, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let limit = text.parse::<u32>().map_err(|_| {
        error(
            "max_bad_guesses_format",
            format!("Must be at least {MAX_BAD_GUESSES_MIN} or empty"),
        )
    })?;
    validate_max_bad_guesses(Some(limit))?;
    Ok(Some(limit))
}
