//! Game creation payload and the settings form it is built from.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::{
        parse_max_bad_guesses, validate_card_count, validate_countdown_seconds,
        validate_max_bad_guesses, validate_user_name,
    },
    presets::{
        DEFAULT_CARD_COUNT, DEFAULT_COUNTDOWN_SECONDS, DEFAULT_FLIP_BACK_DELAY_MS, Preset,
    },
};

/// Payload sent to the gateway to create a new game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Trimmed player name.
    pub user_name: String,
    /// Even number of cards on the board.
    pub card_count: u32,
    /// Time limit of the game.
    pub countdown_seconds: u32,
    /// How long a mismatched pair stays face-up.
    pub flip_back_delay_ms: u64,
    /// Omitted when bad guesses are unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bad_guesses: Option<u32>,
}

impl Validate for CreateGameRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_user_name(&self.user_name) {
            errors.add("user_name", e);
        }
        if let Err(e) = validate_card_count(self.card_count) {
            errors.add("card_count", e);
        }
        if let Err(e) = validate_countdown_seconds(self.countdown_seconds) {
            errors.add("countdown_seconds", e);
        }
        if let Err(e) = validate_max_bad_guesses(self.max_bad_guesses) {
            errors.add("max_bad_guesses", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Values edited on the settings form before they become a [`CreateGameRequest`].
///
/// The bad-guess limit is kept as text so that an empty field can mean "unlimited".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    /// Player name as typed.
    pub user_name: String,
    /// Number of cards.
    pub card_count: u32,
    /// Time limit in seconds.
    pub countdown_seconds: u32,
    /// Flip-back delay in milliseconds.
    pub flip_back_delay_ms: u64,
    /// Bad-guess limit as typed; blank means unlimited.
    pub max_bad_guesses: String,
}

impl Default for SettingsForm {
    fn default() -> Self {
        Self {
            user_name: String::new(),
            card_count: DEFAULT_CARD_COUNT,
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            flip_back_delay_ms: DEFAULT_FLIP_BACK_DELAY_MS,
            max_bad_guesses: String::new(),
        }
    }
}

impl SettingsForm {
    /// Form prefilled from a preset for the given player.
    pub fn from_preset(preset: &Preset, user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            card_count: preset.card_count,
            countdown_seconds: preset.countdown_seconds,
            flip_back_delay_ms: preset.flip_back_delay_ms,
            max_bad_guesses: preset
                .max_bad_guesses
                .map(|n| n.to_string())
                .unwrap_or_default(),
        }
    }

    /// Validate the form and convert it into the request shape expected by the gateway.
    pub fn into_request(self) -> Result<CreateGameRequest, ValidationErrors> {
        let max_bad_guesses = match parse_max_bad_guesses(&self.max_bad_guesses) {
            Ok(limit) => limit,
            Err(e) => {
                let mut errors = ValidationErrors::new();
                errors.add("max_bad_guesses", e);
                return Err(errors);
            }
        };

        let request = CreateGameRequest {
            user_name: self.user_name.trim().to_string(),
            card_count: self.card_count,
            countdown_seconds: self.countdown_seconds,
            flip_back_delay_ms: self.flip_back_delay_ms,
            max_bad_guesses,
        };
        request.validate()?;
        Ok(request)
    }
}
