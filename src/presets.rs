//! Difficulty presets, default form values and bounds accepted by the gateway.

use std::time::Duration;

/// Fewest cards a game may have.
pub const CARD_COUNT_MIN: u32 = 4;
/// Most cards a game may have.
pub const CARD_COUNT_MAX: u32 = 100;

/// Shortest accepted time limit.
pub const COUNTDOWN_SECONDS_MIN: u32 = 4;
/// Longest accepted time limit.
pub const COUNTDOWN_SECONDS_MAX: u32 = 120;

/// Smallest bad-guess limit; no limit at all is expressed as `None`.
pub const MAX_BAD_GUESSES_MIN: u32 = 1;

/// Card count prefilled on the settings form.
pub const DEFAULT_CARD_COUNT: u32 = 8;
/// Time limit prefilled on the settings form.
pub const DEFAULT_COUNTDOWN_SECONDS: u32 = 90;
/// Flip-back delay prefilled on the settings form.
pub const DEFAULT_FLIP_BACK_DELAY_MS: u64 = 500;

/// Time the flip-back animation needs before symbols may disappear from hidden cards.
pub const FLIP_ANIMATION: Duration = Duration::from_millis(400);

/// Named set of game settings offered on the start screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    /// Stable identifier, persisted as the last selected preset.
    pub id: &'static str,
    /// Name shown to the player.
    pub label: &'static str,
    /// Number of cards.
    pub card_count: u32,
    /// Time limit in seconds.
    pub countdown_seconds: u32,
    /// Flip-back delay in milliseconds.
    pub flip_back_delay_ms: u64,
    /// `None` means unlimited bad guesses.
    pub max_bad_guesses: Option<u32>,
}

/// Built-in presets, easiest first.
pub static PRESETS: [Preset; 3] = [
    Preset {
        id: "easy",
        label: "Easy",
        card_count: 8,
        countdown_seconds: 90,
        flip_back_delay_ms: 800,
        max_bad_guesses: None,
    },
    Preset {
        id: "medium",
        label: "Medium",
        card_count: 16,
        countdown_seconds: 60,
        flip_back_delay_ms: 500,
        max_bad_guesses: Some(12),
    },
    Preset {
        id: "hard",
        label: "Hard",
        card_count: 24,
        countdown_seconds: 45,
        flip_back_delay_ms: 300,
        max_bad_guesses: Some(6),
    },
];

/// Look up a preset by id.
pub fn find_preset(id: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|preset| preset.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_respect_bounds() {
        for preset in PRESETS {
            assert!(preset.card_count % 2 == 0, "{} has odd card count", preset.id);
            assert!((CARD_COUNT_MIN..=CARD_COUNT_MAX).contains(&preset.card_count));
            assert!(
                (COUNTDOWN_SECONDS_MIN..=COUNTDOWN_SECONDS_MAX).contains(&preset.countdown_seconds)
            );
            assert!(preset.max_bad_guesses.is_none_or(|n| n >= MAX_BAD_GUESSES_MIN));
        }
    }

    #[test]
    fn find_preset_by_id() {
        assert_eq!(find_preset("medium").map(|p| p.card_count), Some(16));
        assert!(find_preset("nightmare").is_none());
    }
}
