//! Client-side view of a game as served by the remote gateway.

use serde::{Deserialize, Serialize};

/// A single card on the board.
///
/// `emoji` is only present once the card has been revealed or matched; the server withholds it
/// for face-down cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Identifier, unique within one board and stable for the game's lifetime.
    pub id: String,
    /// Whether the card is currently shown.
    pub is_face_up: bool,
    /// Whether the card belongs to a found pair. Matched cards are always face-up.
    pub is_matched: bool,
    /// Revealed symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl Card {
    /// Face-down, unmatched card without a revealed symbol.
    pub fn hidden(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_face_up: false,
            is_matched: false,
            emoji: None,
        }
    }
}

/// Ordered collection of cards for one game.
pub type Board = Vec<Card>;

/// Settings a game was created with. Immutable until a new game is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Player name.
    pub user_name: String,
    /// Number of cards on the board.
    pub card_count: u32,
    /// Time limit of the game.
    pub countdown_seconds: u32,
    /// How long a mismatched pair stays face-up.
    pub flip_back_delay_ms: u64,
    /// `None` means unlimited bad guesses.
    #[serde(default)]
    pub max_bad_guesses: Option<u32>,
}

/// Lifecycle status of a game. `Won` and `Lost` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Flips are accepted.
    Playing,
    /// Every pair was matched in time.
    Won,
    /// Time or lives ran out.
    Lost,
}

impl GameStatus {
    /// Parse the wire representation, rejecting anything outside the three known statuses.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "playing" => Some(Self::Playing),
            "won" => Some(Self::Won),
            "lost" => Some(Self::Lost),
            _ => None,
        }
    }

    /// `true` once the game can no longer accept flips.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Playing)
    }
}

/// Progress counters of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Lifecycle status.
    pub status: GameStatus,
    /// Flips accepted so far.
    pub turns: u32,
    /// Mismatched pairs so far.
    pub bad_guesses: u32,
    /// Countdown at the time of the snapshot.
    pub remaining_seconds: i64,
    /// Unix timestamp (seconds, fractional) of the game start.
    pub started_at: f64,
}

/// Aggregate root as owned by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Server-assigned identifier.
    pub game_id: String,
    /// Cards in display order.
    pub board: Board,
    /// Settings the game was created with.
    pub settings: Settings,
    /// Progress counters.
    pub state: GameState,
}

/// Game returned by a flip: everything but the settings, which the client already holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlipSnapshot {
    /// Game the flip was applied to.
    pub game_id: String,
    /// Board after the flip.
    pub board: Board,
    /// Counters after the flip.
    pub state: GameState,
}

impl Game {
    /// Replace board and state with a flip snapshot, keeping the cached settings.
    pub fn merge_flip(&mut self, snapshot: FlipSnapshot) {
        self.board = snapshot.board;
        self.state = snapshot.state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_uses_camel_case_wire_names() {
        let json = r#"{
            "gameId": "g-1",
            "board": [
                {"id": "a", "isFaceUp": true, "isMatched": false, "emoji": "🍎"},
                {"id": "b", "isFaceUp": false, "isMatched": false, "emoji": null}
            ],
            "settings": {
                "userName": "ada",
                "cardCount": 2,
                "countdownSeconds": 60,
                "flipBackDelayMs": 500,
                "maxBadGuesses": null
            },
            "state": {
                "status": "playing",
                "turns": 0,
                "badGuesses": 0,
                "remainingSeconds": 60,
                "startedAt": 1700000000.5
            }
        }"#;

        let game: Game = serde_json::from_str(json).unwrap();
        assert_eq!(game.board[0].emoji.as_deref(), Some("🍎"));
        assert_eq!(game.board[1], Card::hidden("b"));
        assert_eq!(game.settings.max_bad_guesses, None);
        assert_eq!(game.state.status, GameStatus::Playing);
    }

    #[test]
    fn status_parse_accepts_only_known_values() {
        assert_eq!(GameStatus::parse("won"), Some(GameStatus::Won));
        assert_eq!(GameStatus::parse("Playing"), None);
        assert_eq!(GameStatus::parse("paused"), None);
        assert!(GameStatus::Lost.is_terminal());
        assert!(!GameStatus::Playing.is_terminal());
    }
}
