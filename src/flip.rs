//! Decides what a flip did to the board, without touching any stored state.

use std::future::Future;

use crate::{
    error::error_message,
    gateway::GatewayResult,
    model::{Board, Card, FlipSnapshot},
};

/// Result of one flip as seen by the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlipOutcome {
    /// Nothing to animate: first card of a pair, a completed match, or an empty answer.
    Done,
    /// Two unmatched cards are face-up; `board` must be shown for the flip-back delay, then
    /// hidden.
    Mismatch {
        /// Post-flip board with both cards visible.
        board: Board,
    },
    /// The gateway rejected the flip.
    Error {
        /// Translated, player-facing message.
        message: String,
    },
}

/// Copy of `board` with every unmatched card face-down.
pub fn hide_cards(board: &[Card]) -> Board {
    board
        .iter()
        .map(|card| {
            if card.is_matched {
                card.clone()
            } else {
                Card {
                    is_face_up: false,
                    ..card.clone()
                }
            }
        })
        .collect()
}

/// Number of found pairs on `board`.
pub fn count_matched_pairs(board: &[Card]) -> usize {
    board.iter().filter(|card| card.is_matched).count() / 2
}

/// `true` when the pair count did not move and neither card ended up matched.
pub fn is_mismatched_pair(
    first_card_id: &str,
    second_card_id: &str,
    new_board: &[Card],
    previous_board: &[Card],
) -> bool {
    let is_matched = |id: &str| {
        new_board
            .iter()
            .find(|card| card.id == id)
            .is_some_and(|card| card.is_matched)
    };

    count_matched_pairs(new_board) == count_matched_pairs(previous_board)
        && !is_matched(first_card_id)
        && !is_matched(second_card_id)
}

/// Ask the gateway to flip `card_id` and classify the answer against the pre-flip `board`.
///
/// `flip_call` receives the card id and performs the actual request.
pub async fn resolve_flip<F, Fut>(board: &[Card], card_id: &str, flip_call: F) -> FlipOutcome
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = GatewayResult<Option<FlipSnapshot>>>,
{
    let snapshot = match flip_call(card_id.to_string()).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => return FlipOutcome::Done,
        Err(err) => {
            return FlipOutcome::Error {
                message: error_message(&err),
            };
        }
    };

    // A single revealed card cannot mismatch.
    let Some(face_up) = board
        .iter()
        .find(|card| card.is_face_up && !card.is_matched)
    else {
        return FlipOutcome::Done;
    };

    if is_mismatched_pair(&face_up.id, card_id, &snapshot.board, board) {
        FlipOutcome::Mismatch {
            board: snapshot.board,
        }
    } else {
        FlipOutcome::Done
    }
}
