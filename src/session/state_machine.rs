//! Phases of a session and the transitions between them.

use thiserror::Error;

/// High-level phases of a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created, nothing fetched yet.
    Idle,
    /// Initial fetch in flight.
    Loading,
    /// The game is loaded and can be played.
    Ready(TurnPhase),
}

/// Fine-grained phase while the session is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// A flip may be started.
    Idle,
    /// A flip is being resolved or its mismatch is on screen; new flips are dropped.
    WaitingForFlipBack(FlipStage),
}

/// Progress of the flip currently holding the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipStage {
    /// Request sent, waiting for the gateway.
    AwaitingGateway,
    /// Both mismatched cards are displayed for the flip-back delay.
    ShowingMismatch,
    /// Cards were turned down locally; waiting for the flip animation to finish.
    HidingCards,
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Initial fetch started.
    LoadStarted,
    /// Initial fetch produced a game.
    Loaded,
    /// Initial fetch did not produce a game.
    LoadFailed,
    /// The player flipped a card.
    FlipStarted,
    /// The gateway answered with a mismatch that is now displayed.
    MismatchShown,
    /// The mismatched cards were turned down locally.
    CardsHidden,
    /// The flip is over; the guard is released.
    FlipSettled,
    /// Restart requested; any flip in progress is abandoned.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// State machine guarding the flip workflow of one session.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// `true` while a flip holds the guard.
    pub fn is_waiting_for_flip_back(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Ready(TurnPhase::WaitingForFlipBack(_))
        )
    }

    /// `true` while the flip request itself is in flight.
    pub fn is_flipping(&self) -> bool {
        self.phase
            == SessionPhase::Ready(TurnPhase::WaitingForFlipBack(FlipStage::AwaitingGateway))
    }

    /// `true` while the visible board is deliberately detached from the cached game.
    pub fn holds_visible_board(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Ready(TurnPhase::WaitingForFlipBack(
                FlipStage::ShowingMismatch | FlipStage::HidingCards
            ))
        )
    }

    /// Apply an event, returning the new phase.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        use FlipStage::*;
        use SessionPhase::{Idle, Loading, Ready};
        use TurnPhase::WaitingForFlipBack as Waiting;

        let next = match (self.phase, event) {
            (Idle, SessionEvent::LoadStarted) => Loading,
            (Loading, SessionEvent::Loaded) => Ready(TurnPhase::Idle),
            (Loading, SessionEvent::LoadFailed) => Idle,
            (Ready(TurnPhase::Idle), SessionEvent::FlipStarted) => {
                Ready(Waiting(AwaitingGateway))
            }
            (Ready(Waiting(AwaitingGateway)), SessionEvent::MismatchShown) => {
                Ready(Waiting(ShowingMismatch))
            }
            (Ready(Waiting(ShowingMismatch)), SessionEvent::CardsHidden) => {
                Ready(Waiting(HidingCards))
            }
            (Ready(Waiting(AwaitingGateway | HidingCards)), SessionEvent::FlipSettled) => {
                Ready(TurnPhase::Idle)
            }
            (Ready(_), SessionEvent::Reset) => Ready(TurnPhase::Idle),
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
