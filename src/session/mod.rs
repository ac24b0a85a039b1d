//! Stateful controller of one game session: flip guard, mismatch display and resynchronisation
//! of the visible board with the cached authoritative game.

pub mod state_machine;

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    api::GameApi,
    cache::{CacheEntry, GameCache},
    error::{SessionError, error_message},
    flip::{FlipOutcome, count_matched_pairs, hide_cards, resolve_flip},
    gateway::GameGateway,
    model::{Board, GameState, GameStatus, Settings},
    presets::FLIP_ANIMATION,
};

pub use self::state_machine::{FlipStage, SessionEvent, SessionPhase, TurnPhase};
use self::state_machine::SessionStateMachine;

/// Everything the presentation layer needs to render a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    /// Lifecycle and turn phase.
    pub phase: SessionPhase,
    /// Authoritative game state, once loaded.
    pub state: Option<GameState>,
    /// Settings the game was created with, once loaded.
    pub settings: Option<Settings>,
    /// Board to render; may lag the cached game while a mismatch is displayed.
    pub board: Board,
    /// Local error if any, else the last fetch error.
    pub error: Option<String>,
    /// Initial load or flip request in flight.
    pub is_loading: bool,
    /// A flip holds the guard; further flips are dropped.
    pub is_waiting_for_flip_back: bool,
    /// A fetch is in flight.
    pub is_fetching: bool,
    /// Matched pairs on the rendered board.
    pub matched_pairs: usize,
    /// Remaining bad guesses when the game has a limit.
    pub lives_left: Option<u32>,
    /// Current session epoch, used to key the countdown channel.
    pub epoch: u64,
}

struct SessionInner {
    machine: SessionStateMachine,
    local_error: Option<String>,
    visible_board: Board,
    synced_version: Option<u64>,
}

impl SessionInner {
    /// Copy the cached board when the cache moved on, unless a mismatch is on screen.
    fn sync_visible_board(&mut self, entry: &CacheEntry) {
        if self.machine.holds_visible_board() || self.synced_version == Some(entry.version) {
            return;
        }
        if let Some(game) = &entry.game {
            self.visible_board = game.board.clone();
        }
        self.synced_version = Some(entry.version);
    }

    fn error(&self, entry: &CacheEntry) -> Option<String> {
        self.local_error
            .clone()
            .or_else(|| entry.error.as_ref().map(error_message))
    }
}

/// Controller of one game session.
pub struct GameSession {
    api: GameApi,
    inner: Mutex<SessionInner>,
    epoch: AtomicU64,
}

impl GameSession {
    /// Create a session for `game_id`. Nothing is fetched until [`GameSession::load`].
    pub fn new(
        gateway: Arc<dyn GameGateway>,
        game_id: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let game_id = game_id.into();
        if game_id.trim().is_empty() {
            return Err(SessionError::MissingGameId);
        }

        Ok(Self {
            api: GameApi::new(gateway, game_id),
            inner: Mutex::new(SessionInner {
                machine: SessionStateMachine::new(),
                local_error: None,
                visible_board: Vec::new(),
                synced_version: None,
            }),
            epoch: AtomicU64::new(0),
        })
    }

    /// Create and load a session in one step.
    pub async fn open(
        gateway: Arc<dyn GameGateway>,
        game_id: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let session = Self::new(gateway, game_id)?;
        session.load().await?;
        Ok(session)
    }

    /// Identifier of the game.
    pub fn game_id(&self) -> &str {
        self.api.game_id()
    }

    /// Session epoch; incremented by every restart.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Cache of the authoritative game, for observers interested in raw updates.
    pub fn cache(&self) -> &Arc<GameCache> {
        self.api.cache()
    }

    /// Initial fetch. A game that cannot be loaded ends the session.
    pub async fn load(&self) -> Result<(), SessionError> {
        let already_loaded = {
            let mut inner = self.inner.lock().await;
            inner.machine.apply(SessionEvent::LoadStarted).is_err()
        };
        if already_loaded {
            debug!(game_id = %self.game_id(), "session already loaded; refetching");
            self.refetch().await;
            return Ok(());
        }

        let result = self.api.fetch().await;

        let mut inner = self.inner.lock().await;
        let entry = self.cache().entry();
        if entry.game.is_some() {
            if let Err(err) = inner.machine.apply(SessionEvent::Loaded) {
                warn!(error = %err, "unexpected session phase after load");
            }
            inner.sync_visible_board(&entry);
            info!(game_id = %self.game_id(), "session loaded");
            return Ok(());
        }

        if let Err(err) = inner.machine.apply(SessionEvent::LoadFailed) {
            warn!(error = %err, "unexpected session phase after failed load");
        }
        let message = result
            .err()
            .map(|err| error_message(&err))
            .unwrap_or_else(|| "Game not found".into());
        Err(SessionError::GameNotFound { message })
    }

    /// Fetch the authoritative game again and resynchronise the visible board.
    pub async fn refetch(&self) {
        // Failures are recorded in the cache and surface through `error`.
        let _ = self.api.fetch().await;
        let mut inner = self.inner.lock().await;
        inner.sync_visible_board(&self.cache().entry());
    }

    /// Flip a card. Ignored while a previous flip still holds the guard.
    pub async fn flip(&self, card_id: &str) {
        let (board, epoch) = {
            let mut inner = self.inner.lock().await;
            inner.sync_visible_board(&self.cache().entry());
            if let Err(err) = inner.machine.apply(SessionEvent::FlipStarted) {
                debug!(game_id = %self.game_id(), card_id, error = %err, "flip dropped");
                return;
            }
            inner.local_error = None;
            (inner.visible_board.clone(), self.epoch())
        };

        let outcome = resolve_flip(&board, card_id, |id| async move {
            self.api.flip_card(&id).await
        })
        .await;

        match outcome {
            FlipOutcome::Done => self.settle_flip(epoch, None).await,
            FlipOutcome::Error { message } => self.settle_flip(epoch, Some(message)).await,
            FlipOutcome::Mismatch { board } => self.show_mismatch(board, epoch).await,
        }
    }

    async fn settle_flip(&self, epoch: u64, error: Option<String>) {
        let mut inner = self.inner.lock().await;
        if !self.advance(&mut inner, epoch, SessionEvent::FlipSettled) {
            return;
        }
        inner.local_error = error;
        inner.sync_visible_board(&self.cache().entry());
    }

    /// Show both mismatched cards, hide them after the flip-back delay, wait for the flip
    /// animation, then release the guard and reconcile with the gateway.
    async fn show_mismatch(&self, board: Board, epoch: u64) {
        let delay = {
            let mut inner = self.inner.lock().await;
            if !self.advance(&mut inner, epoch, SessionEvent::MismatchShown) {
                return;
            }
            let entry = self.cache().entry();
            inner.visible_board = board.clone();
            inner.synced_version = Some(entry.version);
            entry
                .game
                .map(|game| Duration::from_millis(game.settings.flip_back_delay_ms))
                .unwrap_or_default()
        };
        debug!(game_id = %self.game_id(), ?delay, "showing mismatch");
        sleep(delay).await;

        {
            let mut inner = self.inner.lock().await;
            if !self.advance(&mut inner, epoch, SessionEvent::CardsHidden) {
                return;
            }
            inner.visible_board = hide_cards(&board);
        }
        sleep(FLIP_ANIMATION).await;

        {
            let mut inner = self.inner.lock().await;
            if !self.advance(&mut inner, epoch, SessionEvent::FlipSettled) {
                return;
            }
        }
        self.refetch().await;
    }

    /// Apply a step of the running flip unless a restart superseded it.
    fn advance(&self, inner: &mut SessionInner, epoch: u64, event: SessionEvent) -> bool {
        if self.epoch() != epoch {
            debug!(game_id = %self.game_id(), ?event, "flip superseded by restart");
            return false;
        }
        match inner.machine.apply(event) {
            Ok(_) => true,
            Err(err) => {
                debug!(game_id = %self.game_id(), error = %err, "flip step rejected");
                false
            }
        }
    }

    /// Restart the game with the same settings.
    pub async fn restart(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.local_error = None;
            if let Err(err) = inner.machine.apply(SessionEvent::Reset) {
                debug!(game_id = %self.game_id(), error = %err, "restart before load");
            }
            self.epoch.fetch_add(1, Ordering::SeqCst);
        }

        match self.api.restart().await {
            Ok(_) => {
                info!(game_id = %self.game_id(), epoch = self.epoch(), "game restarted");
                let mut inner = self.inner.lock().await;
                inner.sync_visible_board(&self.cache().entry());
            }
            Err(err) => {
                let message = error_message(&err);
                warn!(game_id = %self.game_id(), error = %message, "restart failed");
                self.inner.lock().await.local_error = Some(message);
            }
        }
    }

    /// Dismiss the local error. In-flight work is not affected.
    pub async fn reset_errors(&self) {
        self.inner.lock().await.local_error = None;
    }

    /// The countdown channel observed a terminal status: reload the final game state.
    pub async fn handle_game_end(&self, status: GameStatus) {
        info!(game_id = %self.game_id(), ?status, "game over");
        self.refetch().await;
    }

    /// Error to display, if any.
    pub async fn error(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        inner.error(&self.cache().entry())
    }

    /// Board to render.
    pub async fn board(&self) -> Board {
        let mut inner = self.inner.lock().await;
        inner.sync_visible_board(&self.cache().entry());
        inner.visible_board.clone()
    }

    /// Snapshot of everything the presentation layer renders.
    pub async fn view(&self) -> SessionView {
        let mut inner = self.inner.lock().await;
        let entry = self.cache().entry();
        inner.sync_visible_board(&entry);

        let phase = inner.machine.phase();
        let (state, settings) = match &entry.game {
            Some(game) => (Some(game.state.clone()), Some(game.settings.clone())),
            None => (None, None),
        };
        let lives_left = match (&state, &settings) {
            (Some(state), Some(settings)) => settings
                .max_bad_guesses
                .filter(|max| *max > 0)
                .map(|max| max.saturating_sub(state.bad_guesses)),
            _ => None,
        };

        SessionView {
            phase,
            state,
            settings,
            matched_pairs: count_matched_pairs(&inner.visible_board),
            board: inner.visible_board.clone(),
            error: inner.error(&entry),
            is_loading: phase == SessionPhase::Loading || inner.machine.is_flipping(),
            is_waiting_for_flip_back: inner.machine.is_waiting_for_flip_back(),
            is_fetching: entry.fetching,
            lives_left,
            epoch: self.epoch(),
        }
    }
}
