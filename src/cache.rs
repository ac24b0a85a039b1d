//! Cached copy of the authoritative game, versioned so that observers can detect every
//! authoritative write.

use tokio::sync::watch;

use crate::{
    error::GatewayError,
    model::{Card, FlipSnapshot, Game},
};

/// Current content of the cache.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    /// Last known game, if any fetch succeeded.
    pub game: Option<Game>,
    /// Incremented on every write that touches the cached game, even when the new snapshot is
    /// identical to the previous one.
    pub version: u64,
    /// Incremented each time a restart replaces the game. Answers to requests sent before the
    /// replacement are not applied.
    pub generation: u64,
    /// Error of the last failed fetch, cleared by the next successful one.
    pub error: Option<GatewayError>,
    /// A fetch is in flight.
    pub fetching: bool,
}

/// Undo journal of one optimistic flip: the pre-image of the patched card.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an optimistic patch must be either confirmed or rolled back"]
pub struct FlipPatch {
    generation: u64,
    pre_image: Option<(usize, Card)>,
}

impl FlipPatch {
    /// `true` when the patch changed nothing (unknown card or no cached game).
    pub fn is_empty(&self) -> bool {
        self.pre_image.is_none()
    }
}

/// Single cached game of one session.
pub struct GameCache {
    tx: watch::Sender<CacheEntry>,
}

impl Default for GameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GameCache {
    /// Empty cache at version 0.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CacheEntry::default());
        Self { tx }
    }

    /// Register an observer notified on every cache change.
    pub fn subscribe(&self) -> watch::Receiver<CacheEntry> {
        self.tx.subscribe()
    }

    /// Copy of the current entry.
    pub fn entry(&self) -> CacheEntry {
        self.tx.borrow().clone()
    }

    /// Copy of the cached game.
    pub fn game(&self) -> Option<Game> {
        self.tx.borrow().game.clone()
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.tx.borrow().version
    }

    /// Error of the last failed fetch.
    pub fn last_error(&self) -> Option<GatewayError> {
        self.tx.borrow().error.clone()
    }

    /// `true` while a fetch is in flight.
    pub fn is_fetching(&self) -> bool {
        self.tx.borrow().fetching
    }

    pub(crate) fn set_fetching(&self, fetching: bool) {
        self.tx.send_if_modified(|entry| {
            let changed = entry.fetching != fetching;
            entry.fetching = fetching;
            changed
        });
    }

    /// Authoritative overwrite after a successful fetch.
    pub fn store_game(&self, game: Game) {
        self.tx.send_modify(|entry| {
            entry.game = Some(game);
            entry.error = None;
            entry.version += 1;
        });
    }

    /// Authoritative overwrite after a successful restart. Flip answers still pending for the
    /// replaced game are dropped.
    pub fn replace_game(&self, game: Game) {
        self.tx.send_modify(|entry| {
            entry.game = Some(game);
            entry.error = None;
            entry.version += 1;
            entry.generation += 1;
        });
    }

    /// Current restart generation.
    pub fn generation(&self) -> u64 {
        self.tx.borrow().generation
    }

    /// Record a failed fetch, keeping the last known game.
    pub fn store_error(&self, error: GatewayError) {
        self.tx.send_modify(|entry| entry.error = Some(error));
    }

    /// Merge the snapshot answering the flip journaled by `patch`, keeping the cached settings.
    ///
    /// Returns `false` when the snapshot was dropped because a restart replaced the game since.
    pub fn merge_flip(&self, patch: &FlipPatch, snapshot: FlipSnapshot) -> bool {
        self.tx.send_if_modified(|entry| {
            if entry.generation != patch.generation {
                return false;
            }
            match entry.game.as_mut() {
                Some(game) => {
                    game.merge_flip(snapshot);
                    entry.version += 1;
                    true
                }
                None => false,
            }
        })
    }

    /// Optimistically show `card_id` face-up, returning the journal needed to undo it.
    pub fn patch_flip(&self, card_id: &str) -> FlipPatch {
        let mut pre_image = None;
        let mut generation = 0;
        self.tx.send_if_modified(|entry| {
            generation = entry.generation;
            let Some(game) = entry.game.as_mut() else {
                return false;
            };
            let Some((index, card)) = game
                .board
                .iter_mut()
                .enumerate()
                .find(|(_, card)| card.id == card_id)
            else {
                return false;
            };
            pre_image = Some((index, card.clone()));
            card.is_face_up = true;
            entry.version += 1;
            true
        });
        FlipPatch {
            generation,
            pre_image,
        }
    }

    /// Restore the pre-image recorded by [`GameCache::patch_flip`].
    ///
    /// Nothing is restored when a restart replaced the game or when the slot no longer holds the
    /// same card.
    pub fn rollback(&self, patch: FlipPatch) {
        let Some((index, card)) = patch.pre_image else {
            return;
        };
        self.tx.send_if_modified(|entry| {
            if entry.generation != patch.generation {
                return false;
            }
            let Some(slot) = entry
                .game
                .as_mut()
                .and_then(|game| game.board.get_mut(index))
                .filter(|slot| slot.id == card.id)
            else {
                return false;
            };
            *slot = card;
            entry.version += 1;
            true
        });
    }
}
