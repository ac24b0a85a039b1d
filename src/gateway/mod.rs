//! Seam between the client and the authoritative game server.

#[cfg(feature = "http-gateway")]
pub mod http;

use futures::future::BoxFuture;

use crate::{
    dto::CreateGameRequest,
    error::GatewayError,
    model::{FlipSnapshot, Game},
};

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Abstraction over the remote, authoritative game server.
pub trait GameGateway: Send + Sync {
    /// Create a new game from validated settings.
    fn create_game(&self, request: CreateGameRequest) -> BoxFuture<'static, GatewayResult<Game>>;
    /// Fetch the full game. A missing game yields a 404 status error.
    fn get_game(&self, game_id: &str) -> BoxFuture<'static, GatewayResult<Game>>;
    /// Flip one card. `Ok(None)` means the gateway answered without a payload.
    fn flip_card(
        &self,
        game_id: &str,
        card_id: &str,
    ) -> BoxFuture<'static, GatewayResult<Option<FlipSnapshot>>>;
    /// Reset board and state of an existing game, keeping its settings.
    fn restart_game(&self, game_id: &str) -> BoxFuture<'static, GatewayResult<Game>>;
}

#[cfg(test)]
pub(crate) mod fake;
