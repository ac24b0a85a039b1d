//! Gateway calls bound to one game and its cache.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    cache::GameCache,
    dto::CreateGameRequest,
    error::error_message,
    gateway::{GameGateway, GatewayResult},
    model::{FlipSnapshot, Game},
};

/// Create a new game. Nothing is cached: the new game gets its own session.
pub async fn create_game(
    gateway: &dyn GameGateway,
    request: CreateGameRequest,
) -> GatewayResult<Game> {
    let game = gateway.create_game(request).await?;
    debug!(game_id = %game.game_id, "game created");
    Ok(game)
}

/// Gateway operations of one game, keeping [`GameCache`] in sync with their results.
pub struct GameApi {
    gateway: Arc<dyn GameGateway>,
    cache: Arc<GameCache>,
    game_id: String,
}

impl GameApi {
    /// Bind the gateway to `game_id` with an empty cache.
    pub fn new(gateway: Arc<dyn GameGateway>, game_id: impl Into<String>) -> Self {
        Self {
            gateway,
            cache: Arc::new(GameCache::new()),
            game_id: game_id.into(),
        }
    }

    /// Identifier of the bound game.
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Cache holding the authoritative game.
    pub fn cache(&self) -> &Arc<GameCache> {
        &self.cache
    }

    /// Fetch the game, overwriting the cache or recording the failure.
    pub async fn fetch(&self) -> GatewayResult<()> {
        self.cache.set_fetching(true);
        let result = self.gateway.get_game(&self.game_id).await;
        self.cache.set_fetching(false);

        match result {
            Ok(game) => {
                self.cache.store_game(game);
                Ok(())
            }
            Err(err) => {
                warn!(
                    game_id = %self.game_id,
                    error = %error_message(&err),
                    "failed to fetch game"
                );
                self.cache.store_error(err.clone());
                Err(err)
            }
        }
    }

    /// Flip a card: optimistic patch first, then merge the answer or roll the patch back.
    pub async fn flip_card(&self, card_id: &str) -> GatewayResult<Option<FlipSnapshot>> {
        let patch = self.cache.patch_flip(card_id);

        match self.gateway.flip_card(&self.game_id, card_id).await {
            Ok(Some(snapshot)) => {
                if !self.cache.merge_flip(&patch, snapshot.clone()) {
                    debug!(game_id = %self.game_id, card_id, "flip answered after restart; dropped");
                }
                Ok(Some(snapshot))
            }
            Ok(None) => {
                debug!(game_id = %self.game_id, card_id, "flip answered without payload");
                Ok(None)
            }
            Err(err) => {
                warn!(
                    game_id = %self.game_id,
                    card_id,
                    error = %error_message(&err),
                    "flip rejected; rolling back"
                );
                self.cache.rollback(patch);
                Err(err)
            }
        }
    }

    /// Restart the game and cache the fresh board.
    pub async fn restart(&self) -> GatewayResult<Game> {
        let game = self.gateway.restart_game(&self.game_id).await?;
        self.cache.replace_game(game.clone());
        Ok(game)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        cache::tests::sample_game,
        error::GatewayError,
        gateway::fake::ScriptedGateway,
        model::{Card, FlipSnapshot},
    };

    use super::*;

    fn board() -> Vec<Card> {
        ["a", "b", "c", "d"].into_iter().map(Card::hidden).collect()
    }

    fn api(gateway: &ScriptedGateway) -> GameApi {
        GameApi::new(Arc::new(gateway.clone()), "g-1")
    }

    #[tokio::test]
    async fn fetch_caches_game_and_records_failures() {
        let gateway = ScriptedGateway::serving(sample_game(board()));
        let api = api(&gateway);

        api.fetch().await.unwrap();
        assert_eq!(api.cache().version(), 1);
        assert!(!api.cache().is_fetching());

        gateway.fail_get(GatewayError::Network {
            message: "offline".into(),
        });
        assert!(api.fetch().await.is_err());
        assert!(api.cache().last_error().is_some());
        assert!(api.cache().game().is_some());
        assert_eq!(api.cache().version(), 1);
    }

    #[tokio::test]
    async fn successful_flip_merges_snapshot() {
        let gateway = ScriptedGateway::serving(sample_game(board()));
        let api = api(&gateway);
        api.fetch().await.unwrap();

        let mut flipped = board();
        flipped[2].is_face_up = true;
        flipped[2].emoji = Some("🍎".into());
        gateway.push_flip(Ok(Some(FlipSnapshot {
            game_id: "g-1".into(),
            board: flipped.clone(),
            state: sample_game(vec![]).state,
        })));

        let snapshot = api.flip_card("c").await.unwrap().unwrap();
        assert_eq!(snapshot.board, flipped);
        assert_eq!(api.cache().game().unwrap().board, flipped);
        assert_eq!(gateway.flipped(), vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn optimistic_patch_is_visible_then_rolled_back() {
        let gateway = ScriptedGateway::serving(sample_game(board()));
        let api = Arc::new(api(&gateway));
        api.fetch().await.unwrap();

        let reply = gateway.push_pending_flip();
        let task = tokio::spawn({
            let api = api.clone();
            async move { api.flip_card("b").await }
        });
        tokio::task::yield_now().await;
        while gateway.flipped().is_empty() {
            tokio::task::yield_now().await;
        }
        assert!(api.cache().game().unwrap().board[1].is_face_up);

        reply
            .send(Err(GatewayError::Status {
                status: 400,
                message: None,
            }))
            .unwrap();
        assert!(task.await.unwrap().is_err());
        assert_eq!(api.cache().game().unwrap().board, board());
    }

    #[tokio::test]
    async fn restart_overwrites_cache() {
        let gateway = ScriptedGateway::serving(sample_game(board()));
        let api = api(&gateway);

        let game = api.restart().await.unwrap();
        assert_eq!(api.cache().game(), Some(game));
        assert_eq!(gateway.restart_calls(), 1);
    }

    #[tokio::test]
    async fn flip_answer_after_restart_is_dropped() {
        let gateway = ScriptedGateway::serving(sample_game(board()));
        let api = Arc::new(api(&gateway));
        api.fetch().await.unwrap();

        let reply = gateway.push_pending_flip();
        let task = tokio::spawn({
            let api = api.clone();
            async move { api.flip_card("a").await }
        });
        while gateway.flipped().is_empty() {
            tokio::task::yield_now().await;
        }
        api.restart().await.unwrap();

        let mut flipped = board();
        flipped[0].is_face_up = true;
        reply
            .send(Ok(Some(FlipSnapshot {
                game_id: "g-1".into(),
                board: flipped,
                state: sample_game(vec![]).state,
            })))
            .unwrap();
        assert!(task.await.unwrap().unwrap().is_some());
        assert_eq!(api.cache().game().unwrap().board, board());
    }
}
