//! Scripted in-memory gateway used by unit tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;
use tokio::sync::oneshot;

use crate::{
    dto::CreateGameRequest,
    error::GatewayError,
    gateway::{GameGateway, GatewayResult},
    model::{FlipSnapshot, Game},
};

type FlipReply = GatewayResult<Option<FlipSnapshot>>;

enum FlipStep {
    Reply(FlipReply),
    Pending(oneshot::Receiver<FlipReply>),
}

#[derive(Default)]
struct Script {
    game: Option<Game>,
    get_error: Option<GatewayError>,
    restart_error: Option<GatewayError>,
    flips: VecDeque<FlipStep>,
    flipped: Vec<String>,
    get_calls: usize,
    restart_calls: usize,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedGateway {
    script: Arc<Mutex<Script>>,
}

impl ScriptedGateway {
    pub(crate) fn serving(game: Game) -> Self {
        let gateway = Self::default();
        gateway.set_game(game);
        gateway
    }

    fn with<T>(&self, f: impl FnOnce(&mut Script) -> T) -> T {
        f(&mut self.script.lock().unwrap())
    }

    pub(crate) fn set_game(&self, game: Game) {
        self.with(|s| s.game = Some(game));
    }

    pub(crate) fn fail_get(&self, error: GatewayError) {
        self.with(|s| s.get_error = Some(error));
    }

    pub(crate) fn fail_restart(&self, error: GatewayError) {
        self.with(|s| s.restart_error = Some(error));
    }

    pub(crate) fn push_flip(&self, reply: FlipReply) {
        self.with(|s| s.flips.push_back(FlipStep::Reply(reply)));
    }

    /// Queue a flip that stays in flight until the returned sender answers.
    pub(crate) fn push_pending_flip(&self) -> oneshot::Sender<FlipReply> {
        let (tx, rx) = oneshot::channel();
        self.with(|s| s.flips.push_back(FlipStep::Pending(rx)));
        tx
    }

    pub(crate) fn flipped(&self) -> Vec<String> {
        self.with(|s| s.flipped.clone())
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.with(|s| s.get_calls)
    }

    pub(crate) fn restart_calls(&self) -> usize {
        self.with(|s| s.restart_calls)
    }
}

fn not_found() -> GatewayError {
    GatewayError::Status {
        status: 404,
        message: None,
    }
}

impl GameGateway for ScriptedGateway {
    fn create_game(&self, request: CreateGameRequest) -> BoxFuture<'static, GatewayResult<Game>> {
        let result = self.with(|s| {
            let mut game = s.game.clone().ok_or_else(not_found)?;
            game.settings.user_name = request.user_name;
            game.settings.card_count = request.card_count;
            Ok(game)
        });
        Box::pin(async move { result })
    }

    fn get_game(&self, _game_id: &str) -> BoxFuture<'static, GatewayResult<Game>> {
        let result = self.with(|s| {
            s.get_calls += 1;
            match s.get_error.clone() {
                Some(err) => Err(err),
                None => s.game.clone().ok_or_else(not_found),
            }
        });
        Box::pin(async move { result })
    }

    fn flip_card(
        &self,
        _game_id: &str,
        card_id: &str,
    ) -> BoxFuture<'static, GatewayResult<Option<FlipSnapshot>>> {
        let step = self.with(|s| {
            s.flipped.push(card_id.to_string());
            s.flips.pop_front()
        });
        Box::pin(async move {
            match step {
                Some(FlipStep::Reply(reply)) => reply,
                Some(FlipStep::Pending(rx)) => rx.await.unwrap_or_else(|_| {
                    Err(GatewayError::Network {
                        message: "scripted flip dropped".into(),
                    })
                }),
                None => Err(GatewayError::Other {
                    message: "no scripted flip".into(),
                }),
            }
        })
    }

    fn restart_game(&self, _game_id: &str) -> BoxFuture<'static, GatewayResult<Game>> {
        let result = self.with(|s| {
            s.restart_calls += 1;
            match s.restart_error.clone() {
                Some(err) => Err(err),
                None => s.game.clone().ok_or_else(not_found),
            }
        });
        Box::pin(async move { result })
    }
}
