//! Terminal driver: creates a game, then plays it from stdin commands.

use std::sync::Arc;

use anyhow::Context;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memory_match_client::{
    api::create_game,
    config::ClientConfig,
    dto::{SettingsForm, TimerUpdate},
    gateway::{GameGateway, http::HttpGameGateway},
    model::Card,
    preferences::{FileStore, Preferences},
    presets::{PRESETS, find_preset},
    session::{GameSession, SessionView},
    timer::{ChannelKey, CountdownChannel, WebSocketConnector},
};

const DEFAULT_PLAYER: &str = "player";
const CARDS_PER_ROW: usize = 4;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::load();
    let endpoints = config.endpoints().context("resolving backend endpoints")?;
    let gateway: Arc<dyn GameGateway> =
        Arc::new(HttpGameGateway::from_config(&config).context("building HTTP gateway")?);

    let mut preferences = Preferences::load(FileStore::new(config.preferences_path()));
    let preset = preferences
        .selected_preset_id()
        .and_then(find_preset)
        .unwrap_or(&PRESETS[0]);
    let player = match preferences.last_username() {
        "" => DEFAULT_PLAYER.to_string(),
        name => name.to_string(),
    };
    let request = SettingsForm::from_preset(preset, player)
        .into_request()
        .context("validating game settings")?;
    preferences.set_last_username(&request.user_name);
    preferences.set_selected_preset(preset.id);

    let game = create_game(gateway.as_ref(), request)
        .await
        .context("creating game")?;
    info!(game_id = %game.game_id, preset = preset.id, "game created");
    let session = GameSession::open(gateway, game.game_id)
        .await
        .context("opening game")?;

    let (end_tx, mut end_rx) = mpsc::unbounded_channel();
    let mut countdown = CountdownChannel::new(
        Arc::new(WebSocketConnector),
        Arc::new(endpoints),
        move |status| {
            let _ = end_tx.send(status);
        },
    );
    countdown.open(ChannelKey::new(session.game_id(), session.epoch()));

    print_help();
    print_view(&session.view().await, countdown.latest());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                match Command::parse(&line) {
                    Some(Command::Flip(card_id)) => session.flip(&card_id).await,
                    Some(Command::Restart) => {
                        session.restart().await;
                        countdown.open(ChannelKey::new(session.game_id(), session.epoch()));
                    }
                    Some(Command::Dismiss) => session.reset_errors().await,
                    Some(Command::Show) => {}
                    Some(Command::Quit) => break,
                    None => {
                        print_help();
                        continue;
                    }
                }
                print_view(&session.view().await, countdown.latest());
            }
            Some(status) = end_rx.recv() => {
                session.handle_game_end(status).await;
                print_view(&session.view().await, countdown.latest());
            }
        }
    }

    countdown.shutdown().await;
    Ok(())
}

/// Configure tracing subscribers; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

enum Command {
    Flip(String),
    Restart,
    Dismiss,
    Show,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = match words.next()? {
            "flip" | "f" => Command::Flip(words.next()?.to_string()),
            "restart" | "r" => Command::Restart,
            "dismiss" | "d" => Command::Dismiss,
            "show" | "s" => Command::Show,
            "quit" | "q" | "exit" => Command::Quit,
            _ => return None,
        };
        Some(command)
    }
}

fn print_help() {
    println!("commands: flip <card id> | restart | dismiss | show | quit");
}

fn print_view(view: &SessionView, countdown: Option<TimerUpdate>) {
    for row in view.board.chunks(CARDS_PER_ROW) {
        let cells: Vec<String> = row.iter().map(render_card).collect();
        println!("{}", cells.join(" "));
    }

    if let Some(state) = &view.state {
        let timer = match countdown {
            Some(update) => format!("{:.0}s", update.displayed_seconds),
            None => "--".to_string(),
        };
        let lives = view
            .lives_left
            .map(|lives| lives.to_string())
            .unwrap_or_else(|| "unlimited".to_string());
        println!(
            "status: {:?} | turns: {} | pairs: {} | lives: {} | timer: {}",
            state.status, state.turns, view.matched_pairs, lives, timer
        );
    }
    if let Some(error) = &view.error {
        println!("error: {error} (type `dismiss` to clear)");
    }
}

fn render_card(card: &Card) -> String {
    let face = match (&card.emoji, card.is_face_up || card.is_matched) {
        (Some(emoji), true) => emoji.as_str(),
        _ => "??",
    };
    if card.is_matched {
        format!("({}:{face})", card.id)
    } else {
        format!("[{}:{face}]", card.id)
    }
}
