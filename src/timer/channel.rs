use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::Endpoints,
    dto::{TimerUpdate, parse_timer_message},
    model::GameStatus,
};

use super::transport::{TimerConnector, TimerTransport};

/// Callback invoked when the countdown reports a terminal status.
pub type GameEndHandler = Arc<dyn Fn(GameStatus) + Send + Sync>;

/// Identity of one connection: a game and the session epoch it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    /// Game whose countdown is streamed.
    pub game_id: String,
    /// Session epoch at open time; a restart opens a new key.
    pub epoch: u64,
}

impl ChannelKey {
    /// Key for `game_id` at `epoch`.
    pub fn new(game_id: impl Into<String>, epoch: u64) -> Self {
        Self {
            game_id: game_id.into(),
            epoch,
        }
    }
}

struct ActiveConnection {
    key: ChannelKey,
    live: Arc<AtomicBool>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ActiveConnection {
    /// Stop publishing and ask the task to close its socket.
    fn cancel(&mut self) {
        self.live.store(false, Ordering::SeqCst);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Countdown push channel of the current session.
///
/// The latest update is published through a watch channel; `None` means the countdown is
/// unknown (not connected yet, closed or failed). There is no automatic reconnection: a new
/// connection is opened only for a new [`ChannelKey`].
pub struct CountdownChannel {
    connector: Arc<dyn TimerConnector>,
    endpoints: Arc<Endpoints>,
    on_game_end: GameEndHandler,
    updates: watch::Sender<Option<TimerUpdate>>,
    active: Option<ActiveConnection>,
}

impl CountdownChannel {
    /// Create a closed channel.
    pub fn new(
        connector: Arc<dyn TimerConnector>,
        endpoints: Arc<Endpoints>,
        on_game_end: impl Fn(GameStatus) + Send + Sync + 'static,
    ) -> Self {
        let (updates, _) = watch::channel(None);
        Self {
            connector,
            endpoints,
            on_game_end: Arc::new(on_game_end),
            updates,
            active: None,
        }
    }

    /// Connect for `key`, replacing any connection of another key.
    ///
    /// The socket is opened after one scheduling tick; closing the channel before that prevents
    /// the open altogether.
    pub fn open(&mut self, key: ChannelKey) {
        if self.key() == Some(&key) {
            return;
        }
        self.close();

        let url = self.endpoints.timer(&key.game_id);
        let live = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        info!(game_id = %key.game_id, epoch = key.epoch, %url, "opening timer channel");

        let task = tokio::spawn(run_connection(Connection {
            connector: self.connector.clone(),
            url,
            key: key.clone(),
            live: live.clone(),
            updates: self.updates.clone(),
            on_game_end: self.on_game_end.clone(),
            shutdown_rx,
        }));

        self.active = Some(ActiveConnection {
            key,
            live,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        });
    }

    /// Cancel the current connection, if any, and forget the last update.
    pub fn close(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(game_id = %active.key.game_id, epoch = active.key.epoch, "closing timer channel");
        }
        self.updates.send_replace(None);
    }

    /// Like [`CountdownChannel::close`], but waits until the socket is closed.
    pub async fn shutdown(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.cancel();
            if let Some(task) = active.task.take() {
                if let Err(err) = task.await {
                    warn!(error = %err, "timer task ended abnormally");
                }
            }
        }
        self.updates.send_replace(None);
    }

    /// Receiver of countdown updates.
    pub fn subscribe(&self) -> watch::Receiver<Option<TimerUpdate>> {
        self.updates.subscribe()
    }

    /// Latest valid update, `None` while the countdown is unknown.
    pub fn latest(&self) -> Option<TimerUpdate> {
        *self.updates.borrow()
    }

    /// Key of the current connection.
    pub fn key(&self) -> Option<&ChannelKey> {
        self.active.as_ref().map(|active| &active.key)
    }
}

struct Connection {
    connector: Arc<dyn TimerConnector>,
    url: Url,
    key: ChannelKey,
    live: Arc<AtomicBool>,
    updates: watch::Sender<Option<TimerUpdate>>,
    on_game_end: GameEndHandler,
    shutdown_rx: oneshot::Receiver<()>,
}

impl Connection {
    /// Publish unless the connection was cancelled.
    fn publish(&self, update: Option<TimerUpdate>) -> bool {
        let live = &self.live;
        let mut published = false;
        self.updates.send_if_modified(|current| {
            if !live.load(Ordering::SeqCst) {
                return false;
            }
            *current = update;
            published = true;
            true
        });
        published
    }
}

async fn run_connection(mut conn: Connection) {
    // Deferred open: a close in the same tick wins.
    tokio::task::yield_now().await;
    if !matches!(
        conn.shutdown_rx.try_recv(),
        Err(oneshot::error::TryRecvError::Empty)
    ) {
        debug!(game_id = %conn.key.game_id, "timer channel closed before opening");
        return;
    }

    // The connector is only called once this future is polled.
    let connector = conn.connector.clone();
    let url = conn.url.clone();
    let connected = tokio::select! {
        biased;
        _ = &mut conn.shutdown_rx => {
            debug!(game_id = %conn.key.game_id, "timer channel closed while connecting");
            return;
        }
        result = async move { connector.connect(url).await } => result,
    };

    let mut transport = match connected {
        Ok(transport) => transport,
        Err(err) => {
            warn!(game_id = %conn.key.game_id, error = %err, "timer connection failed");
            conn.publish(None);
            return;
        }
    };
    info!(game_id = %conn.key.game_id, epoch = conn.key.epoch, "timer channel connected");

    receive_frames(&mut conn, transport.as_mut()).await;
}

async fn receive_frames(conn: &mut Connection, transport: &mut dyn TimerTransport) {
    let mut last_status: Option<GameStatus> = None;

    loop {
        let frame = tokio::select! {
            biased;
            _ = &mut conn.shutdown_rx => {
                transport.close().await;
                debug!(game_id = %conn.key.game_id, "timer socket closed");
                return;
            }
            frame = transport.recv() => frame,
        };

        match frame {
            Some(Ok(text)) => {
                let Some(update) = parse_timer_message(&text) else {
                    continue;
                };
                if !conn.publish(Some(update)) {
                    transport.close().await;
                    return;
                }
                let entered_terminal =
                    update.status.is_terminal() && last_status != Some(update.status);
                last_status = Some(update.status);
                if entered_terminal {
                    info!(game_id = %conn.key.game_id, status = ?update.status, "countdown reports game end");
                    (conn.on_game_end)(update.status);
                }
            }
            Some(Err(err)) => {
                warn!(game_id = %conn.key.game_id, error = %err, "timer socket error");
                conn.publish(None);
                return;
            }
            None => {
                info!(game_id = %conn.key.game_id, "timer socket closed by server");
                conn.publish(None);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::Mutex,
    };

    use futures::future::BoxFuture;
    use tokio::sync::mpsc;

    use crate::timer::TransportError;

    use super::*;

    type FrameSender = mpsc::UnboundedSender<Result<String, TransportError>>;

    struct ScriptedTransport {
        frames: mpsc::UnboundedReceiver<Result<String, TransportError>>,
        closed: Arc<AtomicBool>,
    }

    impl TimerTransport for ScriptedTransport {
        fn recv(&mut self) -> BoxFuture<'_, Option<Result<String, TransportError>>> {
            Box::pin(self.frames.recv())
        }

        fn close(&mut self) -> BoxFuture<'_, ()> {
            self.closed.store(true, Ordering::SeqCst);
            Box::pin(async {})
        }
    }

    #[derive(Default)]
    struct ScriptedConnector {
        transports: Mutex<VecDeque<ScriptedTransport>>,
        urls: Mutex<Vec<Url>>,
    }

    impl ScriptedConnector {
        /// Queue a transport; returns its frame sender and closed flag.
        fn push_transport(&self) -> (FrameSender, Arc<AtomicBool>) {
            let (tx, frames) = mpsc::unbounded_channel();
            let closed = Arc::new(AtomicBool::new(false));
            self.transports.lock().unwrap().push_back(ScriptedTransport {
                frames,
                closed: closed.clone(),
            });
            (tx, closed)
        }

        fn connects(&self) -> usize {
            self.urls.lock().unwrap().len()
        }
    }

    impl TimerConnector for ScriptedConnector {
        fn connect(
            &self,
            url: Url,
        ) -> BoxFuture<'static, Result<Box<dyn TimerTransport>, TransportError>> {
            self.urls.lock().unwrap().push(url);
            let next = self.transports.lock().unwrap().pop_front();
            Box::pin(async move {
                match next {
                    Some(transport) => Ok(Box::new(transport) as Box<dyn TimerTransport>),
                    None => Err(TransportError::Connect {
                        message: "connection refused".into(),
                    }),
                }
            })
        }
    }

    struct Harness {
        connector: Arc<ScriptedConnector>,
        channel: CountdownChannel,
        ended: Arc<Mutex<Vec<GameStatus>>>,
    }

    fn harness() -> Harness {
        let connector = Arc::new(ScriptedConnector::default());
        let endpoints = Arc::new(Endpoints::new("http://localhost:3000").unwrap());
        let ended = Arc::new(Mutex::new(Vec::new()));
        let channel = CountdownChannel::new(connector.clone(), endpoints, {
            let ended = ended.clone();
            move |status| ended.lock().unwrap().push(status)
        });
        Harness {
            connector,
            channel,
            ended,
        }
    }

    fn frame(seconds: i64, status: &str) -> Result<String, TransportError> {
        Ok(format!(
            r#"{{"remainingSeconds":{seconds},"status":"{status}"}}"#
        ))
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn valid_frames_update_and_game_end_fires_once() {
        let mut h = harness();
        let (frames, _) = h.connector.push_transport();
        let mut rx = h.channel.subscribe();
        h.channel.open(ChannelKey::new("g-1", 0));

        frames.send(frame(30, "playing")).unwrap();
        frames.send(Ok("not json".into())).unwrap();
        frames.send(Ok(r#"{"error":"boom"}"#.into())).unwrap();
        frames.send(frame(-3, "won")).unwrap();
        frames.send(frame(4, "won")).unwrap();

        rx.wait_for(|update| update.is_some_and(|u| u.displayed_seconds == 4.0))
            .await
            .unwrap();

        assert_eq!(*h.ended.lock().unwrap(), vec![GameStatus::Won]);
        assert_eq!(
            h.connector.urls.lock().unwrap()[0].as_str(),
            "ws://localhost:3000/api/games/g-1/timer"
        );
    }

    #[tokio::test]
    async fn negative_seconds_are_clamped() {
        let mut h = harness();
        let (frames, _) = h.connector.push_transport();
        let mut rx = h.channel.subscribe();
        h.channel.open(ChannelKey::new("g-1", 0));

        frames.send(frame(-3, "playing")).unwrap();
        let update = *rx.wait_for(Option::is_some).await.unwrap();
        assert_eq!(
            update,
            Some(TimerUpdate {
                displayed_seconds: 0.0,
                status: GameStatus::Playing
            })
        );
        assert!(h.ended.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn server_close_clears_the_countdown() {
        let mut h = harness();
        let (frames, _) = h.connector.push_transport();
        let mut rx = h.channel.subscribe();
        h.channel.open(ChannelKey::new("g-1", 0));

        frames.send(frame(10, "playing")).unwrap();
        rx.wait_for(Option::is_some).await.unwrap();

        drop(frames);
        rx.wait_for(Option::is_none).await.unwrap();
        settle().await;
        // No reconnection attempt.
        assert_eq!(h.connector.connects(), 1);
    }

    #[tokio::test]
    async fn socket_error_clears_the_countdown() {
        let mut h = harness();
        let (frames, _) = h.connector.push_transport();
        let mut rx = h.channel.subscribe();
        h.channel.open(ChannelKey::new("g-1", 0));

        frames.send(frame(10, "playing")).unwrap();
        rx.wait_for(Option::is_some).await.unwrap();
        frames
            .send(Err(TransportError::Stream {
                message: "reset".into(),
            }))
            .unwrap();
        rx.wait_for(Option::is_none).await.unwrap();
    }

    #[tokio::test]
    async fn close_before_open_prevents_connection() {
        let mut h = harness();
        h.connector.push_transport();
        h.channel.open(ChannelKey::new("g-1", 0));
        h.channel.close();

        settle().await;
        assert_eq!(h.connector.connects(), 0);
        assert_eq!(h.channel.key(), None);
    }

    #[tokio::test]
    async fn reopen_in_same_tick_connects_only_the_latest_game() {
        let mut h = harness();
        h.connector.push_transport();
        h.channel.open(ChannelKey::new("g-1", 0));
        h.channel.open(ChannelKey::new("g-2", 0));

        settle().await;
        let urls = h.connector.urls.lock().unwrap().clone();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].path().contains("g-2"));
    }

    #[tokio::test]
    async fn shutdown_closes_open_socket() {
        let mut h = harness();
        let (frames, closed) = h.connector.push_transport();
        h.channel.open(ChannelKey::new("g-1", 0));
        while h.connector.connects() == 0 {
            tokio::task::yield_now().await;
        }

        h.channel.shutdown().await;
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(h.channel.latest(), None);
        drop(frames);
    }

    #[tokio::test]
    async fn same_key_is_reused_and_new_epoch_reconnects() {
        let mut h = harness();
        let (_first, first_closed) = h.connector.push_transport();
        let (second, _) = h.connector.push_transport();
        let mut rx = h.channel.subscribe();

        h.channel.open(ChannelKey::new("g-1", 0));
        h.channel.open(ChannelKey::new("g-1", 0));
        settle().await;
        assert_eq!(h.connector.connects(), 1);

        h.channel.open(ChannelKey::new("g-1", 1));
        second.send(frame(42, "playing")).unwrap();
        rx.wait_for(|update| update.is_some_and(|u| u.displayed_seconds == 42.0))
            .await
            .unwrap();

        assert_eq!(h.connector.connects(), 2);
        assert!(first_closed.load(Ordering::SeqCst));
        assert_eq!(h.channel.key(), Some(&ChannelKey::new("g-1", 1)));
    }

    #[tokio::test]
    async fn failed_connection_leaves_countdown_unknown() {
        let mut h = harness();
        h.channel.open(ChannelKey::new("g-1", 0));
        settle().await;

        assert_eq!(h.connector.connects(), 1);
        assert_eq!(h.channel.latest(), None);
    }
}
