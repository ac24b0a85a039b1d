//! WebSocket connector backed by `tokio-tungstenite`.

use futures::{StreamExt, future::BoxFuture};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::debug;
use url::Url;

use super::transport::{TimerConnector, TimerTransport, TransportError};

/// Connects to the backend's timer WebSocket.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl TimerConnector for WebSocketConnector {
    fn connect(
        &self,
        url: Url,
    ) -> BoxFuture<'static, Result<Box<dyn TimerTransport>, TransportError>> {
        Box::pin(async move {
            let (stream, response) =
                connect_async(url.as_str())
                    .await
                    .map_err(|err| TransportError::Connect {
                        message: err.to_string(),
                    })?;
            debug!(%url, status = %response.status(), "timer socket opened");
            Ok(Box::new(WebSocketTransport { stream }) as Box<dyn TimerTransport>)
        })
    }
}

struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TimerTransport for WebSocketTransport {
    fn recv(&mut self) -> BoxFuture<'_, Option<Result<String, TransportError>>> {
        Box::pin(async move {
            loop {
                match self.stream.next().await? {
                    Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                    Ok(Message::Close(frame)) => {
                        debug!(?frame, "timer socket closed by peer");
                        return None;
                    }
                    // Pings are answered by tungstenite itself.
                    Ok(_) => continue,
                    Err(err) => {
                        return Some(Err(TransportError::Stream {
                            message: err.to_string(),
                        }));
                    }
                }
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Err(err) = self.stream.close(None).await {
                debug!(error = %err, "timer socket close failed");
            }
        })
    }
}
