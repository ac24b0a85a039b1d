//! Transport abstraction under the countdown channel.

use futures::future::BoxFuture;
use thiserror::Error;
use url::Url;

/// Failures of the countdown push connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be opened.
    #[error("failed to open timer connection: {message}")]
    Connect {
        /// Description of the underlying failure.
        message: String,
    },
    /// The open connection failed.
    #[error("timer connection failed: {message}")]
    Stream {
        /// Description of the underlying failure.
        message: String,
    },
}

/// An open push connection delivering text frames.
pub trait TimerTransport: Send {
    /// Next text frame. `None` once the peer closed the connection.
    fn recv(&mut self) -> BoxFuture<'_, Option<Result<String, TransportError>>>;
    /// Close the connection. Errors are not reported.
    fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// Opens push connections.
pub trait TimerConnector: Send + Sync {
    /// Connect to `url`.
    fn connect(
        &self,
        url: Url,
    ) -> BoxFuture<'static, Result<Box<dyn TimerTransport>, TransportError>>;
}
