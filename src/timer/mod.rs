//! Live Countdown Channel: one push connection per game session incarnation.

mod channel;
pub mod transport;
#[cfg(feature = "ws-timer")]
pub mod websocket;

pub use self::channel::{ChannelKey, CountdownChannel, GameEndHandler};
pub use self::transport::{TimerConnector, TimerTransport, TransportError};
#[cfg(feature = "ws-timer")]
pub use self::websocket::WebSocketConnector;
