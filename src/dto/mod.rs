//! Wire-level payloads exchanged with the gateway and the timer channel.

pub mod requests;
pub mod timer;
pub mod validation;

pub use requests::{CreateGameRequest, SettingsForm};
pub use timer::{TimerUpdate, parse_timer_message};
