//! Inbound countdown frames.

use serde_json::Value;
use tracing::warn;

use crate::model::GameStatus;

/// Countdown information derived from one valid timer frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerUpdate {
    /// Remaining seconds, never negative.
    pub displayed_seconds: f64,
    /// Status reported with the frame.
    pub status: GameStatus,
}

/// Parse an inbound timer frame.
///
/// Returns `None` (after logging) for malformed JSON, non-object payloads, server error frames
/// and frames whose `remainingSeconds` or `status` are invalid.
pub fn parse_timer_message(payload: &str) -> Option<TimerUpdate> {
    let data: Value = match serde_json::from_str(payload) {
        Ok(data) => data,
        Err(err) => {
            warn!(error = %err, "dropping malformed timer frame");
            return None;
        }
    };

    let Value::Object(fields) = data else {
        warn!("dropping timer frame: payload is not an object");
        return None;
    };

    if let Some(error) = fields.get("error") {
        warn!(error = %error, "timer channel reported an error");
        return None;
    }

    let remaining = fields.get("remainingSeconds").and_then(coerce_number);
    let status = fields
        .get("status")
        .and_then(Value::as_str)
        .and_then(GameStatus::parse);

    let (Some(remaining), Some(status)) = (remaining, status) else {
        warn!(payload, "dropping timer frame: invalid remainingSeconds or status");
        return None;
    };

    Some(TimerUpdate {
        displayed_seconds: remaining.max(0.0),
        status,
    })
}

/// Loose numeric coercion: numbers, numeric strings, booleans and null are accepted, anything
/// that does not yield a finite value is rejected.
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::Array(_) | Value::Object(_) => return None,
    };
    number.is_finite().then_some(number)
}
