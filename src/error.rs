//! Error types and the messages shown to the player.

use serde_json::Value;
use thiserror::Error;

/// Message shown when nothing more specific can be derived from an error.
pub const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong";
/// Message shown for transport-level failures.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error";

/// Failures reported by a game gateway call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The gateway answered with a non-success status code.
    #[error("gateway responded with status {status}")]
    Status {
        /// HTTP-like status code.
        status: u16,
        /// Server-supplied message (the `error` field of the JSON body), if any.
        message: Option<String>,
    },
    /// The request never produced a response (connection refused, timeout, ...).
    #[error("network failure: {message}")]
    Network {
        /// Underlying transport description.
        message: String,
    },
    /// Any other failure, e.g. an undecodable response body.
    #[error("{message}")]
    Other {
        /// Raw description.
        message: String,
    },
}

impl GatewayError {
    /// Build a status error, extracting the server message from a JSON error body.
    pub fn from_status_body(status: u16, body: Option<&Value>) -> Self {
        let message = body
            .and_then(|body| body.get("error"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        GatewayError::Status { status, message }
    }

    /// Status code, when the gateway produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            GatewayError::Network { .. } | GatewayError::Other { .. } => None,
        }
    }

    /// `true` for a 404 answer.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Translate a gateway error into the single human-readable string shown to the player.
///
/// Precedence: server-supplied message, then a generic per-status message, then a network
/// classification, then the raw message, then [`DEFAULT_ERROR_MESSAGE`].
pub fn error_message(error: &GatewayError) -> String {
    match error {
        GatewayError::Status {
            message: Some(message),
            ..
        } => message.clone(),
        GatewayError::Status {
            status: 404,
            message: None,
        } => "Game not found".into(),
        GatewayError::Status {
            status: 400,
            message: None,
        } => "Invalid move".into(),
        GatewayError::Status {
            status,
            message: None,
        } => format!("Request failed ({status})"),
        GatewayError::Network { .. } => NETWORK_ERROR_MESSAGE.into(),
        GatewayError::Other { message } if message.is_empty() => DEFAULT_ERROR_MESSAGE.into(),
        GatewayError::Other { message } => {
            let lowered = message.to_lowercase();
            if lowered.contains("fetch") || lowered.contains("network") {
                NETWORK_ERROR_MESSAGE.into()
            } else {
                message.clone()
            }
        }
    }
}

/// Errors surfaced by a game session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The session was constructed without a usable game identifier.
    #[error("game ID is required")]
    MissingGameId,
    /// The game does not exist (or could not be loaded); the session cannot continue.
    #[error("{message}")]
    GameNotFound {
        /// Translated message for the player.
        message: String,
    },
}

/// Errors raised while resolving the client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No backend URL is configured.
    #[error("backend URL is not set (use `{var}` or the config file)")]
    MissingBackendUrl {
        /// Environment variable that can provide the value.
        var: &'static str,
    },
    /// The configured backend URL cannot be parsed.
    #[error("invalid backend URL `{url}`")]
    InvalidBackendUrl {
        /// Value as configured.
        url: String,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },
    /// The backend URL uses a scheme without a WebSocket counterpart.
    #[error("unsupported backend URL scheme `{scheme}`")]
    UnsupportedScheme {
        /// Scheme of the configured URL.
        scheme: String,
    },
}

/// Result alias for preference storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by key-value backends regardless of where values are kept.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be read or written.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What was attempted.
        message: String,
        /// Backend failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Stored content is not valid JSON.
    #[error("stored preferences are corrupt: {source}")]
    Corrupt {
        /// Decoding failure.
        #[from]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            source: Box::new(source),
        }
    }
}
