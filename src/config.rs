//! Client configuration loading and endpoint construction.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::error::ConfigError;

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/client.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MEMORY_MATCH_CONFIG_PATH";
/// Environment variable providing the backend URL.
pub const BACKEND_URL_ENV: &str = "MEMORY_MATCH_BACKEND_URL";
/// Environment variable overriding where preferences are stored.
const PREFERENCES_PATH_ENV: &str = "MEMORY_MATCH_PREFERENCES_PATH";

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_PREFERENCES_PATH: &str = "memory-match-preferences.json";

/// Immutable runtime configuration of the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    backend_url: Option<String>,
    request_timeout: Duration,
    preferences_path: PathBuf,
}

impl ClientConfig {
    /// Load the configuration from disk, falling back to defaults, then apply environment
    /// overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded client config");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_env_overrides()
    }

    /// Configuration pointing at an explicit backend.
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(url) = non_empty_env(BACKEND_URL_ENV) {
            self.backend_url = Some(url);
        }
        if let Some(path) = non_empty_env(PREFERENCES_PATH_ENV) {
            self.preferences_path = PathBuf::from(path);
        }
        self
    }

    /// Endpoints derived from the backend URL.
    pub fn endpoints(&self) -> Result<Endpoints, ConfigError> {
        let url = self
            .backend_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingBackendUrl {
                var: BACKEND_URL_ENV,
            })?;
        Endpoints::new(url)
    }

    /// Timeout applied to each gateway request.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// File backing the persisted preferences.
    pub fn preferences_path(&self) -> &PathBuf {
        &self.preferences_path
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            preferences_path: PathBuf::from(DEFAULT_PREFERENCES_PATH),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    backend_url: Option<String>,
    #[serde(default)]
    request_timeout_ms: Option<u64>,
    #[serde(default)]
    preferences_path: Option<PathBuf>,
}

impl From<RawConfig> for ClientConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            backend_url: value.backend_url,
            request_timeout: value
                .request_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            preferences_path: value.preferences_path.unwrap_or(defaults.preferences_path),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

/// REST and push-channel URLs of the game backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api_base: Url,
    ws_base: Url,
}

impl Endpoints {
    /// Derive endpoints from the backend root URL (`http` or `https`).
    pub fn new(backend_url: &str) -> Result<Self, ConfigError> {
        let backend =
            Url::parse(backend_url.trim()).map_err(|source| ConfigError::InvalidBackendUrl {
                url: backend_url.to_string(),
                source,
            })?;

        let ws_scheme = match backend.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(ConfigError::UnsupportedScheme {
                    scheme: other.to_string(),
                });
            }
        };

        let api_base = join(&backend, &["api"]);
        let mut ws_base = api_base.clone();
        ws_base
            .set_scheme(ws_scheme)
            .map_err(|()| ConfigError::UnsupportedScheme {
                scheme: backend.scheme().to_string(),
            })?;

        Ok(Self { api_base, ws_base })
    }

    /// Root of the REST API (`{backend}/api`).
    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// `POST` target for game creation.
    pub fn games(&self) -> Url {
        join(&self.api_base, &["games"])
    }

    /// Resource URL of one game.
    pub fn game(&self, game_id: &str) -> Url {
        join(&self.api_base, &["games", game_id])
    }

    /// Flip action of one game.
    pub fn flip(&self, game_id: &str) -> Url {
        join(&self.api_base, &["games", game_id, "flip"])
    }

    /// Restart action of one game.
    pub fn restart(&self, game_id: &str) -> Url {
        join(&self.api_base, &["games", game_id, "restart"])
    }

    /// Countdown push channel of one game.
    pub fn timer(&self, game_id: &str) -> Url {
        join(&self.ws_base, &["games", game_id, "timer"])
    }
}

/// Append path segments (percent-encoded) to a base URL.
fn join(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
