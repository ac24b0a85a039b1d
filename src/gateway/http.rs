//! REST implementation of [`GameGateway`] backed by `reqwest`.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
    config::{ClientConfig, Endpoints},
    dto::CreateGameRequest,
    error::{ConfigError, GatewayError},
    gateway::{GameGateway, GatewayResult},
    model::{FlipSnapshot, Game},
};

/// Failures while constructing the HTTP gateway.
#[derive(Debug, Error)]
pub enum HttpGatewayError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The backend location is not configured correctly.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FlipRequest<'a> {
    card_id: &'a str,
}

/// Gateway speaking JSON over HTTP to the game backend.
#[derive(Clone)]
pub struct HttpGameGateway {
    client: Client,
    endpoints: Arc<Endpoints>,
}

impl HttpGameGateway {
    /// Build a gateway for the given endpoints with a per-request timeout.
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, HttpGatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| HttpGatewayError::ClientBuilder { source })?;

        Ok(Self {
            client,
            endpoints: Arc::new(endpoints),
        })
    }

    /// Build a gateway from the loaded client configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, HttpGatewayError> {
        Self::new(config.endpoints()?, config.request_timeout())
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "gateway request");
        self.client.request(method, url)
    }
}

impl GameGateway for HttpGameGateway {
    fn create_game(&self, request: CreateGameRequest) -> BoxFuture<'static, GatewayResult<Game>> {
        let builder = self
            .request(Method::POST, self.endpoints.games())
            .json(&request);
        Box::pin(async move { send_json(builder).await })
    }

    fn get_game(&self, game_id: &str) -> BoxFuture<'static, GatewayResult<Game>> {
        let builder = self.request(Method::GET, self.endpoints.game(game_id));
        Box::pin(async move { send_json(builder).await })
    }

    fn flip_card(
        &self,
        game_id: &str,
        card_id: &str,
    ) -> BoxFuture<'static, GatewayResult<Option<FlipSnapshot>>> {
        let builder = self
            .request(Method::POST, self.endpoints.flip(game_id))
            .json(&FlipRequest { card_id });
        Box::pin(async move {
            let response = builder.send().await.map_err(transport_error)?;
            let response = ensure_success(response).await?;
            if response.status() == StatusCode::NO_CONTENT {
                return Ok(None);
            }

            let body = response.bytes().await.map_err(transport_error)?;
            if body.iter().all(u8::is_ascii_whitespace) {
                return Ok(None);
            }
            serde_json::from_slice(&body)
                .map(Some)
                .map_err(|err| GatewayError::Other {
                    message: format!("failed to decode flip response: {err}"),
                })
        })
    }

    fn restart_game(&self, game_id: &str) -> BoxFuture<'static, GatewayResult<Game>> {
        let builder = self.request(Method::POST, self.endpoints.restart(game_id));
        Box::pin(async move { send_json(builder).await })
    }
}

async fn send_json<T>(builder: RequestBuilder) -> GatewayResult<T>
where
    T: DeserializeOwned,
{
    let response = builder.send().await.map_err(transport_error)?;
    let response = ensure_success(response).await?;
    response.json::<T>().await.map_err(transport_error)
}

/// Turn non-success answers into status errors, keeping the server message when present.
async fn ensure_success(response: Response) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.json::<Value>().await.ok();
    Err(GatewayError::from_status_body(
        status.as_u16(),
        body.as_ref(),
    ))
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        GatewayError::Network {
            message: err.to_string(),
        }
    } else if err.is_decode() {
        GatewayError::Other {
            message: format!("failed to decode gateway response: {err}"),
        }
    } else {
        GatewayError::Other {
            message: err.to_string(),
        }
    }
}
