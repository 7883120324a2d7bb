//! HTTP transport for the Kion API.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::{API_BASE_PATH, CONNECT_TIMEOUT, REQUEST_TIMEOUT, api_base_url};
use crate::error::{Error, Result};
use crate::models::api::{Envelope, ErrorEnvelope};
use crate::models::auth::AccessToken;

/// Sends requests under a host's `api/` prefix and decodes the
/// `{status, message, data}` envelope.
///
/// No retries: network errors propagate as-is.
#[derive(Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: Url,
}

impl Transport {
    /// Transport for `https://{host}/api/`.
    pub fn new(host: &str) -> Result<Self> {
        Ok(Self {
            client: default_client()?,
            base_url: api_base_url(host)?,
        })
    }

    /// Transport for an explicit origin such as `http://127.0.0.1:8080`;
    /// the `api/` prefix is appended.
    pub fn with_origin(origin: &str) -> Result<Self> {
        let mut origin = Url::parse(origin)
            .map_err(|e| Error::Config(format!("Invalid API origin '{origin}': {e}")))?;
        if !origin.path().ends_with('/') {
            let path = format!("{}/", origin.path());
            origin.set_path(&path);
        }
        let base_url = origin
            .join(API_BASE_PATH)
            .map_err(|e| Error::Config(format!("Invalid API origin: {e}")))?;
        Ok(Self {
            client: default_client()?,
            base_url,
        })
    }

    /// Replace the HTTP client (custom TLS, proxies, tests).
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET {path}`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        token: Option<&AccessToken>,
        path: &str,
    ) -> Result<T> {
        self.send::<(), T>(Method::GET, token, path, None).await
    }

    /// `POST {path}` with a JSON body.
    pub async fn post<B, T>(&self, token: Option<&AccessToken>, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, token, path, Some(body)).await
    }

    /// Send a request and decode the envelope's `data`.
    ///
    /// An app API key already past its local expiry is refused with
    /// [`Error::ApplicationKeyExpired`] before anything is sent.
    pub async fn send<B, T>(
        &self,
        method: Method,
        token: Option<&AccessToken>,
        path: &str,
        body: Option<&B>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if let Some(token) = token {
            if token.is_expired_application_key(chrono::Utc::now()) {
                return Err(Error::ApplicationKeyExpired);
            }
        }

        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid API path '{path}': {e}")))?;

        debug!(method = %method, path, "Sending Kion API request");

        let mut request = self.client.request(method.clone(), url);
        if let Some(token) = token {
            request = request.bearer_auth(token.token());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
            return Ok(envelope.data);
        }

        let error = match serde_json::from_slice::<ErrorEnvelope>(&bytes) {
            Ok(envelope) => {
                let app_status = if envelope.status == 0 {
                    status.as_u16()
                } else {
                    envelope.status
                };
                Error::from_envelope(app_status, envelope.message)
            }
            Err(_) => Error::Platform {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).trim().to_string(),
            },
        };
        warn!(method = %method, path, http_status = status.as_u16(), error = %error, "Kion API request failed");
        Err(error)
    }
}

fn default_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(Error::Network)
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}
