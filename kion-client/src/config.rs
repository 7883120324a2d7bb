//! Configuration constants and URL helpers for the Kion API.

use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Path prefix under which every API endpoint lives.
pub const API_BASE_PATH: &str = "api/";

/// Message the platform returns alongside status 400 for a bad password.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password.";

/// Rotate the app API key when it expires within this window.
pub const ROTATION_GRACE_PERIOD: Duration = Duration::from_secs(72 * 60 * 60);

/// Name given to app API keys created by this tool.
pub const DEFAULT_APP_API_KEY_NAME: &str = "Kion Tool";

/// How long cached temporary credentials are trusted when not configured.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(60 * 60);

/// Connect timeout for HTTP requests.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for a whole request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Returns the API base URL for a Kion host, e.g. `https://kion.example.com/api/`.
pub fn api_base_url(host: &str) -> Result<Url> {
    let host = host.trim();
    if host.is_empty() || host.contains('/') || host.contains(char::is_whitespace) {
        return Err(Error::Config(format!(
            "Invalid host '{host}' (expected a bare host name like 'kion.example.com')"
        )));
    }
    Url::parse(&format!("https://{host}/{API_BASE_PATH}"))
        .map_err(|e| Error::Config(format!("Invalid host '{host}': {e}")))
}

/// Keyring service identifier for a host and identity domain.
pub fn keyring_service(host: &str, idms: u32) -> String {
    format!("{host}/{idms}")
}
