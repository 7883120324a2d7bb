//! Error types for kion-client.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::INVALID_CREDENTIALS_MESSAGE;

/// The main error type for kion-client.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ───────────────────────────────────────────────────────
    /// The platform rejected the username/password pair.
    #[error("kion: invalid credentials")]
    InvalidCredentials,

    /// The platform rejected the bearer token.
    #[error("kion: unauthorized")]
    Unauthorized,

    /// The app API key is past its locally known expiry. No request was sent.
    #[error("kion: app API key expired")]
    ApplicationKeyExpired,

    /// The platform no longer accepts the stored app API key; it has to be
    /// re-created from a password login rather than rotated.
    #[error("kion: app API key rejected by the platform")]
    ApplicationKeyUnauthorized,

    /// An app API key is already stored and overwrite was not requested.
    #[error("key exists; use --force to overwrite")]
    KeyAlreadyExists,

    /// No password stored in the secret store for this identity.
    #[error("no stored credentials for '{username}' ({service})")]
    NoStoredCredential {
        /// Secret store service identifier.
        service: String,
        /// Account within the service.
        username: String,
    },

    // ── Platform ─────────────────────────────────────────────────────────────
    /// Any other non-2xx envelope from the platform.
    #[error("kion: {message} ({status})")]
    Platform {
        /// Application status from the response envelope.
        status: u16,
        /// Message from the response envelope, verbatim.
        message: String,
    },

    // ── Configuration ────────────────────────────────────────────────────────
    /// A required setting is absent.
    #[error("missing config value: {0}")]
    MissingConfiguration(String),

    /// A setting is present but unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    // ── Storage ──────────────────────────────────────────────────────────────
    /// Storage I/O error.
    #[error("Storage I/O error at {path}: {message}")]
    StorageIo {
        /// Path that caused the error.
        path: PathBuf,
        /// Error description.
        message: String,
    },

    /// Storage serialization error.
    #[error("Storage serialization error: {0}")]
    StorageSerialization(String),

    /// Keyring backend error.
    #[error("Keyring error: {0}")]
    Keyring(String),

    // ── Infrastructure ───────────────────────────────────────────────────────
    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Category of a failed authentication or exchange attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Wrong username or password.
    InvalidCredentials,
    /// Bearer token (password session or app API key) rejected.
    Unauthorized,
    /// Everything else: transient, platform-side, or unknown.
    Other,
}

/// Classify a platform failure from its envelope status and message.
///
/// This is the only place that knows the platform's wording for a bad
/// password. If the platform rewords it, failures fall through to
/// [`FailureClass::Other`].
#[must_use]
pub fn classify_failure(status: u16, message: &str) -> FailureClass {
    if status == 400 && message == INVALID_CREDENTIALS_MESSAGE {
        FailureClass::InvalidCredentials
    } else if status == 401 {
        FailureClass::Unauthorized
    } else {
        FailureClass::Other
    }
}

impl Error {
    /// Build the typed error for a non-2xx platform envelope.
    #[must_use]
    pub fn from_envelope(status: u16, message: String) -> Self {
        match classify_failure(status, &message) {
            FailureClass::InvalidCredentials => Error::InvalidCredentials,
            FailureClass::Unauthorized => Error::Unauthorized,
            FailureClass::Other => Error::Platform { status, message },
        }
    }

    /// Returns true if this error indicates re-authentication is needed.
    #[must_use]
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            Error::InvalidCredentials
                | Error::Unauthorized
                | Error::ApplicationKeyExpired
                | Error::ApplicationKeyUnauthorized
                | Error::NoStoredCredential { .. }
        )
    }

    /// Creates a storage I/O error.
    #[must_use]
    pub fn storage_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StorageIo {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Convenience type alias.
pub type Result<T> = std::result::Result<T, Error>;
