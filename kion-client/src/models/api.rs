//! Kion API request and response records, one pair per endpoint.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Application status (mirrors the HTTP status on errors).
    #[serde(default)]
    pub status: u16,
    /// Human-readable message; carries the error text on failures.
    #[serde(default)]
    pub message: String,
    /// Endpoint payload.
    pub data: T,
}

/// Error envelope; `data` is ignored.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub message: String,
}

// ── Identity ─────────────────────────────────────────────────────────────────

/// An identity management system (IDMS) users authenticate against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDomain {
    pub id: u32,
    pub name: String,
}

/// `POST v3/token`
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub idms: u32,
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub access: LoginAccess,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginAccess {
    pub token: String,
}

// ── Access ───────────────────────────────────────────────────────────────────

/// A cloud access role the current user may assume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudAccessRole {
    pub id: u64,
    #[serde(default)]
    pub account_id: u64,
    #[serde(default)]
    pub account_number: String,
    pub name: String,
}

/// A cloud account visible to the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub account_number: String,
    #[serde(default)]
    pub account_name: String,
}

// ── App API keys ─────────────────────────────────────────────────────────────

/// `POST v3/app-api-key`
#[derive(Serialize)]
pub(crate) struct CreateAppApiKeyRequest<'a> {
    pub name: &'a str,
}

/// `POST v3/app-api-key/rotate`
#[derive(Serialize)]
pub(crate) struct RotateAppApiKeyRequest<'a> {
    pub key: &'a str,
}

/// A freshly issued app API key. The platform does not say when it was
/// created; fetch [`AppApiKeyMetadata`] for that.
#[derive(Clone, Deserialize)]
pub struct AppApiKey {
    pub id: u64,
    pub key: String,
}

impl std::fmt::Debug for AppApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppApiKey")
            .field("id", &self.id)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// `GET v3/app-api-key/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct AppApiKeyMetadata {
    pub id: u64,
    #[serde(rename = "created_at", deserialize_with = "deserialize_timestamp")]
    pub created: DateTime<Utc>,
}

// ── Temporary credentials ────────────────────────────────────────────────────

/// `POST v3/temporary-credentials/cloud-access-role`
#[derive(Serialize)]
pub(crate) struct TemporaryCredentialsRequest<'a> {
    pub account_number: &'a str,
    pub cloud_access_role_name: &'a str,
}

/// Short-lived AWS credentials issued by the platform.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporaryCredentials {
    #[serde(rename = "access_key")]
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl std::fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// Parse an ISO-8601 timestamp: RFC 3339 with offset, or a naive timestamp
/// taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid ISO-8601 timestamp '{raw}'")))
}
