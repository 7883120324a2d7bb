//! Authentication-related types: sessions and app API keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a bearer token was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Issued by `v3/token` in exchange for a username and password.
    Password,
    /// A standing app API key.
    ApplicationKey,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password => write!(f, "password"),
            Self::ApplicationKey => write!(f, "app API key"),
        }
    }
}

/// A bearer token plus what is known locally about its lifetime.
#[derive(Clone)]
pub struct AccessToken {
    token: String,
    kind: TokenKind,
    /// `None` means no local expiry is known.
    expiry: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, kind: TokenKind, expiry: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            kind,
            expiry,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    /// True when a local expiry is known and `now` is past it.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|exp| now > exp)
    }

    /// True for app API keys past their local expiry. Password tokens are
    /// never rejected locally; the platform owns their lifetime.
    #[must_use]
    pub fn is_expired_application_key(&self, now: DateTime<Utc>) -> bool {
        self.kind == TokenKind::ApplicationKey && self.is_expired_at(now)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("kind", &self.kind)
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// An authenticated handle to a Kion host. Lives for one command invocation.
#[derive(Debug, Clone)]
pub struct Session {
    host: String,
    token: AccessToken,
}

impl Session {
    /// Session from a password login; no local expiry.
    pub fn from_password_login(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: AccessToken::new(token, TokenKind::Password, None),
        }
    }

    /// Session from an app API key. Pure: nothing is sent. The expiry travels
    /// with the session so requests made after it are refused locally.
    pub fn with_application_key(
        host: impl Into<String>,
        key: impl Into<String>,
        expiry: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            host: host.into(),
            token: AccessToken::new(key, TokenKind::ApplicationKey, expiry),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn token(&self) -> &AccessToken {
        &self.token
    }
}

/// Lifecycle position of an app API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// No key stored.
    Absent,
    /// Valid beyond the grace period.
    Active,
    /// Valid, but expiring within the grace period.
    NearExpiry,
    /// Past its expiry.
    Expired,
    /// Superseded by an explicit forced re-create.
    Revoked,
}

impl std::fmt::Display for KeyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Absent => "absent",
            Self::Active => "active",
            Self::NearExpiry => "near expiry",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        };
        f.write_str(s)
    }
}

/// A long-lived, rotatable app API key as persisted on disk.
///
/// `expiry` is always `created + validity`; use [`ApplicationKey::new`] or
/// [`ApplicationKey::with_validity`] rather than setting it by hand.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationKey {
    /// Platform id; needed to look up metadata after rotation.
    #[serde(default)]
    pub id: u64,
    /// The secret itself. Never logged.
    pub key: String,
    /// Server-reported creation time.
    pub created: DateTime<Utc>,
    /// `created + validity`.
    pub expiry: DateTime<Utc>,
}

impl ApplicationKey {
    pub fn new(id: u64, key: impl Into<String>, created: DateTime<Utc>, validity: Duration) -> Self {
        Self {
            id,
            key: key.into(),
            created,
            expiry: expiry_after(created, validity),
        }
    }

    /// Recompute the expiry for a (possibly changed) validity window.
    #[must_use]
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.expiry = expiry_after(self.created, validity);
        self
    }

    /// Time left before expiry; zero once expired.
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        (self.expiry - now).to_std().unwrap_or(Duration::ZERO)
    }
}

impl std::fmt::Debug for ApplicationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationKey")
            .field("id", &self.id)
            .field("key", &"<redacted>")
            .field("created", &self.created)
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// `created + validity`, saturating at the latest representable instant.
fn expiry_after(created: DateTime<Utc>, validity: Duration) -> DateTime<Utc> {
    chrono::TimeDelta::from_std(validity)
        .ok()
        .and_then(|delta| created.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
