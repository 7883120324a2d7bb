//! App API key lifecycle manager.
//!
//! Owns the key file: creation, expiry tracking, and proactive rotation.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::client::KionClient;
use crate::config::ROTATION_GRACE_PERIOD;
use crate::error::{Error, Result};
use crate::models::api::{AppApiKey, AppApiKeyMetadata};
use crate::models::auth::{ApplicationKey, KeyState};
use crate::storage::KeyFile;
use crate::transport::Transport;

/// How long keys live and when to rotate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPolicy {
    /// Validity window the platform enforces on app API keys.
    pub validity: Duration,
    /// Rotate when the key expires within this window.
    pub grace: Duration,
    /// Whether the broker rotates automatically.
    pub auto_rotate: bool,
}

impl KeyPolicy {
    pub fn new(validity: Duration) -> Self {
        Self {
            validity,
            grace: ROTATION_GRACE_PERIOD,
            auto_rotate: false,
        }
    }

    #[must_use]
    pub fn with_auto_rotate(mut self, auto_rotate: bool) -> Self {
        self.auto_rotate = auto_rotate;
        self
    }

}

/// Manages the app API key stored in a [`KeyFile`].
///
/// The only writer of the key file.
#[derive(Debug)]
pub struct KeyLifecycleManager {
    file: KeyFile,
    policy: KeyPolicy,
    /// Id of the key a forced re-create replaced.
    replaced: Option<u64>,
}

impl KeyLifecycleManager {
    pub fn new(file: KeyFile, policy: KeyPolicy) -> Self {
        Self {
            file,
            policy,
            replaced: None,
        }
    }

    pub fn policy(&self) -> &KeyPolicy {
        &self.policy
    }

    pub fn key_file(&self) -> &KeyFile {
        &self.file
    }

    /// Load the stored key with its expiry recomputed as
    /// `created + validity`, so a changed validity setting takes effect.
    pub fn load(&self) -> Result<Option<ApplicationKey>> {
        Ok(self
            .file
            .load()?
            .map(|key| key.with_validity(self.policy.validity)))
    }

    /// Where `key` sits in its lifecycle at `now`.
    pub fn state(&self, key: Option<&ApplicationKey>, now: DateTime<Utc>) -> KeyState {
        let Some(key) = key else {
            return KeyState::Absent;
        };
        if self.replaced == Some(key.id) {
            KeyState::Revoked
        } else if now > key.expiry {
            KeyState::Expired
        } else if self.within_grace(key, now) {
            KeyState::NearExpiry
        } else {
            KeyState::Active
        }
    }

    /// True iff auto-rotation is on and `now + grace >= expiry`.
    #[must_use]
    pub fn should_rotate(&self, key: &ApplicationKey, now: DateTime<Utc>) -> bool {
        self.policy.auto_rotate && self.within_grace(key, now)
    }

    fn within_grace(&self, key: &ApplicationKey, now: DateTime<Utc>) -> bool {
        let grace = chrono::TimeDelta::from_std(self.policy.grace).unwrap_or(chrono::TimeDelta::MAX);
        now.checked_add_signed(grace)
            .is_none_or(|threshold| threshold >= key.expiry)
    }

    /// Create and persist a new key using an authenticated (password) client.
    ///
    /// Fails with [`Error::KeyAlreadyExists`] when a key is stored and
    /// `force` is false. With `force`, an unreadable key file is no obstacle
    /// and the stored key is only replaced once the new key has been issued.
    /// The old key is not deleted on the platform; it reads as
    /// [`KeyState::Revoked`] afterwards.
    #[instrument(skip(self, client))]
    pub async fn create(
        &mut self,
        client: &KionClient,
        name: &str,
        force: bool,
    ) -> Result<ApplicationKey> {
        let previous = match self.file.load() {
            Ok(previous) => previous,
            Err(e) if force => {
                warn!(error = %e, "Replacing unreadable key file");
                None
            }
            Err(e) => return Err(e),
        };
        if previous.is_some() && !force {
            return Err(Error::KeyAlreadyExists);
        }

        let requested = Utc::now();
        let issued = client.create_app_api_key(name).await?;
        let metadata = client.app_api_key_metadata(issued.id).await;
        let replaces = previous.map(|key| key.id).filter(|id| *id != issued.id);
        let key = self.persist_issued(issued, metadata, requested, replaces)?;

        info!(key_id = key.id, expiry = %key.expiry, "App API key created");
        Ok(key)
    }

    /// Rotate `key` and persist the replacement.
    ///
    /// The rotate call is made with `key` itself and no local expiry, so a
    /// key already past its local expiry can still be rotated if the
    /// platform accepts it. The new key's creation time comes from its
    /// metadata, fetched with the new key. A 401 from the platform on the
    /// rotate call means the key must be re-created, and surfaces as
    /// [`Error::ApplicationKeyUnauthorized`].
    #[instrument(skip(self, transport, key), fields(key_id = key.id))]
    pub async fn rotate(&mut self, transport: &Transport, key: &ApplicationKey) -> Result<ApplicationKey> {
        let old = KionClient::with_application_key(transport.clone(), key.key.clone(), None);
        let requested = Utc::now();
        let issued = old.rotate_app_api_key(&key.key).await.map_err(|e| match e {
            Error::Unauthorized => Error::ApplicationKeyUnauthorized,
            other => other,
        })?;

        // The old key is dead from here on.
        let new = KionClient::with_application_key(transport.clone(), issued.key.clone(), None);
        let metadata = new.app_api_key_metadata(issued.id).await;
        let rotated = self.persist_issued(issued, metadata, requested, None)?;

        info!(new_key_id = rotated.id, expiry = %rotated.expiry, "App API key rotated");
        Ok(rotated)
    }

    /// Store a newly issued key, dated by its metadata.
    ///
    /// When the metadata lookup failed the key is still stored, dated at
    /// `requested` (never later than the real creation time, so the local
    /// expiry errs early), and the lookup error is returned. `replaces` is
    /// the id of a key this one supersedes by force.
    fn persist_issued(
        &mut self,
        issued: AppApiKey,
        metadata: Result<AppApiKeyMetadata>,
        requested: DateTime<Utc>,
        replaces: Option<u64>,
    ) -> Result<ApplicationKey> {
        let (created, lookup_error) = match metadata {
            Ok(metadata) => (metadata.created, None),
            Err(e) => (requested, Some(e)),
        };
        let key = ApplicationKey::new(issued.id, issued.key, created, self.policy.validity);
        self.file.save(&key)?;
        self.replaced = replaces;
        if let Some(old_key_id) = replaces {
            info!(old_key_id, "Stored app API key replaced");
        }

        match lookup_error {
            None => Ok(key),
            Some(e) => {
                warn!(
                    key_id = key.id,
                    error = %e,
                    "Stored new app API key without its creation time; expiry estimated"
                );
                Err(e)
            }
        }
    }

    /// Rotate if the policy says so; otherwise return `key` unchanged.
    ///
    /// Logs a warning when the key is inside the grace window but automatic
    /// rotation is off.
    pub async fn rotate_if_due(
        &mut self,
        transport: &Transport,
        key: ApplicationKey,
        now: DateTime<Utc>,
    ) -> Result<ApplicationKey> {
        if self.should_rotate(&key, now) {
            debug!(key_id = key.id, expiry = %key.expiry, "App API key due for rotation");
            return self.rotate(transport, &key).await;
        }
        if self.within_grace(&key, now) {
            warn!(
                key_id = key.id,
                expiry = %key.expiry,
                expires_in_secs = key.time_until_expiry(now).as_secs(),
                "App API key expires soon and automatic rotation is disabled; run \"kion key rotate\""
            );
        }
        Ok(key)
    }

}
