//! Session selection and the cache-aware temporary credential exchange.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::auth::{KeyLifecycleManager, KeyPolicy};
use crate::client::KionClient;
use crate::config::{DEFAULT_SESSION_DURATION, keyring_service};
use crate::error::{Error, Result};
use crate::models::cache::{CacheKey, CachedCredential};
use crate::storage::{CredentialCache, KeyFile, SecretStore};
use crate::transport::Transport;

/// The settings the broker needs, assembled once by the caller.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub host: String,
    /// Identity domain id. Required for password login and the cache key.
    pub idms: Option<u32>,
    /// Required for password login and the cache key.
    pub username: Option<String>,
    /// Validity window of app API keys. Required when a key is stored.
    pub app_api_key_duration: Option<Duration>,
    pub rotate_app_api_keys: bool,
    /// How long freshly issued temporary credentials are trusted.
    pub session_duration: Duration,
}

impl BrokerSettings {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            idms: None,
            username: None,
            app_api_key_duration: None,
            rotate_app_api_keys: false,
            session_duration: DEFAULT_SESSION_DURATION,
        }
    }

    pub fn idms(&self) -> Result<u32> {
        self.idms
            .ok_or_else(|| Error::MissingConfiguration("idms".into()))
    }

    pub fn username(&self) -> Result<&str> {
        self.username
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::MissingConfiguration("username".into()))
    }

    pub fn app_api_key_duration(&self) -> Result<Duration> {
        self.app_api_key_duration
            .ok_or_else(|| Error::MissingConfiguration("app_api_key_duration".into()))
    }
}

/// Decides how to authenticate for one command invocation and hands out
/// temporary credentials, consulting the cache first.
///
/// Authentication happens at most once and only when the platform actually
/// has to be called: a cache hit makes no network requests at all.
pub struct CredentialBroker {
    settings: BrokerSettings,
    transport: Transport,
    secrets: Arc<dyn SecretStore>,
    key_file: KeyFile,
    cache: CredentialCache,
    client: Option<KionClient>,
}

impl CredentialBroker {
    pub fn new(
        settings: BrokerSettings,
        secrets: Arc<dyn SecretStore>,
        key_file: KeyFile,
        cache: CredentialCache,
    ) -> Result<Self> {
        let transport = Transport::new(&settings.host)?;
        Ok(Self {
            settings,
            transport,
            secrets,
            key_file,
            cache,
            client: None,
        })
    }

    /// Talk to a different transport (tests, proxies).
    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self.client = None;
        self
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// The authenticated client, created on first use.
    ///
    /// A stored app API key wins (rotated first when due); otherwise the
    /// password is read from the secret store and exchanged for a token.
    pub async fn client(&mut self) -> Result<&KionClient> {
        let client = match self.client.take() {
            Some(client) => client,
            None => self.authenticate().await?,
        };
        Ok(self.client.insert(client))
    }

    #[instrument(skip(self), fields(host = %self.settings.host))]
    async fn authenticate(&self) -> Result<KionClient> {
        if let Some(stored) = self.key_file.load()? {
            let validity = self.settings.app_api_key_duration()?;
            let mut keys = KeyLifecycleManager::new(
                self.key_file.clone(),
                KeyPolicy::new(validity).with_auto_rotate(self.settings.rotate_app_api_keys),
            );
            let now = Utc::now();
            let key = keys
                .rotate_if_due(&self.transport, stored.with_validity(validity), now)
                .await?;
            debug!(
                key_id = key.id,
                expiry = %key.expiry,
                state = %keys.state(Some(&key), now),
                "Using app API key"
            );
            return Ok(KionClient::with_application_key(
                self.transport.clone(),
                key.key,
                Some(key.expiry),
            ));
        }

        let idms = self.settings.idms()?;
        let username = self.settings.username()?;
        let service = keyring_service(&self.settings.host, idms);
        let password =
            self.secrets
                .get(&service, username)?
                .ok_or_else(|| Error::NoStoredCredential {
                    service: service.clone(),
                    username: username.to_string(),
                })?;
        debug!(store = self.secrets.name(), "Using stored password");
        KionClient::login(self.transport.clone(), idms, username, &password).await
    }

    /// Cache key for an account and role under the configured identity.
    pub fn cache_key(&self, account_id: &str, role: &str) -> Result<CacheKey> {
        Ok(CacheKey::new(
            &self.settings.host,
            self.settings.idms()?,
            self.settings.username()?,
            account_id,
            role,
        ))
    }

    /// Temporary credentials for `account_id` and `role`.
    ///
    /// Returns a fresh cached entry verbatim if there is one. Otherwise
    /// authenticates, exchanges, and caches the result with
    /// `expiry = now + session_duration`.
    #[instrument(skip(self))]
    pub async fn temporary_credentials(
        &mut self,
        account_id: &str,
        role: &str,
    ) -> Result<CachedCredential> {
        let key = self.cache_key(account_id, role)?;
        if let Some(hit) = self.cache.lookup(&key, Utc::now())? {
            return Ok(hit);
        }

        let credentials = self
            .client()
            .await?
            .temporary_credentials(account_id, role)
            .await?;
        let expiry = Utc::now()
            + chrono::TimeDelta::from_std(self.settings.session_duration)
                .map_err(|e| Error::Config(format!("Invalid session duration: {e}")))?;
        let entry = CachedCredential::new(credentials, expiry);
        self.cache.store(&key, &entry)?;

        info!(expiry = %entry.expiry, "Issued temporary credentials");
        Ok(entry)
    }
}

impl std::fmt::Debug for CredentialBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBroker")
            .field("settings", &self.settings)
            .field("transport", &self.transport)
            .field("secrets", &self.secrets.name())
            .field("key_file", &self.key_file.path())
            .field("cache", &self.cache.path())
            .field("authenticated", &self.client.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySecretStore;

    fn broker(dir: &tempfile::TempDir, settings: BrokerSettings) -> CredentialBroker {
        CredentialBroker::new(
            settings,
            Arc::new(MemorySecretStore::new()),
            KeyFile::new(dir.path().join("key.json")),
            CredentialCache::new(dir.path().join("cache.json")),
        )
        .unwrap()
    }

    #[test]
    fn test_settings_accessors_report_missing_keys() {
        let settings = BrokerSettings::new("kion.example.com");
        assert!(matches!(
            settings.idms().unwrap_err(),
            Error::MissingConfiguration(k) if k == "idms"
        ));
        assert!(matches!(
            settings.username().unwrap_err(),
            Error::MissingConfiguration(k) if k == "username"
        ));
        assert!(matches!(
            settings.app_api_key_duration().unwrap_err(),
            Error::MissingConfiguration(k) if k == "app_api_key_duration"
        ));
    }

    #[test]
    fn test_empty_username_is_missing() {
        let mut settings = BrokerSettings::new("h");
        settings.username = Some(String::new());
        assert!(settings.username().is_err());
    }

    #[tokio::test]
    async fn test_no_key_and_no_password_is_no_stored_credential() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = BrokerSettings::new("kion.example.com");
        settings.idms = Some(3);
        settings.username = Some("alice".into());
        let mut broker = broker(&dir, settings);

        match broker.client().await.unwrap_err() {
            Error::NoStoredCredential { service, username } => {
                assert_eq!(service, "kion.example.com/3");
                assert_eq!(username, "alice");
            }
            other => panic!("expected NoStoredCredential, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stored_key_requires_duration() {
        let dir = tempfile::tempdir().unwrap();
        KeyFile::new(dir.path().join("key.json"))
            .save(&crate::models::auth::ApplicationKey::new(
                1,
                "k",
                Utc::now(),
                Duration::from_secs(3600),
            ))
            .unwrap();
        let mut broker = broker(&dir, BrokerSettings::new("kion.example.com"));
        assert!(matches!(
            broker.client().await.unwrap_err(),
            Error::MissingConfiguration(_)
        ));
    }

    #[test]
    fn test_cache_key_needs_identity() {
        let dir = tempfile::tempdir().unwrap();
        let broker = broker(&dir, BrokerSettings::new("kion.example.com"));
        assert!(matches!(
            broker.cache_key("111", "admin").unwrap_err(),
            Error::MissingConfiguration(_)
        ));
    }
}
