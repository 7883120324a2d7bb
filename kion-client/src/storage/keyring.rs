//! System keyring secret storage.

use tracing::instrument;

use super::SecretStore;
use crate::error::{Error, Result};

/// Secret storage backed by the platform's native credential store.
///
/// Entries are stored as plain strings under `(service, username)`, the
/// same layout earlier versions of the tool used.
#[derive(Debug, Clone, Default)]
pub struct KeyringSecretStore;

impl KeyringSecretStore {
    pub fn new() -> Self {
        Self
    }

    /// Check if the system keyring is reachable.
    pub fn is_available() -> bool {
        match keyring::Entry::new("kion-availability-check", "kion") {
            Ok(entry) => match entry.get_password() {
                Ok(_) | Err(keyring::Error::NoEntry) => true,
                Err(keyring::Error::NoStorageAccess(_)) => false,
                Err(keyring::Error::PlatformFailure(_)) => false,
                Err(_) => true,
            },
            Err(_) => false,
        }
    }

    fn entry(service: &str, username: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(service, username)
            .map_err(|e| Error::Keyring(format!("Failed to create keyring entry: {e}")))
    }
}

impl SecretStore for KeyringSecretStore {
    #[instrument(skip(self))]
    fn get(&self, service: &str, username: &str) -> Result<Option<String>> {
        match Self::entry(service, username)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::Keyring(e.to_string())),
        }
    }

    #[instrument(skip(self, secret))]
    fn set(&self, service: &str, username: &str, secret: &str) -> Result<()> {
        Self::entry(service, username)?
            .set_password(secret)
            .map_err(|e| Error::Keyring(e.to_string()))
    }

    #[instrument(skip(self))]
    fn delete(&self, service: &str, username: &str) -> Result<()> {
        match Self::entry(service, username)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Err(Error::NoStoredCredential {
                service: service.to_string(),
                username: username.to_string(),
            }),
            Err(e) => Err(Error::Keyring(e.to_string())),
        }
    }

    fn name(&self) -> &str {
        "keyring"
    }
}
