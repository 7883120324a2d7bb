//! Local persistence: secrets, the app API key file, and the credential cache.
//!
//! - [`SecretStore`] - keyed secret storage for the user's password
//!   - [`KeyringSecretStore`] - system keyring (feature-gated)
//!   - [`MemorySecretStore`] - in-memory (testing, keyring-less builds)
//! - [`KeyFile`] - the app API key, JSON with 0600 permissions
//! - [`CredentialCache`] - temporary credentials keyed by [`CacheKey`](crate::models::cache::CacheKey)

mod cache;
mod file;
mod key_file;
mod memory;

#[cfg(feature = "system-keyring")]
mod keyring;

pub use cache::CredentialCache;
pub use key_file::KeyFile;
pub use memory::MemorySecretStore;

#[cfg(feature = "system-keyring")]
pub use keyring::KeyringSecretStore;

use std::sync::Arc;

use crate::error::Result;

/// Trait for secret storage backends.
///
/// Entries are addressed by a service identifier (see
/// [`keyring_service`](crate::config::keyring_service)) and a username.
/// A missing entry is `Ok(None)`, never an error.
pub trait SecretStore: Send + Sync {
    /// Load the secret for `(service, username)`, if any.
    fn get(&self, service: &str, username: &str) -> Result<Option<String>>;

    /// Store or replace the secret for `(service, username)`.
    fn set(&self, service: &str, username: &str, secret: &str) -> Result<()>;

    /// Delete the secret for `(service, username)`.
    ///
    /// Returns [`Error::NoStoredCredential`](crate::Error::NoStoredCredential)
    /// when there was nothing to delete.
    fn delete(&self, service: &str, username: &str) -> Result<()>;

    /// Name of this storage backend.
    fn name(&self) -> &str;
}

impl<T: SecretStore + ?Sized> SecretStore for Arc<T> {
    fn get(&self, service: &str, username: &str) -> Result<Option<String>> {
        (**self).get(service, username)
    }
    fn set(&self, service: &str, username: &str, secret: &str) -> Result<()> {
        (**self).set(service, username, secret)
    }
    fn delete(&self, service: &str, username: &str) -> Result<()> {
        (**self).delete(service, username)
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: SecretStore + ?Sized> SecretStore for Box<T> {
    fn get(&self, service: &str, username: &str) -> Result<Option<String>> {
        (**self).get(service, username)
    }
    fn set(&self, service: &str, username: &str, secret: &str) -> Result<()> {
        (**self).set(service, username, secret)
    }
    fn delete(&self, service: &str, username: &str) -> Result<()> {
        (**self).delete(service, username)
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// The default secret store for this build: the system keyring when the
/// `system-keyring` feature is on and the keyring is reachable, otherwise
/// process memory.
pub fn default_secret_store() -> Arc<dyn SecretStore> {
    #[cfg(feature = "system-keyring")]
    {
        if KeyringSecretStore::is_available() {
            return Arc::new(KeyringSecretStore::new());
        }
        tracing::warn!("System keyring unavailable; passwords will not persist");
        Arc::new(MemorySecretStore::new())
    }
    #[cfg(not(feature = "system-keyring"))]
    {
        tracing::warn!("Built without system-keyring; passwords will not persist");
        Arc::new(MemorySecretStore::new())
    }
}
