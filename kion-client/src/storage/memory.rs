//! In-memory secret storage.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::SecretStore;
use crate::error::{Error, Result};

/// In-memory secret storage.
///
/// Clone shares the underlying map. Useful for tests and for builds
/// without the system keyring.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    inner: Arc<RwLock<HashMap<(String, String), String>>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with one secret.
    pub fn with_secret(service: &str, username: &str, secret: &str) -> Self {
        let store = Self::new();
        store
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((service.to_string(), username.to_string()), secret.to_string());
        store
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, service: &str, username: &str) -> Result<Option<String>> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard
            .get(&(service.to_string(), username.to_string()))
            .cloned())
    }

    fn set(&self, service: &str, username: &str, secret: &str) -> Result<()> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert((service.to_string(), username.to_string()), secret.to_string());
        Ok(())
    }

    fn delete(&self, service: &str, username: &str) -> Result<()> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match guard.remove(&(service.to_string(), username.to_string())) {
            Some(_) => Ok(()),
            None => Err(Error::NoStoredCredential {
                service: service.to_string(),
                username: username.to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}
