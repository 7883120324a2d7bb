//! On-disk cache of temporary credentials.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::file;
use crate::error::{Error, Result};
use crate::models::cache::{CacheKey, CachedCredential};

type Entries = BTreeMap<String, CachedCredential>;

/// Temporary credentials keyed by [`CacheKey`].
///
/// Every [`store`](Self::store) reads the whole file, replaces one entry and
/// rewrites the file. There is no cross-process locking, so two concurrent
/// invocations may lose one of their writes. A file that fails to decode is
/// an error, never silently discarded.
#[derive(Debug, Clone)]
pub struct CredentialCache {
    path: PathBuf,
}

impl CredentialCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The entry for `key` if it is still fresh at `now`.
    ///
    /// "Never cached" and "expired" are both `None`.
    #[instrument(skip(self), fields(key = %key))]
    pub fn lookup(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Option<CachedCredential>> {
        let entries = self.read_all()?;
        match entries.get(key.as_str()) {
            Some(entry) if entry.is_fresh_at(now) => {
                debug!(expiry = %entry.expiry, "Credential cache hit");
                Ok(Some(entry.clone()))
            }
            Some(entry) => {
                debug!(expiry = %entry.expiry, "Cached credential expired");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Insert or replace the entry for `key`.
    #[instrument(skip(self, credential), fields(key = %key, expiry = %credential.expiry))]
    pub fn store(&self, key: &CacheKey, credential: &CachedCredential) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.insert(key.as_str().to_string(), credential.clone());
        let content = serde_json::to_string_pretty(&entries).map_err(|e| {
            Error::StorageSerialization(format!("Failed to serialize credential cache: {e}"))
        })?;
        file::write_private(&self.path, &content)?;
        debug!(entries = entries.len(), "Credential cache written");
        Ok(())
    }

    fn read_all(&self) -> Result<Entries> {
        let Some(content) = file::read_optional(&self.path)? else {
            return Ok(Entries::new());
        };
        serde_json::from_str(&content).map_err(|e| {
            Error::StorageSerialization(format!(
                "Failed to parse credential cache '{}': {e}",
                self.path.display()
            ))
        })
    }
}
