//! On-disk app API key.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use super::file;
use crate::error::{Error, Result};
use crate::models::auth::ApplicationKey;

/// The persisted app API key: `{id, key, created, expiry}` as JSON, 0600.
///
/// Rewritten wholesale on every change; concurrent writers race and the
/// last one wins.
#[derive(Debug, Clone)]
pub struct KeyFile {
    path: PathBuf,
}

impl KeyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored key. A missing or empty file is `None`.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Option<ApplicationKey>> {
        let Some(content) = file::read_optional(&self.path)? else {
            return Ok(None);
        };
        let key: ApplicationKey = serde_json::from_str(&content).map_err(|e| {
            Error::StorageSerialization(format!(
                "Failed to parse key file '{}': {e}",
                self.path.display()
            ))
        })?;
        if key.key.is_empty() {
            return Ok(None);
        }
        Ok(Some(key))
    }

    #[instrument(skip(self, key), fields(path = %self.path.display(), key_id = key.id))]
    pub fn save(&self, key: &ApplicationKey) -> Result<()> {
        let content = serde_json::to_string_pretty(key)
            .map_err(|e| Error::StorageSerialization(format!("Failed to serialize key: {e}")))?;
        file::write_private(&self.path, &content)?;
        debug!("Saved app API key");
        Ok(())
    }
}
