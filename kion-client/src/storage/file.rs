//! Owner-only file helpers shared by the key file and the credential cache.

use std::path::Path;

use crate::error::{Error, Result};

/// File permissions for secret files (Unix only): owner read/write.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Directory permissions (Unix only): owner read/write/execute.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// Read a file, treating a missing or blank file as `None`.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(None),
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::storage_io(path, format!("Failed to read: {e}"))),
    }
}

/// Replace `path` with `content`: write a 0600 temp file next to it, then
/// rename it over the existing file. The parent directory is created 0700 if absent.
pub(crate) fn write_private(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let temp_path = path.with_extension("tmp");

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(FILE_MODE)
            .open(&temp_path)
            .map_err(|e| Error::storage_io(&temp_path, format!("Failed to create: {e}")))?;
        file.write_all(content.as_bytes())
            .map_err(|e| Error::storage_io(&temp_path, format!("Failed to write: {e}")))?;
        file.sync_all()
            .map_err(|e| Error::storage_io(&temp_path, format!("Failed to sync: {e}")))?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(&temp_path, content)
            .map_err(|e| Error::storage_io(&temp_path, format!("Failed to write: {e}")))?;
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(Error::storage_io(
            path,
            format!("Failed to rename from '{}': {e}", temp_path.display()),
        ));
    }

    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::storage_io(dir, format!("Failed to create directory: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(DIR_MODE))
            .map_err(|e| Error::storage_io(dir, format!("Failed to set permissions: {e}")))?;
    }
    Ok(())
}
