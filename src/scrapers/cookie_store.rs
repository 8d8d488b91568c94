//! Cookie file persistence.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors writing or reading a cookie file.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to read cookie file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write cookie file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read a cookie header from a file. Empty files yield `None`.
pub fn load_cookie_file(path: &Path) -> Result<Option<String>, PersistError> {
    let content = std::fs::read_to_string(path).map_err(|source| PersistError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cookie = content.trim();
    if cookie.is_empty() {
        Ok(None)
    } else {
        Ok(Some(cookie.to_string()))
    }
}

/// Replace the cookie file with `cookie`.
///
/// The value is written to a temporary file in the same directory and
/// renamed over the target, so readers never observe a partial write.
pub fn save_cookie_file(path: &Path, cookie: &str) -> Result<(), PersistError> {
    let write_err = |source: std::io::Error| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    tmp.write_all(cookie.as_bytes()).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    tracing::debug!("Saved cookie to {}", path.display());
    Ok(())
}
