use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;
use thiserror::Error;
use uuid::Uuid;

const TOKEN_FILE: &str = "user_hash";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no data directory available")]
    NoDataDir,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Opaque anonymous identity sent as `user_hash` on every request.
/// Generated once, persisted in the user's data directory, never expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    token: String,
    /// False when persistence failed and the token only lives for this session.
    persisted: bool,
}

impl UserIdentity {
    /// Loads the persisted token, creating and storing a fresh one on first
    /// run. Storage failure is not fatal: the session proceeds with an
    /// ephemeral token.
    pub fn load_or_create() -> Self {
        match data_dir().and_then(|dir| load_or_create_in(&dir)) {
            Ok(token) => Self {
                token,
                persisted: true,
            },
            Err(err) => {
                warn!("identity storage unavailable, using ephemeral token: {err}");
                Self {
                    token: new_token(),
                    persisted: false,
                }
            }
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }
}

fn data_dir() -> Result<PathBuf, StorageError> {
    dirs::data_dir()
        .map(|dir| dir.join("pixelboard"))
        .ok_or(StorageError::NoDataDir)
}

fn load_or_create_in(dir: &Path) -> Result<String, StorageError> {
    let path = dir.join(TOKEN_FILE);
    if let Ok(contents) = fs::read_to_string(&path) {
        let token = contents.trim();
        if !token.is_empty() {
            return Ok(token.to_string());
        }
    }
    let token = new_token();
    fs::create_dir_all(dir)?;
    fs::write(&path, &token)?;
    Ok(token)
}

fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn token_is_created_once_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let first = load_or_create_in(dir.path()).unwrap();
        let second = load_or_create_in(dir.path()).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn blank_token_file_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TOKEN_FILE), "  \n").unwrap();
        let token = load_or_create_in(dir.path()).unwrap();
        assert!(!token.trim().is_empty());
    }

    #[test]
    fn unwritable_dir_falls_back_to_ephemeral() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the directory should be makes create_dir_all fail.
        let blocked = dir.path().join("blocked");
        fs::write(&blocked, b"not a dir").unwrap();
        let err = load_or_create_in(&blocked).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
