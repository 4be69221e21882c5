//! Durable session identifier
//!
//! One identifier per storage scope (a directory), created on first use and
//! reused for as long as the directory survives. The backend keys its
//! conversation history on this value.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

const SESSION_FILE: &str = "session_id";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not determine a storage directory")]
    NoStorageDir,
    #[error("session storage unavailable at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the per-user data directory (`~/.local/share/chatline` on Linux).
    pub fn default_scope() -> Result<Self, SessionError> {
        let data_dir = dirs::data_dir().ok_or(SessionError::NoStorageDir)?;
        Ok(Self::new(data_dir.join("chatline")))
    }

    fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    /// Return the persisted session id, creating and persisting one if the
    /// scope has none yet.
    pub fn get_or_create_session_id(&self) -> Result<String, SessionError> {
        let path = self.path();

        if let Some(existing) = self.read_existing()? {
            return Ok(existing);
        }

        fs::create_dir_all(&self.dir).map_err(|source| SessionError::Storage {
            path: self.dir.clone(),
            source,
        })?;

        let session_id = Uuid::new_v4().to_string();

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(session_id.as_bytes())
                    .map_err(|source| SessionError::Storage { path: path.clone(), source })?;
                tracing::info!(session_id = %session_id, path = %path.display(), "Created new session");
                Ok(session_id)
            }
            // Another process created it between our read and our create
            Err(e) if e.kind() == ErrorKind::AlreadyExists => match self.read_existing()? {
                Some(existing) => Ok(existing),
                None => self.overwrite(&path, session_id),
            },
            Err(source) => Err(SessionError::Storage { path, source }),
        }
    }

    fn read_existing(&self) -> Result<Option<String>, SessionError> {
        let path = self.path();
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let trimmed = contents.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(trimmed.to_string()))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SessionError::Storage { path, source }),
        }
    }

    /// Replace a blank session file.
    fn overwrite(&self, path: &Path, session_id: String) -> Result<String, SessionError> {
        fs::write(path, &session_id).map_err(|source| SessionError::Storage {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::warn!(path = %path.display(), "Replaced blank session file");
        Ok(session_id)
    }
}
