//! Credential persistence: the access token, refresh token and cached profile,
//! stored together as one JSON document.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::models::UserProfile;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

impl Credentials {
    pub fn has_tokens(&self) -> bool {
        self.access_token.is_some() || self.refresh_token.is_some()
    }
}

/// Durable storage for `Credentials`. Implementations only store; the session
/// store decides what to write and when.
pub trait CredentialBackend: Send + Sync {
    fn load(&self) -> Result<Credentials, ClientError>;
    fn save(&self, credentials: &Credentials) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

#[derive(Debug, Default)]
pub struct MemoryCredentialBackend {
    stored: Mutex<Credentials>,
}

impl MemoryCredentialBackend {
    pub fn new(initial: Credentials) -> Self {
        Self {
            stored: Mutex::new(initial),
        }
    }
}

impl CredentialBackend for MemoryCredentialBackend {
    fn load(&self) -> Result<Credentials, ClientError> {
        Ok(self
            .stored
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, credentials: &Credentials) -> Result<(), ClientError> {
        *self
            .stored
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = credentials.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.save(&Credentials::default())
    }
}

/// JSON file backend. Writes go to a uniquely named temp file that is renamed
/// over the target, so a reader never sees a partial document.
#[derive(Debug, Clone)]
pub struct FileCredentialBackend {
    path: PathBuf,
}

impl FileCredentialBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialBackend for FileCredentialBackend {
    fn load(&self) -> Result<Credentials, ClientError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Credentials::default()),
            Err(e) => return Err(storage_error(&self.path, e)),
        };
        serde_json::from_str(&contents).map_err(|e| storage_error(&self.path, e))
    }

    fn save(&self, credentials: &Credentials) -> Result<(), ClientError> {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| storage_error(parent, e))?;
        }

        let json = serde_json::to_string_pretty(credentials).map_err(|e| storage_error(&self.path, e))?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, json).map_err(|e| storage_error(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| storage_error(&self.path, e))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&self.path, e)),
        }
    }
}

fn storage_error(path: &Path, e: impl std::fmt::Display) -> ClientError {
    ClientError::Storage(format!("{}: {e}", path.display()))
}
