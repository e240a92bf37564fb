//! JSON file storage for the active session.
//!
//! The session is written as a small envelope (`{"saved_at": ..., "session": ...}`)
//! to a single file. Writes go through a sibling temp file and a rename so a
//! crash mid-write never leaves a truncated session behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use tradedesk_core::{Session, SessionStorage, StorageError};

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    saved_at: DateTime<Utc>,
    session: Session,
}

/// Stores the session as JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileSessionStorage {
    path: PathBuf,
}

impl JsonFileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionStorage for JsonFileSessionStorage {
    async fn load(&self) -> Result<Option<Session>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No persisted session");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let persisted: PersistedSession = serde_json::from_slice(&bytes)?;
        debug!(
            path = %self.path.display(),
            user_id = %persisted.session.user_id,
            saved_at = %persisted.saved_at,
            "Loaded persisted session"
        );
        Ok(Some(persisted.session))
    }

    async fn save(&self, session: &Session) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let persisted = PersistedSession {
            saved_at: Utc::now(),
            session: session.clone(),
        };
        let json = serde_json::to_vec_pretty(&persisted)?;

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &json).await?;
        // The file holds a bearer token: owner read/write only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), user_id = %session.user_id, "Saved session");
        Ok(())
    }

    async fn remove(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Removed persisted session");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
