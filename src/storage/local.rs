//! Local filesystem storage implementation.
//!
//! Keeps one JSON document per job, written atomically, for development and
//! for CI runners that cache the state directory between runs.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── state/
//!     ├── home.json
//!     └── tickets.json
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::PersistedState;
use crate::storage::{StateStore, key_for, record_for};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    root_dir: PathBuf,
}

impl LocalStateStore {
    /// Create a new LocalStateStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a job's record.
    fn path(&self, name: &str) -> PathBuf {
        self.root_dir
            .join("state")
            .join(format!("{}.json", key_for(name)))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::store(format!("reading {}: {e}", path.display()))),
        }
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn get(&self, name: &str) -> Result<Option<PersistedState>> {
        let path = self.path(name);
        match self.read_bytes(&path).await? {
            Some(bytes) => {
                let state = serde_json::from_slice(&bytes).map_err(|e| {
                    AppError::store(format!("corrupt record {}: {e}", path.display()))
                })?;
                Ok(record_for(name, state))
            }
            None => {
                log::debug!("No stored state for {}", name);
                Ok(None)
            }
        }
    }

    async fn put(&self, state: &PersistedState) -> Result<()> {
        let path = self.path(&state.name);
        let bytes = serde_json::to_vec_pretty(state)?;
        self.write_bytes(&path, &bytes)
            .await
            .map_err(|e| AppError::store(format!("writing {}: {e}", path.display())))?;
        log::debug!("Stored state for {} at {}", state.name, path.display());
        Ok(())
    }
}
