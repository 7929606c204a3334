//! File-backed KV store: one JSON document per key.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::KvStore;
use crate::error::{Result, StoreError};

// == File KV ==
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    /// Stores values under `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\', '.']) {
            return Err(StoreError::InvalidArgument(format!(
                "unsupported storage key '{}'",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KvStore for FileKv {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Persistence(format!(
                "reading {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&value)?;

        fs::create_dir_all(&self.dir).await.map_err(|e| {
            StoreError::Persistence(format!("creating {}: {}", self.dir.display(), e))
        })?;
        let write_failed = |e: std::io::Error| {
            StoreError::Persistence(format!("writing {}: {}", tmp.display(), e))
        };
        let mut file = fs::File::create(&tmp).await.map_err(write_failed)?;
        file.write_all(&bytes).await.map_err(write_failed)?;
        // Contents must be on disk before the rename can publish them
        file.sync_all().await.map_err(write_failed)?;
        drop(file);

        fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::Persistence(format!("replacing {}: {}", path.display(), e)))?;
        sync_dir(&self.dir).await?;

        debug!("Persisted {}", path.display());
        Ok(())
    }
}

/// Flushes the directory entry so the rename itself survives a crash.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<()> {
    let sync_failed = |e: std::io::Error| {
        StoreError::Persistence(format!("syncing {}: {}", dir.display(), e))
    };
    let handle = fs::File::open(dir).await.map_err(sync_failed)?;
    handle.sync_all().await.map_err(sync_failed)
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
