//! Flat key-value output store
//!
//! The produced renditions live in a single flat key space where the output
//! identifier is both the filename and the retrieval key. The store is an
//! explicit capability injected into the name resolver and transcode worker,
//! so its pre-existence checks double as the collision oracle and tests can
//! substitute an in-memory fake.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Returns true when `key` is a plain filename within the flat key space.
///
/// The store has no subdirectories, so anything with a path separator or a
/// relative component is not a valid output identifier.
pub fn is_flat_key(key: &str) -> bool {
    !key.is_empty() && !key.contains('/') && !key.contains('\\') && key != "." && key != ".."
}

/// Capability object over the flat output key space
#[async_trait]
pub trait OutputStore: Send + Sync {
    async fn exists(&self, key: &str) -> bool;
    async fn write(&self, key: &str, data: Bytes) -> Result<(), StoreError>;
    async fn read(&self, key: &str) -> Result<Option<Bytes>, StoreError>;
    /// Size in bytes of a stored entry, or None if absent
    async fn size(&self, key: &str) -> Result<Option<u64>, StoreError>;
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

// ========================================
// Filesystem store
// ========================================

/// Output store backed by one local directory
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl OutputStore for FsStore {
    async fn exists(&self, key: &str) -> bool {
        tokio::fs::try_exists(self.key_path(key)).await.unwrap_or(false)
    }

    async fn write(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        tokio::fs::write(self.key_path(key), &data).await?;
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        match tokio::fs::read(self.key_path(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn size(&self, key: &str) -> Result<Option<u64>, StoreError> {
        match tokio::fs::metadata(self.key_path(key)).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Ok(name) = entry.file_name().into_string() {
                if name.starts_with(prefix) {
                    keys.push(name);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

// ========================================
// In-memory store (test fake)
// ========================================

/// In-memory output store used by tests in place of the filesystem
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutputStore for MemoryStore {
    async fn exists(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    async fn write(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), data);
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn size(&self, key: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.entries.read().await.get(key).map(|data| data.len() as u64))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
