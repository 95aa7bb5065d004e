//! Filesystem-based mount registry implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::store::{MountStore, StoredMount};

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    mounts: Vec<StoredMount>,
}

/// Filesystem implementation of the MountStore trait.
///
/// Stores all mounts as one pretty-printed JSON file, rewritten on every change.
pub struct FilesystemMountStore {
    path: PathBuf,
}

impl FilesystemMountStore {
    /// Create a new FilesystemMountStore backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the registry file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl MountStore for FilesystemMountStore {
    async fn load(&self) -> Result<Vec<StoredMount>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read mount registry: {}", self.path.display()))?;
        let registry: RegistryFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse mount registry: {}", self.path.display()))?;

        tracing::debug!(
            "Loaded {} mounts from {}",
            registry.mounts.len(),
            self.path.display()
        );
        Ok(registry.mounts)
    }

    async fn save(&self, mounts: &[StoredMount]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create registry directory: {}", parent.display())
                })?;
            }
        }

        let registry = RegistryFile {
            mounts: mounts.to_vec(),
        };
        tokio::fs::write(&self.path, serde_json::to_string_pretty(&registry)?)
            .await
            .with_context(|| format!("Failed to write mount registry: {}", self.path.display()))?;

        tracing::info!("Saved {} mounts to {}", mounts.len(), self.path.display());
        Ok(())
    }
}
