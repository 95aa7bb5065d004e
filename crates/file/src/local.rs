//! Local filesystem backend

use crate::{join_key, ObjectBackend, ObjectEntry};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

/// Serves keys relative to a local root directory
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let key = key.trim_matches('/');
        if key.is_empty() {
            self.root.clone()
        } else {
            self.root.join(key)
        }
    }
}

#[async_trait]
impl ObjectBackend for LocalBackend {
    async fn list(&self, key: &str, recursive: bool) -> Result<Vec<ObjectEntry>> {
        let key = key.trim_matches('/');
        let path = self.path_for(key);
        let metadata = tokio::fs::metadata(&path)
            .await
            .with_context(|| format!("Path does not exist: {}", path.display()))?;

        if metadata.is_file() {
            return Ok(vec![ObjectEntry::file(key, metadata.len())]);
        }

        let results = if recursive {
            walk_directory(&path, key).await?
        } else {
            list_directory(&path, key).await?
        };

        tracing::debug!(
            "Listed {} entries in directory: {}",
            results.len(),
            path.display()
        );

        Ok(results)
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.path_for(key);
        let contents = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        Ok(Bytes::from(contents))
    }

    fn display_key(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }
}

/// List the immediate children of a directory, files and subdirectories
async fn list_directory(path: &Path, key: &str) -> Result<Vec<ObjectEntry>> {
    let mut results = Vec::new();

    let mut entries = tokio::fs::read_dir(path)
        .await
        .with_context(|| format!("Failed to read directory: {}", path.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let entry_path = entry.path();
        let metadata = entry
            .metadata()
            .await
            .with_context(|| format!("Failed to get metadata for: {}", entry_path.display()))?;
        let child = join_key(key, &entry.file_name().to_string_lossy());

        if metadata.is_dir() {
            results.push(ObjectEntry::dir(child));
        } else if metadata.is_file() {
            results.push(ObjectEntry::file(child, metadata.len()));
        }
    }

    // Sort for consistent ordering
    results.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(results)
}

/// Collect every file below a directory, at any depth
async fn walk_directory(path: &Path, key: &str) -> Result<Vec<ObjectEntry>> {
    let mut results = Vec::new();
    let mut pending = vec![(path.to_path_buf(), key.to_string())];

    while let Some((dir, dir_key)) = pending.pop() {
        for entry in list_directory(&dir, &dir_key).await? {
            if entry.is_dir {
                let child_path = dir.join(entry.name());
                pending.push((child_path, entry.key));
            } else {
                results.push(entry);
            }
        }
    }

    results.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(results)
}
