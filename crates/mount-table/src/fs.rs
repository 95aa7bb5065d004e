//! Path-level file access through the mount table

use bytes::Bytes;
use parquet_mount_file::{connect, ObjectBackend, ObjectEntry, StorageUri};
use parquet_mount_secrets::SecretStore;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{MountError, MountOutcome, MountPoint, MountRequest, MountTable, Result};

/// A path whose backend has been opened
#[derive(Clone)]
pub struct ResolvedPath {
    pub backend: Arc<dyn ObjectBackend>,
    /// Key relative to the backend root
    pub key: String,
}

impl ResolvedPath {
    pub fn display_name(&self) -> String {
        self.backend.display_key(&self.key)
    }
}

/// File operations on logical paths.
///
/// Paths under a mount point go to that mount's source. Paths carrying a
/// scheme (`s3://...`, `file:///...`) bypass the table and are opened directly
/// with default configuration.
///
/// Credentials of mounts loaded from a registry are resolved from the secret
/// store the first time a path under that mount is used.
pub struct MountFs {
    table: MountTable,
    secrets: Option<Arc<dyn SecretStore>>,
    backends: HashMap<MountPoint, Arc<dyn ObjectBackend>>,
}

impl MountFs {
    pub fn new(table: MountTable) -> Self {
        Self {
            table,
            secrets: None,
            backends: HashMap::new(),
        }
    }

    pub fn with_secrets(table: MountTable, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            secrets: Some(secrets),
            ..Self::new(table)
        }
    }

    pub fn table(&self) -> &MountTable {
        &self.table
    }

    /// Mount a source after checking it can be listed.
    ///
    /// Collisions are reported before any connection is attempted; an identical
    /// re-mount returns `AlreadyMounted` without touching the source.
    pub async fn mount(&mut self, request: MountRequest) -> Result<MountOutcome> {
        if self.table.check_request(&request)?.is_some() {
            let mount_point = MountPoint::parse(&request.mount_point)?;
            let outcome = self.table.mount_request(request).await?;
            // Reconnect on next use with the credentials just supplied
            self.backends.remove(&mount_point);
            return Ok(outcome);
        }

        let source = StorageUri::parse(&request.source).map_err(|e| MountError::InvalidSource {
            uri: request.source.clone(),
            reason: format!("{e:#}"),
        })?;
        let backend = connect(&source, &request.extra_configs).await?;
        let entries = backend.list("", false).await?;
        tracing::debug!(
            "Verified source {} ({} top-level entries)",
            request.source,
            entries.len()
        );

        let mount_point = MountPoint::parse(&request.mount_point)?;
        let outcome = self.table.mount_request(request).await?;
        self.backends.insert(mount_point, backend);
        Ok(outcome)
    }

    pub async fn unmount(&mut self, mount_point: &str) -> Result<()> {
        let binding = self.table.unmount(mount_point).await?;
        self.backends.remove(&binding.mount_point);
        Ok(())
    }

    /// Open the backend serving `path`
    pub async fn resolve(&mut self, path: &str) -> Result<ResolvedPath> {
        if path.contains("://") {
            let uri = StorageUri::parse(path).map_err(|e| MountError::InvalidSource {
                uri: path.to_string(),
                reason: format!("{e:#}"),
            })?;
            let backend = connect(&uri, &Default::default()).await?;
            return Ok(ResolvedPath {
                backend,
                key: String::new(),
            });
        }

        let (binding, key) = self.table.resolve(path)?;
        let backend = match self.backends.get(&binding.mount_point) {
            Some(backend) => backend.clone(),
            None => {
                let configs = binding.connect_configs(self.secrets.as_deref())?;
                let backend = connect(&binding.source, &configs).await?;
                self.backends
                    .insert(binding.mount_point.clone(), backend.clone());
                backend
            }
        };

        Ok(ResolvedPath { backend, key })
    }

    /// Immediate children of `path`
    pub async fn ls(&mut self, path: &str) -> Result<Vec<ObjectEntry>> {
        let resolved = self.resolve(path).await?;
        Ok(resolved.backend.list(&resolved.key, false).await?)
    }

    /// Every file below `path`
    pub async fn walk(&mut self, path: &str) -> Result<Vec<ObjectEntry>> {
        let resolved = self.resolve(path).await?;
        Ok(resolved.backend.list(&resolved.key, true).await?)
    }

    /// Contents of the file at `path`
    pub async fn read(&mut self, path: &str) -> Result<Bytes> {
        let resolved = self.resolve(path).await?;
        Ok(resolved.backend.get(&resolved.key).await?)
    }
}
