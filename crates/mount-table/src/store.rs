//! Mount registry storage trait and types
//!
//! A mount registry lets bindings outlive a single process. Credential values
//! are never written; only the secret references needed to re-resolve them.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parquet_mount_secrets::CredentialRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::MountPoint;

/// A mount binding as persisted in a registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMount {
    /// Logical path the source is mounted at
    pub mount_point: MountPoint,
    /// Source URI as given to `mount`
    pub source: String,
    /// Non-secret configuration entries
    #[serde(default)]
    pub extra_configs: BTreeMap<String, String>,
    /// Where the credential pair can be re-resolved from
    #[serde(default)]
    pub credentials: Option<CredentialRef>,
    /// When the mount was created
    pub created_at: DateTime<Utc>,
}

/// Trait for mount registry operations.
///
/// Implementations:
/// - `FilesystemMountStore` - a JSON file
/// - `NullMountStore` - nothing is persisted; mounts live for the session
#[async_trait]
pub trait MountStore: Send + Sync {
    /// Load every persisted mount
    async fn load(&self) -> Result<Vec<StoredMount>>;

    /// Replace the persisted mounts
    async fn save(&self, mounts: &[StoredMount]) -> Result<()>;
}

/// Registry that persists nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMountStore;

#[async_trait]
impl MountStore for NullMountStore {
    async fn load(&self) -> Result<Vec<StoredMount>> {
        Ok(Vec::new())
    }

    async fn save(&self, _mounts: &[StoredMount]) -> Result<()> {
        Ok(())
    }
}
