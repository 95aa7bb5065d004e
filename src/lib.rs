//! parquet-mount library
//!
//! Mounts object storage at logical paths using credentials from a secret
//! store, then loads partitioned Parquet datasets from those paths.
//!
//! # Pipeline
//!
//! 1. Secret resolution: two lookups (access key id, secret access key) in a
//!    named scope of a [`SecretStore`](secrets::SecretStore)
//! 2. Mount: bind `s3a://<bucket>` at the mount point, passing the credentials
//!    as `fs.s3a.*` configuration
//! 3. Read: load every Parquet file under `<mount point>/<input path>` and
//!    display it
//!
//! # Crates
//!
//! - `parquet_mount_secrets` - environment, file and in-memory secret stores
//! - `parquet_mount_file` - local and S3 storage backends
//! - `parquet_mount_table` - mount table, registry and path resolution
//! - `parquet_mount_parquet_source` - partitioned Parquet reader and display
//!
//! # CLI Usage
//!
//! ```bash
//! # The whole pipeline with placeholder overrides
//! parquet-mount run --bucket my-bucket --mount-name /mnt/my_mount \
//!   --secret-scope my_scope --input-path events
//!
//! # Step by step
//! parquet-mount mount --config job.toml
//! parquet-mount ls /mnt/my_mount/events
//! parquet-mount read /mnt/my_mount/events --expect-partitions year,month,day
//! parquet-mount unmount /mnt/my_mount
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

pub mod config;
pub mod pipeline;

// Re-export workspace crates for convenience
pub use parquet_mount_file as file;
pub use parquet_mount_parquet_source as parquet_source;
pub use parquet_mount_secrets as secrets;
pub use parquet_mount_table as mount;

use parquet_mount_secrets::{EnvSecretStore, FileSecretStore, SecretStore};
use parquet_mount_table::{FilesystemMountStore, MountFs, MountTable};

/// Where secrets and mounts are kept
#[derive(Parser, Clone, Debug)]
pub struct StateOpts {
    /// TOML secrets file ([scope] key = "value"); environment variables
    /// PARQUET_MOUNT_SECRET__<SCOPE>__<KEY> are used when absent
    #[arg(long, value_name = "PATH", env = "PARQUET_MOUNT_SECRETS_FILE", global = true)]
    pub secrets_file: Option<PathBuf>,

    /// Mount registry file
    #[arg(
        long,
        value_name = "PATH",
        default_value = ".parquet-mount/mounts.json",
        env = "PARQUET_MOUNT_REGISTRY",
        global = true
    )]
    pub registry: PathBuf,
}

impl StateOpts {
    pub fn open_secret_store(&self) -> anyhow::Result<Arc<dyn SecretStore>> {
        let store: Arc<dyn SecretStore> = match &self.secrets_file {
            Some(path) => Arc::new(FileSecretStore::open(path)?),
            None => Arc::new(EnvSecretStore::from_env()),
        };
        tracing::debug!("Using secret store: {}", store.describe());
        Ok(store)
    }

    /// Open the registry; with `secrets`, a persisted mount's credentials are
    /// resolved when a path under it is first used
    pub async fn open_mount_fs(
        &self,
        secrets: Option<Arc<dyn SecretStore>>,
    ) -> anyhow::Result<MountFs> {
        let store = FilesystemMountStore::new(&self.registry);
        let table = MountTable::open(Box::new(store)).await?;
        Ok(match secrets {
            Some(secrets) => MountFs::with_secrets(table, secrets),
            None => MountFs::new(table),
        })
    }
}
