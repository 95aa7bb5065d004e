//! Object storage backends for reading from the local filesystem or S3
//!
//! This crate provides a uniform [`ObjectBackend`] interface over a storage root,
//! with recursive listing so partitioned datasets can be discovered.
//!
//! # Source URIs
//!
//! - `s3://bucket/prefix`, `s3a://bucket`, `s3n://bucket`: S3 buckets (optionally under a prefix)
//! - `file:///data/dir` or a bare path: a local directory
//!
//! # Keys
//!
//! Keys are relative to the backend root, `/` separated, without a leading `/`.
//! The empty key names the root itself.
//!
//! # Example
//!
//! ```ignore
//! use parquet_mount_file::{connect, StorageUri};
//!
//! let uri = StorageUri::parse("s3a://my-bucket")?;
//! let backend = connect(&uri, &configs).await?;
//! for entry in backend.list("events/", true).await? {
//!     let bytes = backend.get(&entry.key).await?;
//!     // Decode bytes...
//! }
//! ```

mod local;
mod options;
mod s3;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub use local::LocalBackend;
pub use options::{
    is_secret_option, S3Options, ACCESS_KEY_OPTION, ENDPOINT_OPTION, PATH_STYLE_OPTION,
    REGION_OPTION, SECRET_KEY_OPTION, SESSION_TOKEN_OPTION,
};
pub use s3::S3Backend;

/// Parsed location of a storage root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageUri {
    /// Local directory
    Local(PathBuf),
    /// S3 bucket, optionally narrowed to a prefix (no leading or trailing `/`)
    S3 {
        scheme: String,
        bucket: String,
        prefix: String,
    },
}

impl StorageUri {
    /// Parse a URI, auto-detecting the storage type
    ///
    /// - `s3://`, `s3a://`, `s3n://` -> S3
    /// - `file://` -> Local (path must be absolute)
    /// - Everything else -> Local
    pub fn parse(uri: &str) -> Result<Self> {
        for scheme in ["s3", "s3a", "s3n"] {
            if let Some(rest) = uri.strip_prefix(&format!("{scheme}://")) {
                let (bucket, prefix) = parse_s3_location(rest)
                    .with_context(|| format!("Invalid S3 URI: {uri}"))?;
                return Ok(StorageUri::S3 {
                    scheme: scheme.to_string(),
                    bucket,
                    prefix,
                });
            }
        }

        if let Some(path) = uri.strip_prefix("file://") {
            let path = PathBuf::from(path);
            if !path.is_absolute() {
                anyhow::bail!("file:// URI must hold an absolute path: {uri}");
            }
            return Ok(StorageUri::Local(path));
        }

        if uri.contains("://") {
            anyhow::bail!("Unsupported storage URI scheme: {uri}");
        }

        if uri.is_empty() {
            anyhow::bail!("Storage URI must not be empty");
        }

        Ok(StorageUri::Local(PathBuf::from(uri)))
    }

    /// Whether this URI points at S3
    pub fn is_s3(&self) -> bool {
        matches!(self, StorageUri::S3 { .. })
    }
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageUri::Local(path) => write!(f, "file://{}", path.display()),
            StorageUri::S3 {
                scheme,
                bucket,
                prefix,
            } if prefix.is_empty() => write!(f, "{scheme}://{bucket}"),
            StorageUri::S3 {
                scheme,
                bucket,
                prefix,
            } => write!(f, "{scheme}://{bucket}/{prefix}"),
        }
    }
}

/// Split `bucket/prefix/...` into bucket and trimmed prefix
fn parse_s3_location(rest: &str) -> Result<(String, String)> {
    let (bucket, prefix) = match rest.split_once('/') {
        Some((bucket, prefix)) => (bucket, prefix.trim_matches('/')),
        None => (rest, ""),
    };
    if bucket.is_empty() {
        anyhow::bail!("S3 URI must name a bucket, e.g. 's3://bucket/prefix'");
    }
    Ok((bucket.to_string(), prefix.to_string()))
}

/// A single listed object or directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Key relative to the backend root
    pub key: String,
    /// Size in bytes (None for directories)
    pub size: Option<u64>,
    /// Whether this entry is a directory (or S3 common prefix)
    pub is_dir: bool,
}

impl ObjectEntry {
    pub fn file(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size: Some(size),
            is_dir: false,
        }
    }

    pub fn dir(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: None,
            is_dir: true,
        }
    }

    /// Last path segment of the key
    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Read access to a storage root.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// List entries under `key`.
    ///
    /// If `key` names a single object, that object is returned alone.
    /// With `recursive` only files are returned, at any depth; otherwise the
    /// immediate children (files and directories) are returned.
    /// Fails if nothing exists at `key`.
    async fn list(&self, key: &str, recursive: bool) -> Result<Vec<ObjectEntry>>;

    /// Fetch the full contents of an object
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Human-readable location of `key`, for logging and errors
    fn display_key(&self, key: &str) -> String;
}

/// Open a backend for `uri`, configured from Hadoop-style `configs`
pub async fn connect(
    uri: &StorageUri,
    configs: &BTreeMap<String, String>,
) -> Result<Arc<dyn ObjectBackend>> {
    match uri {
        StorageUri::Local(path) => {
            if !configs.is_empty() {
                tracing::warn!(
                    "Ignoring {} configuration entries for local source {}",
                    configs.len(),
                    path.display()
                );
            }
            Ok(Arc::new(LocalBackend::new(path.clone())))
        }
        StorageUri::S3 { bucket, prefix, .. } => {
            let options = S3Options::from_configs(configs)?;
            let backend = S3Backend::connect(bucket, prefix, &options).await?;
            Ok(Arc::new(backend))
        }
    }
}

/// Join two key fragments with a single `/`
pub fn join_key(base: &str, rest: &str) -> String {
    let base = base.trim_matches('/');
    let rest = rest.trim_matches('/');
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{base}/{rest}"),
    }
}
