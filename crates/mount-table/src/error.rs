//! Error types for mount operations.

use parquet_mount_secrets::SecretError;
use thiserror::Error;

/// Errors that can occur while mounting, unmounting or resolving paths.
#[derive(Error, Debug)]
pub enum MountError {
    /// Mount point is not a usable absolute path.
    #[error("Invalid mount point '{mount_point}': {reason}")]
    InvalidMountPoint { mount_point: String, reason: String },

    /// Mount point already bound to a different source or configuration.
    #[error("Directory already mounted: {mount_point} (source: {existing_source})")]
    AlreadyMounted {
        mount_point: String,
        existing_source: String,
    },

    /// Mount point is nested inside, or contains, another mount point.
    #[error("Mount point {mount_point} overlaps existing mount {existing}")]
    Overlapping {
        mount_point: String,
        existing: String,
    },

    /// No mount covers the path.
    #[error("No mount covers path: {path}")]
    NotMounted { path: String },

    /// Source URI could not be parsed or configured.
    #[error("Invalid mount source '{uri}': {reason}")]
    InvalidSource { uri: String, reason: String },

    /// A credential option has no secret reference to re-resolve it from.
    #[error("{option} for {mount_point} is not covered by the secret reference and would not survive a restart")]
    UnreferencedSecret { mount_point: String, option: String },

    /// Credentials for a persisted mount could not be resolved.
    #[error("Failed to resolve credentials: {0}")]
    Credentials(#[from] SecretError),

    /// Storage or registry failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MountError>;
