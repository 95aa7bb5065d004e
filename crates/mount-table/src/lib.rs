//! Mount table for parquet-mount
//!
//! Binds object-storage sources (S3 buckets, local directories) to logical
//! absolute paths such as `/mnt/your_mount_name`, so that file operations on
//! those paths are redirected to the source.
//!
//! # Architecture
//!
//! - [`MountTable`] holds the bindings and enforces that mount points never
//!   collide. Re-mounting an identical binding is a no-op; anything else at a
//!   bound or overlapping mount point is an error.
//! - [`MountStore`] persists bindings between processes:
//!   - `FilesystemMountStore` - JSON registry file
//!   - `NullMountStore` - session-only mounts
//! - [`MountFs`] resolves logical paths to opened storage backends and offers
//!   `ls` / `walk` / `read`.
//!
//! Credential values are never persisted. A binding created with a
//! [`CredentialRef`](parquet_mount_secrets::CredentialRef) stores the reference,
//! and the credentials are resolved again when the registry is opened.

mod error;
mod filesystem;
mod fs;
mod mount_point;
pub mod store;
mod table;

pub use error::{MountError, Result};
pub use filesystem::FilesystemMountStore;
pub use fs::{MountFs, ResolvedPath};
pub use mount_point::{normalize_path, MountPoint};
pub use store::{MountStore, NullMountStore, StoredMount};
pub use table::{MountBinding, MountOutcome, MountRequest, MountTable};
