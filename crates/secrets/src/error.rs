//! Error types for secret lookups.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving a secret.
///
/// Messages name the scope and key but never the secret value.
#[derive(Error, Debug)]
pub enum SecretError {
    /// The scope does not exist in the store.
    #[error("Secret scope '{scope}' does not exist")]
    ScopeNotFound { scope: String },

    /// The scope exists but holds no (non-empty) value for the key.
    #[error("Secret '{key}' does not exist in scope '{scope}'")]
    KeyNotFound { scope: String, key: String },

    /// The caller is not allowed to read the secret.
    #[error("Permission denied reading {resource}")]
    PermissionDenied { resource: String },

    /// Scope or key name is empty.
    #[error("Invalid secret {kind} name: '{name}'")]
    InvalidName { kind: &'static str, name: String },

    /// The backing secrets file could not be read.
    #[error("Failed to read secrets file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing secrets file is not valid TOML.
    #[error("Failed to parse secrets file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl SecretError {
    pub(crate) fn key_not_found(scope: &str, key: &str) -> Self {
        SecretError::KeyNotFound {
            scope: scope.to_string(),
            key: key.to_string(),
        }
    }

    pub(crate) fn scope_not_found(scope: &str) -> Self {
        SecretError::ScopeNotFound {
            scope: scope.to_string(),
        }
    }
}
