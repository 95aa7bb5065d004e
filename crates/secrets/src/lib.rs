//! Secret store abstraction for parquet-mount
//!
//! Credentials used to mount object storage are never configured inline. They are
//! looked up by `(scope, key)` from a [`SecretStore`], which hides where the secret
//! actually lives.
//!
//! # Stores
//!
//! - [`EnvSecretStore`]: `PARQUET_MOUNT_SECRET__<SCOPE>__<KEY>` environment variables
//! - [`FileSecretStore`]: a TOML file with one table per scope
//! - [`InMemorySecretStore`]: a plain map, for embedding and tests
//!
//! # Example
//!
//! ```ignore
//! use parquet_mount_secrets::{resolve_credentials, CredentialRef, EnvSecretStore};
//!
//! let store = EnvSecretStore::from_env();
//! let reference = CredentialRef::new("my_scope", "aws-access-key-id", "aws-secret-access-key");
//! let credentials = resolve_credentials(&store, &reference)?;
//! ```

mod env;
mod error;
mod file;
mod memory;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use env::{env_var_name, EnvSecretStore, DEFAULT_ENV_PREFIX};
pub use error::SecretError;
pub use file::FileSecretStore;
pub use memory::InMemorySecretStore;

/// Result alias for secret lookups
pub type Result<T> = std::result::Result<T, SecretError>;

/// A named-scope key/value secret store.
pub trait SecretStore: Send + Sync {
    /// Return the secret stored under `key` in `scope`.
    ///
    /// Fails if the scope or key does not exist, or the caller may not read it.
    fn get(&self, scope: &str, key: &str) -> Result<String>;

    /// Short description of the backend, for logging.
    fn describe(&self) -> String;
}

impl<S: SecretStore + ?Sized> SecretStore for Box<S> {
    fn get(&self, scope: &str, key: &str) -> Result<String> {
        (**self).get(scope, key)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Names of the secrets that make up an object-storage credential pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRef {
    pub scope: String,
    pub access_key_name: String,
    pub secret_key_name: String,
    /// Session token of temporary credentials, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token_name: Option<String>,
}

impl CredentialRef {
    pub fn new(
        scope: impl Into<String>,
        access_key_name: impl Into<String>,
        secret_key_name: impl Into<String>,
    ) -> Self {
        Self {
            scope: scope.into(),
            access_key_name: access_key_name.into(),
            secret_key_name: secret_key_name.into(),
            session_token_name: None,
        }
    }

    pub fn with_session_token(mut self, session_token_name: impl Into<String>) -> Self {
        self.session_token_name = Some(session_token_name.into());
        self
    }
}

/// Access key id and secret access key, plus a session token for temporary
/// credentials.
///
/// `Debug` is redacted so the pair can sit inside logged structures.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl CredentialPair {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_key_id", &"<redacted>")
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Resolve both halves of a credential pair, access key first, then the
/// session token when the reference names one.
///
/// The first failing lookup aborts; later ones are not attempted.
pub fn resolve_credentials(
    store: &dyn SecretStore,
    reference: &CredentialRef,
) -> Result<CredentialPair> {
    tracing::debug!(
        "Resolving credentials from scope '{}' via {}",
        reference.scope,
        store.describe()
    );
    let access_key_id = store.get(&reference.scope, &reference.access_key_name)?;
    let secret_access_key = store.get(&reference.scope, &reference.secret_key_name)?;
    let pair = CredentialPair::new(access_key_id, secret_access_key);
    match &reference.session_token_name {
        Some(name) => Ok(pair.with_session_token(store.get(&reference.scope, name)?)),
        None => Ok(pair),
    }
}

pub(crate) fn validate_names(scope: &str, key: &str) -> Result<()> {
    if scope.trim().is_empty() {
        return Err(SecretError::InvalidName {
            kind: "scope",
            name: scope.to_string(),
        });
    }
    if key.trim().is_empty() {
        return Err(SecretError::InvalidName {
            kind: "key",
            name: key.to_string(),
        });
    }
    Ok(())
}
