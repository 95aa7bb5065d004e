//! Environment-variable secret store

use crate::{validate_names, Result, SecretError, SecretStore};
use std::collections::BTreeMap;
use std::ffi::OsString;

/// Default variable prefix: `PARQUET_MOUNT_SECRET__<SCOPE>__<KEY>`
pub const DEFAULT_ENV_PREFIX: &str = "PARQUET_MOUNT_SECRET";

/// Build the variable name holding `key` of `scope`.
///
/// Scope and key are upper-cased; every character outside `[A-Za-z0-9]` becomes `_`.
/// `("your_secret_scope", "aws-access-key-id")` maps to
/// `PARQUET_MOUNT_SECRET__YOUR_SECRET_SCOPE__AWS_ACCESS_KEY_ID`.
pub fn env_var_name(prefix: &str, scope: &str, key: &str) -> String {
    format!("{}__{}__{}", prefix, normalize(scope), normalize(key))
}

fn normalize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Secret store reading a snapshot of environment variables.
///
/// The snapshot is taken at construction, so later changes to the process
/// environment are not observed.
#[derive(Clone)]
pub struct EnvSecretStore {
    prefix: String,
    vars: BTreeMap<String, String>,
}

impl EnvSecretStore {
    /// Snapshot the current process environment using [`DEFAULT_ENV_PREFIX`].
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_env() -> Self {
        Self::from_os_vars(DEFAULT_ENV_PREFIX, std::env::vars_os())
    }

    fn from_os_vars<I>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let marker = format!("{prefix}__");
        let vars = vars.into_iter().filter_map(|(k, v)| {
            let key = k.into_string().ok()?;
            match v.into_string() {
                Ok(value) => Some((key, value)),
                Err(_) => {
                    if key.starts_with(&marker) {
                        tracing::warn!("Skipping secret variable {key}: value is not valid UTF-8");
                    }
                    None
                }
            }
        });
        Self::from_vars(prefix, vars)
    }

    /// Build a store from explicit variables (only those under `prefix` are kept)
    pub fn from_vars<I, K, V>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let marker = format!("{prefix}__");
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k.starts_with(&marker))
            .collect();
        Self {
            prefix: prefix.to_string(),
            vars,
        }
    }

    fn scope_exists(&self, scope: &str) -> bool {
        let scope_prefix = format!("{}__{}__", self.prefix, normalize(scope));
        self.vars.keys().any(|k| k.starts_with(&scope_prefix))
    }
}

impl SecretStore for EnvSecretStore {
    fn get(&self, scope: &str, key: &str) -> Result<String> {
        validate_names(scope, key)?;

        let name = env_var_name(&self.prefix, scope, key);
        match self.vars.get(&name) {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            _ if !self.scope_exists(scope) => Err(SecretError::scope_not_found(scope)),
            _ => Err(SecretError::key_not_found(scope, key)),
        }
    }

    fn describe(&self) -> String {
        format!("environment ({}__*)", self.prefix)
    }
}
