//! In-memory secret store

use crate::{validate_names, Result, SecretError, SecretStore};
use std::collections::{BTreeMap, BTreeSet};

/// Secret store backed by a map of scopes.
///
/// Individual secrets can be marked as denied to model a store that refuses
/// access to the caller.
#[derive(Debug, Default, Clone)]
pub struct InMemorySecretStore {
    scopes: BTreeMap<String, BTreeMap<String, String>>,
    denied: BTreeSet<(String, String)>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a secret
    pub fn insert(&mut self, scope: &str, key: &str, value: &str) {
        self.scopes
            .entry(scope.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Make `get(scope, key)` fail with `PermissionDenied`
    pub fn deny(&mut self, scope: &str, key: &str) {
        self.denied.insert((scope.to_string(), key.to_string()));
    }

    pub(crate) fn from_scopes(scopes: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        Self {
            scopes,
            denied: BTreeSet::new(),
        }
    }

    pub(crate) fn lookup(&self, scope: &str, key: &str) -> Result<String> {
        validate_names(scope, key)?;

        if self
            .denied
            .contains(&(scope.to_string(), key.to_string()))
        {
            return Err(SecretError::PermissionDenied {
                resource: format!("secret '{key}' in scope '{scope}'"),
            });
        }

        let entries = self
            .scopes
            .get(scope)
            .ok_or_else(|| SecretError::scope_not_found(scope))?;

        match entries.get(key) {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            _ => Err(SecretError::key_not_found(scope, key)),
        }
    }
}

impl SecretStore for InMemorySecretStore {
    fn get(&self, scope: &str, key: &str) -> Result<String> {
        self.lookup(scope, key)
    }

    fn describe(&self) -> String {
        format!("in-memory store ({} scopes)", self.scopes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_secret() {
        let mut store = InMemorySecretStore::new();
        store.insert("scope", "key", "value");
        store.deny("scope", "key");

        let err = store.get("scope", "key").unwrap_err();
        assert!(matches!(err, SecretError::PermissionDenied { .. }));
    }

    #[test]
    fn test_empty_value_is_missing() {
        let mut store = InMemorySecretStore::new();
        store.insert("scope", "key", "");

        let err = store.get("scope", "key").unwrap_err();
        assert!(matches!(err, SecretError::KeyNotFound { .. }));
    }

    #[test]
    fn test_empty_names_rejected() {
        let store = InMemorySecretStore::new();
        assert!(matches!(
            store.get("", "key"),
            Err(SecretError::InvalidName { kind: "scope", .. })
        ));
        assert!(matches!(
            store.get("scope", " "),
            Err(SecretError::InvalidName { kind: "key", .. })
        ));
    }
}
