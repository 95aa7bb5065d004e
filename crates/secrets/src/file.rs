//! TOML file secret store

use crate::{InMemorySecretStore, Result, SecretError, SecretStore};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Secret store loaded from a TOML file with one table per scope:
///
/// ```toml
/// [your_secret_scope]
/// aws-access-key-id = "AKIA..."
/// aws-secret-access-key = "..."
/// ```
pub struct FileSecretStore {
    path: PathBuf,
    inner: InMemorySecretStore,
}

impl FileSecretStore {
    /// Read and parse the secrets file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::PermissionDenied {
                SecretError::PermissionDenied {
                    resource: format!("secrets file {}", path.display()),
                }
            } else {
                SecretError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let scopes: BTreeMap<String, BTreeMap<String, String>> =
            toml::from_str(&contents).map_err(|source| SecretError::Parse {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(
            "Loaded {} secret scopes from {}",
            scopes.len(),
            path.display()
        );

        Ok(Self {
            path,
            inner: InMemorySecretStore::from_scopes(scopes),
        })
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, scope: &str, key: &str) -> Result<String> {
        self.inner.lookup(scope, key)
    }

    fn describe(&self) -> String {
        format!("secrets file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secrets.toml");
        std::fs::write(
            &path,
            "[your_secret_scope]\naws-access-key-id = \"AKIAEXAMPLE\"\naws-secret-access-key = \"wJalrXUtnFEMI\"\n",
        )
        .unwrap();

        let store = FileSecretStore::open(&path).unwrap();
        assert_eq!(
            store.get("your_secret_scope", "aws-access-key-id").unwrap(),
            "AKIAEXAMPLE"
        );
        assert!(matches!(
            store.get("your_secret_scope", "missing"),
            Err(SecretError::KeyNotFound { .. })
        ));
        assert!(matches!(
            store.get("nope", "aws-access-key-id"),
            Err(SecretError::ScopeNotFound { .. })
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let result = FileSecretStore::open("/nonexistent/secrets.toml");
        assert!(matches!(result, Err(SecretError::Io { .. })));
    }

    #[test]
    fn test_open_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secrets.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        let result = FileSecretStore::open(&path);
        assert!(matches!(result, Err(SecretError::Parse { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_is_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secrets.toml");
        std::fs::write(&path, "[scope]\nkey = \"value\"\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores file modes, so there is nothing to check there
        if std::fs::read(&path).is_ok() {
            return;
        }

        let result = FileSecretStore::open(&path);
        match result {
            Err(SecretError::PermissionDenied { resource }) => {
                assert!(resource.contains("secrets.toml"));
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected PermissionDenied"),
        }
    }
}
