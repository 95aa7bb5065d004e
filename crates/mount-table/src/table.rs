//! The mount table: logical path prefixes bound to storage sources

use chrono::{DateTime, Utc};
use parquet_mount_file::{
    is_secret_option, StorageUri, ACCESS_KEY_OPTION, SECRET_KEY_OPTION, SESSION_TOKEN_OPTION,
};
use parquet_mount_secrets::{resolve_credentials, CredentialPair, CredentialRef, SecretStore};
use std::collections::BTreeMap;
use std::fmt;

use crate::mount_point::normalize_path;
use crate::store::{MountStore, NullMountStore, StoredMount};
use crate::{MountError, MountPoint, Result};

/// Everything needed to create a mount
#[derive(Clone, Default)]
pub struct MountRequest {
    pub source: String,
    pub mount_point: String,
    pub extra_configs: BTreeMap<String, String>,
    /// Secret references behind the credential entries of `extra_configs`,
    /// persisted instead of the values
    pub credential_ref: Option<CredentialRef>,
}

impl MountRequest {
    pub fn new(source: impl Into<String>, mount_point: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            mount_point: mount_point.into(),
            ..Default::default()
        }
    }

    pub fn extra_configs(mut self, extra_configs: BTreeMap<String, String>) -> Self {
        self.extra_configs = extra_configs;
        self
    }

    /// Set s3a credential entries from a resolved pair and remember where it came from
    pub fn credentials(mut self, reference: CredentialRef, pair: &CredentialPair) -> Self {
        insert_credentials(&mut self.extra_configs, pair);
        self.credential_ref = Some(reference);
        self
    }
}

fn insert_credentials(configs: &mut BTreeMap<String, String>, pair: &CredentialPair) {
    configs.insert(ACCESS_KEY_OPTION.to_string(), pair.access_key_id().to_string());
    configs.insert(
        SECRET_KEY_OPTION.to_string(),
        pair.secret_access_key().to_string(),
    );
    if let Some(token) = pair.session_token() {
        configs.insert(SESSION_TOKEN_OPTION.to_string(), token.to_string());
    }
}

fn public_configs(configs: &BTreeMap<String, String>) -> BTreeMap<&str, &str> {
    configs
        .iter()
        .filter(|(key, _)| !is_secret_option(key))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

/// Fail if a credential option in `configs` cannot be re-resolved from `reference`
fn check_secret_coverage(
    mount_point: &MountPoint,
    configs: &BTreeMap<String, String>,
    reference: Option<&CredentialRef>,
) -> Result<()> {
    let Some(reference) = reference else {
        return Ok(());
    };
    if configs.contains_key(SESSION_TOKEN_OPTION) && reference.session_token_name.is_none() {
        return Err(MountError::UnreferencedSecret {
            mount_point: mount_point.to_string(),
            option: SESSION_TOKEN_OPTION.to_string(),
        });
    }
    Ok(())
}

impl fmt::Debug for MountRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountRequest")
            .field("source", &self.source)
            .field("mount_point", &self.mount_point)
            .field("extra_configs", &RedactedConfigs(&self.extra_configs))
            .field("credential_ref", &self.credential_ref)
            .finish()
    }
}

/// Result of a successful mount call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// A new binding was created
    Created,
    /// An identical binding already existed; nothing changed
    AlreadyMounted,
}

/// A logical path prefix bound to a storage source
#[derive(Clone)]
pub struct MountBinding {
    pub mount_point: MountPoint,
    pub source: StorageUri,
    pub source_uri: String,
    pub extra_configs: BTreeMap<String, String>,
    pub credential_ref: Option<CredentialRef>,
    pub created_at: DateTime<Utc>,
}

impl MountBinding {
    /// Whether a request would create exactly this binding.
    ///
    /// Credential values are not compared: they come from the secret
    /// reference, which is.
    fn matches(
        &self,
        source: &StorageUri,
        extra_configs: &BTreeMap<String, String>,
        credential_ref: Option<&CredentialRef>,
    ) -> bool {
        &self.source == source
            && public_configs(&self.extra_configs) == public_configs(extra_configs)
            && self.credential_ref.as_ref() == credential_ref
    }

    /// Backend configuration for connecting to the source.
    ///
    /// A binding loaded from a registry carries only its secret reference; the
    /// credentials are resolved here, through `secrets`, when needed.
    pub fn connect_configs(
        &self,
        secrets: Option<&dyn SecretStore>,
    ) -> Result<BTreeMap<String, String>> {
        let mut configs = self.extra_configs.clone();
        let Some(reference) = &self.credential_ref else {
            return Ok(configs);
        };
        if configs.contains_key(ACCESS_KEY_OPTION) {
            return Ok(configs);
        }

        match secrets {
            Some(secrets) => {
                let pair = resolve_credentials(secrets, reference)?;
                insert_credentials(&mut configs, &pair);
            }
            None => tracing::debug!(
                "No secret store for {}; connecting without credentials",
                self.mount_point
            ),
        }
        Ok(configs)
    }

    fn to_stored(&self) -> StoredMount {
        let extra_configs: BTreeMap<String, String> = self
            .extra_configs
            .iter()
            .filter(|(key, _)| !is_secret_option(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if extra_configs.len() != self.extra_configs.len() && self.credential_ref.is_none() {
            tracing::warn!(
                "Mount {} has inline credentials without a secret reference; they will not be persisted",
                self.mount_point
            );
        }

        StoredMount {
            mount_point: self.mount_point.clone(),
            source: self.source_uri.clone(),
            extra_configs,
            credentials: self.credential_ref.clone(),
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for MountBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountBinding")
            .field("mount_point", &self.mount_point)
            .field("source", &self.source_uri)
            .field("extra_configs", &RedactedConfigs(&self.extra_configs))
            .field("credential_ref", &self.credential_ref)
            .field("created_at", &self.created_at)
            .finish()
    }
}

struct RedactedConfigs<'a>(&'a BTreeMap<String, String>);

impl fmt::Debug for RedactedConfigs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(k, v)| {
                if is_secret_option(k) {
                    (k.as_str(), "<redacted>")
                } else {
                    (k.as_str(), v.as_str())
                }
            }))
            .finish()
    }
}

/// Bindings from mount points to sources.
///
/// Mount points never overlap: a new mount point may not equal, contain or
/// lie inside an existing one. Re-mounting an identical binding is a no-op.
pub struct MountTable {
    mounts: BTreeMap<MountPoint, MountBinding>,
    store: Box<dyn MountStore>,
}

impl Default for MountTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MountTable {
    /// Empty table whose mounts last for the session only
    pub fn new() -> Self {
        Self {
            mounts: BTreeMap::new(),
            store: Box::new(NullMountStore),
        }
    }

    /// Load a table from a registry.
    ///
    /// Bindings come back with their secret references only; see
    /// [`MountBinding::connect_configs`].
    pub async fn open(store: Box<dyn MountStore>) -> Result<Self> {
        let mut mounts = BTreeMap::new();

        for stored in store.load().await? {
            let source = parse_source(&stored.source)?;
            let binding = MountBinding {
                mount_point: stored.mount_point.clone(),
                source,
                source_uri: stored.source,
                extra_configs: stored.extra_configs,
                credential_ref: stored.credentials,
                created_at: stored.created_at,
            };
            mounts.insert(stored.mount_point, binding);
        }

        Ok(Self { mounts, store })
    }

    /// Bind `source` at `mount_point` with backend configuration `extra_configs`
    pub async fn mount(
        &mut self,
        source: &str,
        mount_point: &str,
        extra_configs: BTreeMap<String, String>,
    ) -> Result<MountOutcome> {
        self.mount_request(MountRequest::new(source, mount_point).extra_configs(extra_configs))
            .await
    }

    /// Create the binding described by `request`
    ///
    /// - identical binding already present: `Ok(MountOutcome::AlreadyMounted)`;
    ///   credential values carried by the request replace the binding's
    /// - mount point bound differently: `MountError::AlreadyMounted`
    /// - mount point overlapping another: `MountError::Overlapping`
    pub async fn mount_request(&mut self, request: MountRequest) -> Result<MountOutcome> {
        let mount_point = MountPoint::parse(&request.mount_point)?;
        let source = parse_source(&request.source)?;

        if let Some(outcome) = self.check(&mount_point, &source, &request)? {
            tracing::info!("{} is already mounted from {}", mount_point, request.source);
            let carries_secrets = request.extra_configs.keys().any(|key| is_secret_option(key));
            if let (true, Some(existing)) = (carries_secrets, self.mounts.get_mut(&mount_point)) {
                existing.extra_configs.retain(|key, _| !is_secret_option(key));
                existing.extra_configs.extend(
                    request
                        .extra_configs
                        .into_iter()
                        .filter(|(key, _)| is_secret_option(key)),
                );
            }
            return Ok(outcome);
        }

        let binding = MountBinding {
            mount_point: mount_point.clone(),
            source,
            source_uri: request.source,
            extra_configs: request.extra_configs,
            credential_ref: request.credential_ref,
            created_at: Utc::now(),
        };
        tracing::info!("Mounted {} at {}", binding.source_uri, mount_point);
        self.mounts.insert(mount_point.clone(), binding);

        if let Err(e) = self.persist().await {
            self.mounts.remove(&mount_point);
            return Err(e);
        }
        Ok(MountOutcome::Created)
    }

    /// Check a prospective binding against the table without changing it.
    ///
    /// `Ok(Some(AlreadyMounted))` for an identical binding, `Ok(None)` when the
    /// mount point is free.
    pub fn check_request(&self, request: &MountRequest) -> Result<Option<MountOutcome>> {
        let mount_point = MountPoint::parse(&request.mount_point)?;
        let source = parse_source(&request.source)?;
        self.check(&mount_point, &source, request)
    }

    fn check(
        &self,
        mount_point: &MountPoint,
        source: &StorageUri,
        request: &MountRequest,
    ) -> Result<Option<MountOutcome>> {
        check_secret_coverage(
            mount_point,
            &request.extra_configs,
            request.credential_ref.as_ref(),
        )?;

        if let Some(existing) = self.mounts.get(mount_point) {
            if existing.matches(
                source,
                &request.extra_configs,
                request.credential_ref.as_ref(),
            ) {
                return Ok(Some(MountOutcome::AlreadyMounted));
            }
            return Err(MountError::AlreadyMounted {
                mount_point: mount_point.to_string(),
                existing_source: existing.source_uri.clone(),
            });
        }

        if let Some(existing) = self.mounts.keys().find(|mp| mp.overlaps(mount_point)) {
            return Err(MountError::Overlapping {
                mount_point: mount_point.to_string(),
                existing: existing.to_string(),
            });
        }

        Ok(None)
    }

    /// Remove the binding at `mount_point`
    pub async fn unmount(&mut self, mount_point: &str) -> Result<MountBinding> {
        let mount_point = MountPoint::parse(mount_point)?;
        let binding =
            self.mounts
                .remove(&mount_point)
                .ok_or_else(|| MountError::NotMounted {
                    path: mount_point.to_string(),
                })?;

        if let Err(e) = self.persist().await {
            self.mounts.insert(mount_point, binding);
            return Err(e);
        }
        tracing::info!("Unmounted {}", mount_point);
        Ok(binding)
    }

    /// All bindings, ordered by mount point
    pub fn mounts(&self) -> impl Iterator<Item = &MountBinding> {
        self.mounts.values()
    }

    pub fn get(&self, mount_point: &str) -> Option<&MountBinding> {
        let mount_point = MountPoint::parse(mount_point).ok()?;
        self.mounts.get(&mount_point)
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Find the binding covering `path` and the key relative to its source
    pub fn resolve(&self, path: &str) -> Result<(&MountBinding, String)> {
        let normalized = normalize_path(path).map_err(|_| MountError::NotMounted {
            path: path.to_string(),
        })?;

        // Mount points never overlap, so at most one matches.
        self.mounts
            .values()
            .find_map(|binding| {
                binding
                    .mount_point
                    .strip(&normalized)
                    .map(|rest| (binding, rest.to_string()))
            })
            .ok_or(MountError::NotMounted {
                path: path.to_string(),
            })
    }

    async fn persist(&self) -> Result<()> {
        let stored: Vec<StoredMount> = self.mounts.values().map(MountBinding::to_stored).collect();
        self.store.save(&stored).await?;
        Ok(())
    }
}

fn parse_source(uri: &str) -> Result<StorageUri> {
    StorageUri::parse(uri).map_err(|e| MountError::InvalidSource {
        uri: uri.to_string(),
        reason: format!("{e:#}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FilesystemMountStore;
    use parquet_mount_secrets::InMemorySecretStore;
    use tempfile::TempDir;

    fn creds() -> BTreeMap<String, String> {
        BTreeMap::from([
            (ACCESS_KEY_OPTION.to_string(), "AKIAEXAMPLE".to_string()),
            (SECRET_KEY_OPTION.to_string(), "wJalrXUtnFEMI".to_string()),
        ])
    }

    #[tokio::test]
    async fn test_mount_and_resolve() {
        let mut table = MountTable::new();
        let outcome = table
            .mount("s3a://your-s3-bucket-name", "/mnt/your_mount_name", creds())
            .await
            .unwrap();
        assert_eq!(outcome, MountOutcome::Created);

        let (binding, key) = table
            .resolve("/mnt/your_mount_name/your_parquet_location")
            .unwrap();
        assert_eq!(binding.source_uri, "s3a://your-s3-bucket-name");
        assert_eq!(key, "your_parquet_location");

        let (_, key) = table.resolve("dbfs:/mnt/your_mount_name/").unwrap();
        assert_eq!(key, "");
    }

    #[tokio::test]
    async fn test_identical_remount_is_noop() {
        let mut table = MountTable::new();
        table.mount("s3a://bucket", "/mnt/data", creds()).await.unwrap();

        let outcome = table
            .mount("s3a://bucket", "/mnt/data/", creds())
            .await
            .unwrap();
        assert_eq!(outcome, MountOutcome::AlreadyMounted);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_conflicting_remount_fails() {
        let mut table = MountTable::new();
        table.mount("s3a://bucket", "/mnt/data", creds()).await.unwrap();

        let err = table
            .mount("s3a://other-bucket", "/mnt/data", creds())
            .await
            .unwrap_err();
        assert!(matches!(err, MountError::AlreadyMounted { .. }));

        let mut other_region = creds();
        other_region.insert("fs.s3a.endpoint.region".to_string(), "eu-west-1".to_string());
        let err = table
            .mount("s3a://bucket", "/mnt/data", other_region)
            .await
            .unwrap_err();
        assert!(matches!(err, MountError::AlreadyMounted { .. }));
        assert_eq!(table.get("/mnt/data").unwrap().source_uri, "s3a://bucket");

        let reference = CredentialRef::new("scope", "ak", "sk");
        let pair = CredentialPair::new("AKIAEXAMPLE", "wJalrXUtnFEMI");
        let err = table
            .mount_request(MountRequest::new("s3a://bucket", "/mnt/data").credentials(reference, &pair))
            .await
            .unwrap_err();
        assert!(matches!(err, MountError::AlreadyMounted { .. }));
    }

    #[tokio::test]
    async fn test_overlapping_mounts_rejected() {
        let mut table = MountTable::new();
        table.mount("s3a://bucket", "/mnt/data", creds()).await.unwrap();

        let nested = table
            .mount("s3a://other", "/mnt/data/inner", creds())
            .await
            .unwrap_err();
        assert!(matches!(nested, MountError::Overlapping { .. }));

        let parent = table.mount("s3a://other", "/mnt", creds()).await.unwrap_err();
        assert!(matches!(parent, MountError::Overlapping { .. }));

        table
            .mount("s3a://other", "/mnt/database", creds())
            .await
            .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_inputs() {
        let mut table = MountTable::new();
        assert!(matches!(
            table.mount("s3a://bucket", "mnt/data", BTreeMap::new()).await,
            Err(MountError::InvalidMountPoint { .. })
        ));
        assert!(matches!(
            table.mount("gs://bucket", "/mnt/data", BTreeMap::new()).await,
            Err(MountError::InvalidSource { .. })
        ));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_unmount() {
        let mut table = MountTable::new();
        table.mount("s3a://bucket", "/mnt/data", creds()).await.unwrap();

        let binding = table.unmount("/mnt/data").await.unwrap();
        assert_eq!(binding.source_uri, "s3a://bucket");
        assert!(matches!(
            table.resolve("/mnt/data/x"),
            Err(MountError::NotMounted { .. })
        ));
        assert!(matches!(
            table.unmount("/mnt/data").await,
            Err(MountError::NotMounted { .. })
        ));
    }

    #[tokio::test]
    async fn test_debug_redacts_credentials() {
        let mut table = MountTable::new();
        table.mount("s3a://bucket", "/mnt/data", creds()).await.unwrap();

        let debug = format!("{:?}", table.get("/mnt/data").unwrap());
        assert!(!debug.contains("AKIAEXAMPLE"));
        assert!(!debug.contains("wJalrXUtnFEMI"));
    }

    #[tokio::test]
    async fn test_registry_never_contains_secrets() {
        let temp_dir = TempDir::new().unwrap();
        let registry = temp_dir.path().join("mounts.json");

        let mut secrets = InMemorySecretStore::new();
        secrets.insert("scope", "ak", "AKIAEXAMPLE");
        secrets.insert("scope", "sk", "wJalrXUtnFEMI");
        let reference = CredentialRef::new("scope", "ak", "sk");
        let pair = resolve_credentials(&secrets, &reference).unwrap();

        let mut table = MountTable::open(Box::new(FilesystemMountStore::new(&registry)))
            .await
            .unwrap();
        table
            .mount_request(
                MountRequest::new("s3a://bucket", "/mnt/data").credentials(reference, &pair),
            )
            .await
            .unwrap();

        let content = std::fs::read_to_string(&registry).unwrap();
        assert!(!content.contains("AKIAEXAMPLE"));
        assert!(!content.contains("wJalrXUtnFEMI"));
        assert!(content.contains("\"scope\""));

        // The reopened binding holds the reference; credentials come back
        // through the secret store on connect
        let reopened = MountTable::open(Box::new(FilesystemMountStore::new(&registry)))
            .await
            .unwrap();
        let binding = reopened.get("/mnt/data").unwrap();
        assert!(binding.extra_configs.is_empty());
        assert_eq!(binding.connect_configs(Some(&secrets)).unwrap(), creds());
        assert!(binding.connect_configs(None).unwrap().is_empty());
    }

    fn session_secrets() -> InMemorySecretStore {
        let mut secrets = InMemorySecretStore::new();
        secrets.insert("scope", "ak", "ASIAEXAMPLE");
        secrets.insert("scope", "sk", "wJalrXUtnFEMI");
        secrets.insert("scope", "token", "FwoGZXIvYXdzEXAMPLE");
        secrets
    }

    fn session_request(secrets: &InMemorySecretStore) -> MountRequest {
        let reference = CredentialRef::new("scope", "ak", "sk").with_session_token("token");
        let pair = resolve_credentials(secrets, &reference).unwrap();
        MountRequest::new("s3a://bucket", "/mnt/data")
            .extra_configs(BTreeMap::from([(
                "fs.s3a.endpoint.region".to_string(),
                "us-east-1".to_string(),
            )]))
            .credentials(reference, &pair)
    }

    #[tokio::test]
    async fn test_session_token_survives_registry_reload() {
        let temp_dir = TempDir::new().unwrap();
        let registry = temp_dir.path().join("mounts.json");
        let secrets = session_secrets();

        let mut table = MountTable::open(Box::new(FilesystemMountStore::new(&registry)))
            .await
            .unwrap();
        table.mount_request(session_request(&secrets)).await.unwrap();
        assert!(!std::fs::read_to_string(&registry)
            .unwrap()
            .contains("FwoGZXIvYXdzEXAMPLE"));

        let mut reopened = MountTable::open(Box::new(FilesystemMountStore::new(&registry)))
            .await
            .unwrap();
        let configs = reopened
            .get("/mnt/data")
            .unwrap()
            .connect_configs(Some(&secrets))
            .unwrap();
        assert_eq!(configs[SESSION_TOKEN_OPTION], "FwoGZXIvYXdzEXAMPLE");
        assert_eq!(configs["fs.s3a.endpoint.region"], "us-east-1");

        let outcome = reopened
            .mount_request(session_request(&secrets))
            .await
            .unwrap();
        assert_eq!(outcome, MountOutcome::AlreadyMounted);
        let binding = reopened.get("/mnt/data").unwrap();
        assert_eq!(binding.extra_configs[SESSION_TOKEN_OPTION], "FwoGZXIvYXdzEXAMPLE");
    }

    #[tokio::test]
    async fn test_session_token_without_reference_rejected() {
        let mut table = MountTable::new();
        let reference = CredentialRef::new("scope", "ak", "sk");
        let pair = CredentialPair::new("ASIAEXAMPLE", "wJalrXUtnFEMI");
        let request = MountRequest::new("s3a://bucket", "/mnt/data")
            .extra_configs(BTreeMap::from([(
                SESSION_TOKEN_OPTION.to_string(),
                "FwoGZXIvYXdzEXAMPLE".to_string(),
            )]))
            .credentials(reference, &pair);

        let err = table.mount_request(request).await.unwrap_err();
        match err {
            MountError::UnreferencedSecret { option, .. } => {
                assert_eq!(option, SESSION_TOKEN_OPTION)
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_remount_without_credentials_keeps_session_values() {
        let mut table = MountTable::new();
        table.mount("s3a://bucket", "/mnt/data", creds()).await.unwrap();

        let outcome = table
            .mount("s3a://bucket", "/mnt/data", BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(outcome, MountOutcome::AlreadyMounted);
        assert_eq!(table.get("/mnt/data").unwrap().extra_configs, creds());
    }
}
