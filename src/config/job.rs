//! The mount-and-read job description.

use anyhow::Context;
use clap::Args;
use parquet_mount_parquet_source::{ReadOptions, DEFAULT_MAX_ROWS};
use parquet_mount_secrets::CredentialRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Everything the mount-and-read pipeline needs.
///
/// Defaults are the placeholders an operator is expected to replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    /// Bucket mounted as `s3a://<s3_bucket_name>`
    pub s3_bucket_name: String,

    /// Full source URI, overriding `s3_bucket_name` (e.g. `file:///data/bucket`)
    pub source: Option<String>,

    /// Mount point
    pub mount_name: String,

    pub secret_scope: String,
    pub access_key_name: String,
    pub secret_key_name: String,

    /// Secret key name of a session token, for temporary credentials
    pub session_token_name: Option<String>,

    /// Dataset location relative to the mount point
    pub input_path: String,

    /// Required partition keys in path order, empty for no check
    pub expected_partitions: Vec<String>,

    /// Append partition values as columns
    pub partition_columns: bool,

    /// Rows shown by display
    pub max_rows: usize,

    /// Extra backend configuration (endpoint, region, path style, ...)
    pub extra_configs: BTreeMap<String, String>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            s3_bucket_name: "your-s3-bucket-name".to_string(),
            source: None,
            mount_name: "/mnt/your_mount_name".to_string(),
            secret_scope: "your_secret_scope".to_string(),
            access_key_name: "aws-access-key-id".to_string(),
            secret_key_name: "aws-secret-access-key".to_string(),
            session_token_name: None,
            input_path: "your_parquet_location".to_string(),
            expected_partitions: Vec::new(),
            partition_columns: false,
            max_rows: DEFAULT_MAX_ROWS,
            extra_configs: BTreeMap::new(),
        }
    }
}

impl JobConfig {
    /// Load a job from a TOML file; missing fields keep their defaults
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse job config: {}", path.display()))
    }

    pub fn source_uri(&self) -> String {
        match &self.source {
            Some(source) => source.clone(),
            None => format!("s3a://{}", self.s3_bucket_name),
        }
    }

    /// `<mount_name>/<input_path>`
    pub fn input_location(&self) -> String {
        format!(
            "{}/{}",
            self.mount_name.trim_end_matches('/'),
            self.input_path.trim_start_matches('/')
        )
    }

    pub fn credential_ref(&self) -> CredentialRef {
        let reference = CredentialRef::new(
            &self.secret_scope,
            &self.access_key_name,
            &self.secret_key_name,
        );
        match &self.session_token_name {
            Some(name) => reference.with_session_token(name),
            None => reference,
        }
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            partition_columns: self.partition_columns,
            expected_partitions: if self.expected_partitions.is_empty() {
                None
            } else {
                Some(self.expected_partitions.clone())
            },
            ..Default::default()
        }
    }
}

/// Parse a `key=value` pair
pub fn parse_key_value(s: &str) -> anyhow::Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .with_context(|| format!("Expected key=value, got '{s}'"))?;
    if key.trim().is_empty() {
        anyhow::bail!("Empty key in '{s}'");
    }
    Ok((key.trim().to_string(), value.to_string()))
}

/// Job options on the command line; each one overrides the config file
#[derive(Args, Clone, Debug, Default)]
pub struct JobArgs {
    /// TOML job file
    #[arg(long, value_name = "PATH", env = "PARQUET_MOUNT_CONFIG")]
    pub config: Option<PathBuf>,

    /// S3 bucket to mount (as s3a://BUCKET)
    #[arg(long, env = "PARQUET_MOUNT_BUCKET")]
    pub bucket: Option<String>,

    /// Source URI overriding --bucket (s3://, s3a://, file://)
    #[arg(long)]
    pub source: Option<String>,

    /// Mount point
    #[arg(long, env = "PARQUET_MOUNT_NAME")]
    pub mount_name: Option<String>,

    /// Secret scope holding the credentials
    #[arg(long, env = "PARQUET_MOUNT_SECRET_SCOPE")]
    pub secret_scope: Option<String>,

    /// Secret key name of the access key id
    #[arg(long)]
    pub access_key_name: Option<String>,

    /// Secret key name of the secret access key
    #[arg(long)]
    pub secret_key_name: Option<String>,

    /// Secret key name of a session token (temporary credentials)
    #[arg(long)]
    pub session_token_name: Option<String>,

    /// Dataset path relative to the mount point
    #[arg(long, env = "PARQUET_MOUNT_INPUT_PATH")]
    pub input_path: Option<String>,

    /// Required partition keys, in order (comma-separated, e.g. "year,month,day")
    #[arg(long, value_delimiter = ',')]
    pub expect_partitions: Option<Vec<String>>,

    /// Append partition values as columns
    #[arg(long)]
    pub partition_columns: bool,

    /// Maximum rows to display
    #[arg(long)]
    pub max_rows: Option<usize>,

    /// Extra backend configuration (repeatable, e.g. --conf fs.s3a.endpoint.region=eu-west-1)
    #[arg(long = "conf", value_name = "KEY=VALUE")]
    pub extra_configs: Vec<String>,
}

impl JobArgs {
    /// Build the job: config file (or defaults), then command-line overrides
    pub fn resolve(&self) -> anyhow::Result<JobConfig> {
        let mut job = match &self.config {
            Some(path) => JobConfig::from_file(path)?,
            None => JobConfig::default(),
        };

        if let Some(bucket) = &self.bucket {
            job.s3_bucket_name = bucket.clone();
        }
        if let Some(source) = &self.source {
            job.source = Some(source.clone());
        }
        if let Some(mount_name) = &self.mount_name {
            job.mount_name = mount_name.clone();
        }
        if let Some(scope) = &self.secret_scope {
            job.secret_scope = scope.clone();
        }
        if let Some(name) = &self.access_key_name {
            job.access_key_name = name.clone();
        }
        if let Some(name) = &self.secret_key_name {
            job.secret_key_name = name.clone();
        }
        if let Some(name) = &self.session_token_name {
            job.session_token_name = Some(name.clone());
        }
        if let Some(input_path) = &self.input_path {
            job.input_path = input_path.clone();
        }
        if let Some(partitions) = &self.expect_partitions {
            job.expected_partitions = partitions.clone();
        }
        if self.partition_columns {
            job.partition_columns = true;
        }
        if let Some(max_rows) = self.max_rows {
            job.max_rows = max_rows;
        }
        for entry in &self.extra_configs {
            let (key, value) = parse_key_value(entry)?;
            job.extra_configs.insert(key, value);
        }

        Ok(job)
    }
}
