//! S3 backend with recursive and delimited prefix listing

use crate::{join_key, ObjectBackend, ObjectEntry, S3Options};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use bytes::Bytes;

const CREDENTIALS_PROVIDER_NAME: &str = "parquet-mount";

/// Serves keys relative to `s3://bucket/prefix`
///
/// Creating an S3 client is relatively expensive, so one backend holds a single
/// client for all of its operations.
pub struct S3Backend {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3Backend {
    /// Create a client for `bucket`, using static credentials from `options`
    /// when present and the default AWS chain otherwise
    pub async fn connect(bucket: &str, prefix: &str, options: &S3Options) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let (Some(access_key), Some(secret_key)) = (&options.access_key, &options.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                options.session_token.clone(),
                None,
                CREDENTIALS_PROVIDER_NAME,
            ));
        }
        if let Some(region) = &options.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &options.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(options.path_style)
            .build();

        tracing::debug!("Created S3 client for s3://{bucket}/{prefix} ({options:?})");

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        join_key(&self.prefix, key)
    }

    /// Strip the backend prefix from a full object key
    fn relative_key(&self, full_key: &str) -> String {
        if self.prefix.is_empty() {
            return full_key.trim_end_matches('/').to_string();
        }
        full_key
            .strip_prefix(&self.prefix)
            .unwrap_or(full_key)
            .trim_matches('/')
            .to_string()
    }

    /// List objects under a full-key prefix, following continuation tokens
    ///
    /// With a delimiter, returns immediate objects plus "directories" taken from
    /// the common prefixes.
    async fn list_prefix(&self, prefix: &str, delimited: bool) -> Result<Vec<ObjectEntry>> {
        let mut results = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if delimited {
                request = request.delimiter("/");
            }
            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let response = request.send().await.with_context(|| {
                format!("Failed to list S3 prefix: s3://{}/{}", self.bucket, prefix)
            })?;

            for object in response.contents.unwrap_or_default() {
                if let Some(key) = object.key {
                    // Skip "directory" markers (keys ending with /)
                    if key.ends_with('/') {
                        continue;
                    }
                    let size = object.size.unwrap_or(0).max(0) as u64;
                    results.push(ObjectEntry::file(self.relative_key(&key), size));
                }
            }

            for common in response.common_prefixes.unwrap_or_default() {
                if let Some(dir) = common.prefix {
                    results.push(ObjectEntry::dir(self.relative_key(&dir)));
                }
            }

            // Handle pagination
            if response.is_truncated == Some(true) {
                continuation_token = response.next_continuation_token;
            } else {
                break;
            }
        }

        results.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(results)
    }
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn list(&self, key: &str, recursive: bool) -> Result<Vec<ObjectEntry>> {
        let full = self.full_key(key);
        let dir_prefix = if full.is_empty() {
            String::new()
        } else {
            format!("{full}/")
        };

        let results = self.list_prefix(&dir_prefix, !recursive).await?;
        if !results.is_empty() {
            tracing::debug!(
                "Listed {} objects in S3 prefix: s3://{}/{}",
                results.len(),
                self.bucket,
                dir_prefix
            );
            return Ok(results);
        }

        // Not a "directory": the key may name a single object. An empty bucket
        // root is still a valid, empty listing.
        if full.is_empty() {
            return Ok(results);
        }
        let exact: Vec<ObjectEntry> = self
            .list_prefix(&full, true)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_dir && self.full_key(&entry.key) == full)
            .collect();

        if exact.is_empty() {
            anyhow::bail!("Path does not exist: s3://{}/{}", self.bucket, full);
        }
        Ok(exact)
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let full = self.full_key(key);
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full)
            .send()
            .await
            .with_context(|| {
                format!("Failed to fetch object from S3: s3://{}/{}", self.bucket, full)
            })?;

        let body = response.body.collect().await.with_context(|| {
            format!("Failed to read object body: s3://{}/{}", self.bucket, full)
        })?;

        Ok(body.into_bytes())
    }

    fn display_key(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, self.full_key(key))
    }
}
