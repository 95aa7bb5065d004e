//! Hadoop s3a-style configuration for S3 backends

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt;

pub const ACCESS_KEY_OPTION: &str = "fs.s3a.access.key";
pub const SECRET_KEY_OPTION: &str = "fs.s3a.secret.key";
pub const SESSION_TOKEN_OPTION: &str = "fs.s3a.session.token";
pub const ENDPOINT_OPTION: &str = "fs.s3a.endpoint";
pub const REGION_OPTION: &str = "fs.s3a.endpoint.region";
pub const PATH_STYLE_OPTION: &str = "fs.s3a.path.style.access";

const KNOWN_OPTIONS: &[&str] = &[
    ACCESS_KEY_OPTION,
    SECRET_KEY_OPTION,
    SESSION_TOKEN_OPTION,
    ENDPOINT_OPTION,
    REGION_OPTION,
    PATH_STYLE_OPTION,
];

/// Whether the value of this configuration key is a credential
pub fn is_secret_option(key: &str) -> bool {
    matches!(
        key,
        ACCESS_KEY_OPTION | SECRET_KEY_OPTION | SESSION_TOKEN_OPTION
    )
}

/// S3 client settings extracted from mount configuration
#[derive(Clone, Default, PartialEq, Eq)]
pub struct S3Options {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub session_token: Option<String>,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub path_style: bool,
}

impl S3Options {
    /// Read settings from `fs.s3a.*` keys
    ///
    /// Access key and secret key must be given together. When both are absent
    /// the default AWS credential chain is used. Unknown keys are ignored with a
    /// warning.
    pub fn from_configs(configs: &BTreeMap<String, String>) -> Result<Self> {
        for key in configs.keys() {
            if !KNOWN_OPTIONS.contains(&key.as_str()) {
                tracing::warn!("Ignoring unsupported S3 configuration key: {key}");
            }
        }

        let options = Self {
            access_key: configs.get(ACCESS_KEY_OPTION).cloned(),
            secret_key: configs.get(SECRET_KEY_OPTION).cloned(),
            session_token: configs.get(SESSION_TOKEN_OPTION).cloned(),
            endpoint: configs.get(ENDPOINT_OPTION).cloned(),
            region: configs.get(REGION_OPTION).cloned(),
            path_style: match configs.get(PATH_STYLE_OPTION) {
                Some(value) => value
                    .trim()
                    .parse::<bool>()
                    .with_context(|| format!("Invalid boolean for {PATH_STYLE_OPTION}: {value}"))?,
                None => false,
            },
        };

        if options.access_key.is_some() != options.secret_key.is_some() {
            anyhow::bail!(
                "{ACCESS_KEY_OPTION} and {SECRET_KEY_OPTION} must be configured together"
            );
        }

        Ok(options)
    }

    /// Whether static credentials were supplied
    pub fn has_static_credentials(&self) -> bool {
        self.access_key.is_some() && self.secret_key.is_some()
    }
}

impl fmt::Debug for S3Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Options")
            .field("static_credentials", &self.has_static_credentials())
            .field("session_token", &self.session_token.is_some())
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("path_style", &self.path_style)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_configs_credentials() {
        let options = S3Options::from_configs(&configs(&[
            (ACCESS_KEY_OPTION, "AKIAEXAMPLE"),
            (SECRET_KEY_OPTION, "wJalrXUtnFEMI"),
            (REGION_OPTION, "eu-west-1"),
        ]))
        .unwrap();
        assert!(options.has_static_credentials());
        assert_eq!(options.region.as_deref(), Some("eu-west-1"));
        assert!(!options.path_style);
    }

    #[test]
    fn test_from_configs_half_credentials() {
        let result = S3Options::from_configs(&configs(&[(ACCESS_KEY_OPTION, "AKIAEXAMPLE")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_configs_path_style() {
        let options =
            S3Options::from_configs(&configs(&[(PATH_STYLE_OPTION, "true")])).unwrap();
        assert!(options.path_style);
        assert!(S3Options::from_configs(&configs(&[(PATH_STYLE_OPTION, "yes")])).is_err());
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let options = S3Options::from_configs(&configs(&[
            (ACCESS_KEY_OPTION, "AKIAEXAMPLE"),
            (SECRET_KEY_OPTION, "wJalrXUtnFEMI"),
        ]))
        .unwrap();
        let debug = format!("{options:?}");
        assert!(!debug.contains("AKIAEXAMPLE"));
        assert!(!debug.contains("wJalrXUtnFEMI"));
    }

    #[test]
    fn test_is_secret_option() {
        assert!(is_secret_option(ACCESS_KEY_OPTION));
        assert!(is_secret_option(SECRET_KEY_OPTION));
        assert!(is_secret_option(SESSION_TOKEN_OPTION));
        assert!(!is_secret_option(ENDPOINT_OPTION));
    }
}
