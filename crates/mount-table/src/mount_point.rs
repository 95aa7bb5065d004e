//! Normalized logical paths

use crate::{MountError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalize a logical path: accept a `dbfs:` prefix, require a leading `/`,
/// collapse repeated separators and drop a trailing one.
///
/// `.` and `..` segments are rejected rather than interpreted.
pub fn normalize_path(path: &str) -> std::result::Result<String, String> {
    let path = path.strip_prefix("dbfs:").unwrap_or(path);
    if !path.starts_with('/') {
        return Err("path must be absolute".to_string());
    }

    let mut segments = Vec::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(format!("relative segment '{segment}' is not allowed"));
        }
        segments.push(segment);
    }

    Ok(format!("/{}", segments.join("/")))
}

/// An absolute, normalized logical path at which a source is mounted
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MountPoint(String);

impl MountPoint {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: String| MountError::InvalidMountPoint {
            mount_point: raw.to_string(),
            reason,
        };
        let normalized = normalize_path(raw).map_err(invalid)?;
        if normalized == "/" {
            return Err(invalid("cannot mount at the root".to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// If `path` (normalized) lies at or below this mount point, the remainder
    /// relative to it (empty for the mount point itself)
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.0.as_str())?;
        if rest.is_empty() {
            Some("")
        } else {
            rest.strip_prefix('/')
        }
    }

    /// Whether either mount point lies at or below the other
    pub fn overlaps(&self, other: &MountPoint) -> bool {
        self.strip(other.as_str()).is_some() || other.strip(self.as_str()).is_some()
    }
}

impl fmt::Display for MountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MountPoint {
    type Error = MountError;

    fn try_from(value: String) -> Result<Self> {
        MountPoint::parse(&value)
    }
}

impl From<MountPoint> for String {
    fn from(value: MountPoint) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_path("/mnt/x/").unwrap(), "/mnt/x");
        assert_eq!(normalize_path("//mnt//x").unwrap(), "/mnt/x");
        assert_eq!(normalize_path("dbfs:/mnt/x").unwrap(), "/mnt/x");
        assert_eq!(normalize_path("/").unwrap(), "/");
        assert!(normalize_path("mnt/x").is_err());
        assert!(normalize_path("/mnt/../etc").is_err());
    }

    #[test]
    fn test_parse_rejects_root() {
        assert!(matches!(
            MountPoint::parse("/"),
            Err(MountError::InvalidMountPoint { .. })
        ));
    }

    #[test]
    fn test_strip() {
        let mp = MountPoint::parse("/mnt/data").unwrap();
        assert_eq!(mp.strip("/mnt/data"), Some(""));
        assert_eq!(mp.strip("/mnt/data/a/b"), Some("a/b"));
        assert_eq!(mp.strip("/mnt/database"), None);
        assert_eq!(mp.strip("/mnt"), None);
    }

    #[test]
    fn test_overlaps() {
        let a = MountPoint::parse("/mnt/data").unwrap();
        let b = MountPoint::parse("/mnt/data/inner").unwrap();
        let c = MountPoint::parse("/mnt/database").unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }
}
