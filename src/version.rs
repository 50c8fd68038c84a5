//! Schema versioning utilities

use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Version string declared by a schema document
///
/// The raw string is the identity; a parsed semver (when the string is one)
/// is only used to order versions.
#[derive(Debug, Clone)]
pub struct SchemaVersion {
    raw: String,
    semver: Option<Version>,
}

impl SchemaVersion {
    /// Create from a version string
    pub fn parse(version_str: &str) -> Self {
        let raw = version_str.trim().to_string();
        // Strip leading 'v' if present
        let bare = raw.strip_prefix('v').unwrap_or(&raw);
        let semver = Version::parse(bare).ok();
        Self { raw, semver }
    }

    /// Get the version string exactly as declared
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed semantic version, when the string is one
    pub fn semver(&self) -> Option<&Version> {
        self.semver.as_ref()
    }

    /// Whether `other` names this version, tolerating a `v` prefix
    pub fn matches(&self, other: &str) -> bool {
        if self.raw == other {
            return true;
        }
        let other = SchemaVersion::parse(other);
        matches!((&self.semver, &other.semver), (Some(a), Some(b)) if a == b)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for SchemaVersion {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for SchemaVersion {}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.semver, &other.semver) {
            (Some(a), Some(b)) => a.cmp(b).then_with(|| self.raw.cmp(&other.raw)),
            _ => self.raw.cmp(&other.raw),
        }
    }
}

impl Serialize for SchemaVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for SchemaVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SchemaVersion::parse(&raw))
    }
}
