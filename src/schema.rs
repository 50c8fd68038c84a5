//! Schema document types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::SchemaLoadError;
use crate::field::FieldSpec;
use crate::version::SchemaVersion;

/// Status value marking the authoritative version of a family
pub const STATUS_CURRENT: &str = "current";

/// One naming convention at one version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// `<org>:<domain>:<family>`, e.g. "copernicus:sentinel:s2"
    pub schema_id: String,
    /// Semantic version of this document
    pub schema_version: String,
    /// "current" or anything else (deprecated, draft, ...)
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Template DSL string
    pub template: String,
    /// Per-field constraints
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
    /// Filenames expected to round-trip through this schema
    #[serde(default)]
    pub examples: Vec<String>,
}

fn default_status() -> String {
    STATUS_CURRENT.to_string()
}

impl SchemaDocument {
    /// Parse a document, tolerating a UTF-8 byte order mark
    pub fn from_json_str(text: &str, location: &SchemaLocation) -> Result<Self, SchemaLoadError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        serde_json::from_str(text).map_err(|source| SchemaLoadError::Json {
            location: location.to_string(),
            source,
        })
    }

    /// Family name: the last colon segment of `schema_id`, upper-cased
    pub fn family(&self) -> String {
        family_from_schema_id(&self.schema_id)
    }

    pub fn version(&self) -> SchemaVersion {
        SchemaVersion::parse(&self.schema_version)
    }

    /// Identity of this document
    pub fn key(&self) -> SchemaKey {
        SchemaKey {
            family: self.family(),
            version: self.schema_version.clone(),
        }
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }
}

/// Family name for a schema id
pub fn family_from_schema_id(schema_id: &str) -> String {
    schema_id
        .rsplit(':')
        .next()
        .unwrap_or(schema_id)
        .trim()
        .to_uppercase()
}

/// Identity of a schema document: `(family, schema_version)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaKey {
    pub family: String,
    pub version: String,
}

impl fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.family, self.version)
    }
}

/// Where a schema document lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum SchemaLocation {
    /// A file on disk
    File(PathBuf),
    /// A file inside the schema set compiled into the binary
    Bundled(PathBuf),
}

impl SchemaLocation {
    pub fn path(&self) -> &Path {
        match self {
            SchemaLocation::File(path) | SchemaLocation::Bundled(path) => path,
        }
    }
}

impl fmt::Display for SchemaLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaLocation::File(path) => write!(f, "{}", path.display()),
            SchemaLocation::Bundled(path) => write!(f, "bundled:{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> SchemaLocation {
        SchemaLocation::File(PathBuf::from("abc_filename_v1_0_0.json"))
    }

    #[test]
    fn test_family_is_last_segment_upper_cased() {
        assert_eq!(family_from_schema_id("copernicus:sentinel:s2"), "S2");
        assert_eq!(family_from_schema_id("usgs:landsat:landsat"), "LANDSAT");
        assert_eq!(family_from_schema_id("plain"), "PLAIN");
    }

    #[test]
    fn test_document_defaults() {
        let doc = SchemaDocument::from_json_str(
            r#"{"schema_id": "x:y:abc", "schema_version": "1.0.0", "template": "ABC_{id}.txt"}"#,
            &location(),
        )
        .unwrap();
        assert_eq!(doc.status, STATUS_CURRENT);
        assert!(doc.fields.is_empty());
        assert!(doc.examples.is_empty());
        assert_eq!(
            doc.key(),
            SchemaKey {
                family: "ABC".to_string(),
                version: "1.0.0".to_string()
            }
        );
    }

    #[test]
    fn test_byte_order_mark_is_tolerated() {
        let text = "\u{feff}{\"schema_id\": \"x:y:abc\", \"schema_version\": \"1.0.0\", \"template\": \"A\"}";
        assert!(SchemaDocument::from_json_str(text, &location()).is_ok());
    }

    #[test]
    fn test_malformed_document_names_location() {
        let err = SchemaDocument::from_json_str("{not json", &location()).unwrap_err();
        assert!(err.to_string().contains("abc_filename_v1_0_0.json"));
    }
}
