//! Error types for the naming engine

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, NamingError>;

/// Umbrella error returned by the public operations
#[derive(Error, Debug)]
pub enum NamingError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Load(#[from] SchemaLoadError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    NoMatch(#[from] NoMatchError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

impl NamingError {
    /// The near miss carried by this error, if any
    pub fn near_miss(&self) -> Option<&ParseError> {
        match self {
            NamingError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors raised while compiling a template string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated placeholder starting at offset {0}")]
    UnterminatedPlaceholder(usize),

    #[error("empty placeholder at offset {0}")]
    EmptyPlaceholder(usize),

    #[error("optional segment opened at offset {0} is never closed")]
    UnclosedOptional(usize),

    #[error("unexpected ']' at offset {0}")]
    UnexpectedClose(usize),

    #[error("compiled pattern {pattern} is not a valid regex: {message}")]
    InvalidRegex { pattern: String, message: String },
}

/// A single schema document could not be loaded
///
/// Localized to the offending document: discovery of the remaining documents
/// carries on.
#[derive(Error, Debug)]
pub enum SchemaLoadError {
    #[error("failed to read schema {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid schema document {location}: {source}")]
    Json {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("schema {location} is not part of the bundled schema set")]
    NotBundled { location: String },

    #[error("schema {location} has an invalid template: {source}")]
    Template {
        location: String,
        #[source]
        source: TemplateError,
    },
}

/// Registry lookups and discovery invariants
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Unknown family: {family}{}", suggestion_suffix(.suggestions))]
    UnknownFamily {
        family: String,
        suggestions: Vec<String>,
    },

    #[error("Version '{version}' not found for family {family}. Available: {}", .available.join(", "))]
    UnknownVersion {
        family: String,
        version: String,
        available: Vec<String>,
    },

    #[error("No schema version marked as 'current' for family {family}. Available versions: {}", .available.join(", "))]
    NoCurrentVersion {
        family: String,
        available: Vec<String>,
    },

    #[error("Family {family} has more than one version marked as 'current': {}", .versions.join(", "))]
    MultipleCurrentVersions {
        family: String,
        versions: Vec<String>,
    },

    #[error("No schemas found under {root}")]
    NoSchemas { root: String },
}

fn suggestion_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

/// Assembling a filename failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Missing field '{field}' for schema {schema}")]
    MissingField { field: String, schema: String },

    #[error("Field '{field}' must be one of {allowed:?}, got '{value}'")]
    InvalidEnum {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Field '{field}' with value '{value}' does not match pattern {pattern}")]
    InvalidPattern {
        field: String,
        value: String,
        pattern: String,
    },

    #[error(
        "Could not select a schema. Include the schema's FIRST compulsory field among your inputs. \
         Examples of first fields from known schemas: {}",
        first_fields_sample(.first_fields)
    )]
    NoSchemaSelected { first_fields: Vec<String> },
}

fn first_fields_sample(first_fields: &[String]) -> String {
    if first_fields.is_empty() {
        "<no schemas found>".to_string()
    } else {
        first_fields.join(", ")
    }
}

/// A filename nearly matched a schema but one field diverged
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    /// Field at which the filename first diverges
    pub field: String,
    /// Human description of the field's constraint
    pub expected: String,
    /// The offending substring
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_family: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid value '{}' for field '{}': expected {}",
            self.value, self.field, self.expected
        )?;
        let mut extras = Vec::new();
        if let Some(family) = &self.match_family {
            extras.push(format!("schema family '{}'", family));
        }
        if let Some(id) = &self.schema_id {
            extras.push(format!("schema '{}'", id));
        }
        if !extras.is_empty() {
            write!(f, " (nearest match: {})", extras.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// No schema matched and no near miss could be attributed
#[derive(Debug)]
pub struct NoMatchError {
    pub name: String,
    /// Where the schemas were looked up
    pub root: String,
    /// Number of schema files scanned
    pub scanned: usize,
    /// Bounded sample of scanned schema files
    pub preview: Vec<String>,
    /// First schema that could not be loaded during the scan
    pub first_load_error: Option<SchemaLoadError>,
}

impl fmt::Display for NoMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "No schema matched '{}'. Looked recursively under {} and found {} file(s): [{}]",
            self.name,
            self.root,
            self.scanned,
            self.preview.join(", ")
        )?;
        if self.scanned > self.preview.len() {
            write!(f, "…")?;
        }
        if let Some(err) = &self.first_load_error {
            write!(f, ". First error while reading schemas: {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for NoMatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.first_load_error
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_mentions_nearest_schema() {
        let err = ParseError {
            field: "platform".to_string(),
            expected: "one of [\"S2A\", \"S2B\"]".to_string(),
            value: "S2X".to_string(),
            schema_id: Some("copernicus:sentinel:s2".to_string()),
            match_family: Some("S2".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid value 'S2X' for field 'platform'"));
        assert!(msg.contains("schema family 'S2'"));
        assert!(msg.contains("schema 'copernicus:sentinel:s2'"));
    }

    #[test]
    fn test_no_match_marks_truncated_preview() {
        let err = NoMatchError {
            name: "foo.txt".to_string(),
            root: "schemas".to_string(),
            scanned: 10,
            preview: vec!["a_filename_v1.json".to_string()],
            first_load_error: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("found 10 file(s)"));
        assert!(msg.ends_with('…'));
    }

    #[test]
    fn test_unknown_family_suggestions() {
        let err = RegistryError::UnknownFamily {
            family: "S9".to_string(),
            suggestions: vec!["S2".to_string()],
        };
        assert_eq!(err.to_string(), "Unknown family: S9 (did you mean: S2?)");
    }
}
