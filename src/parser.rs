//! Filename parsing
//!
//! [`parse_auto`] tries the current schema of the family hinted by the
//! filename prefix first, then every discovered schema in path order. The
//! first full match wins. Without one, the first near miss found is reported,
//! and failing that a [`NoMatchError`] describing what was scanned.

use serde::Serialize;
use std::path::PathBuf;

use crate::diagnostics::explain_match_failure;
use crate::enrich::FieldEnricher;
use crate::error::{NoMatchError, ParseError, RegistryError, Result, SchemaLoadError};
use crate::matcher::Fields;
use crate::registry::{Discovery, SchemaRegistry};
use crate::schema::SchemaLocation;

/// A successful parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseResult {
    pub valid: bool,
    pub fields: Fields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_family: Option<String>,
}

/// How a caller names a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaRef {
    /// A document path, relative to the schema source or absolute
    Path(PathBuf),
    /// A family, at its current version unless one is given
    Family {
        family: String,
        version: Option<String>,
    },
}

impl SchemaRef {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        SchemaRef::Path(path.into())
    }

    pub fn family(family: impl Into<String>) -> Self {
        SchemaRef::Family {
            family: family.into(),
            version: None,
        }
    }

    pub fn family_version(family: impl Into<String>, version: impl Into<String>) -> Self {
        SchemaRef::Family {
            family: family.into(),
            version: Some(version.into()),
        }
    }

    /// Resolve to a document location
    pub fn locate(&self, registry: &SchemaRegistry) -> std::result::Result<SchemaLocation, RegistryError> {
        match self {
            SchemaRef::Path(path) => Ok(registry.source().resolve(path)),
            SchemaRef::Family { family, version } => registry.get(family, version.as_deref()),
        }
    }
}

/// Result of trying one schema
#[derive(Debug)]
pub enum ParseOutcome {
    Success(ParseResult),
    NearMiss(ParseError),
    NotFound,
    LoadError(SchemaLoadError),
}

/// Try `name` against the schema at `location`
pub fn attempt(
    registry: &SchemaRegistry,
    discovery: Option<&Discovery>,
    enricher: &dyn FieldEnricher,
    name: &str,
    location: &SchemaLocation,
) -> ParseOutcome {
    let schema = match registry.open_schema(location) {
        Ok(schema) => schema,
        Err(e) => return ParseOutcome::LoadError(e),
    };
    let doc = &schema.document;

    let indexed = discovery.and_then(|d| d.lookup(location));
    let family = indexed
        .map(|(info, _, _)| info.family.clone())
        .unwrap_or_else(|| doc.family());

    if let Some(captures) = schema.compiled.captures(name) {
        let (version, status) = match indexed {
            Some((_, version, entry)) => (version.to_string(), entry.status.clone()),
            None => (doc.schema_version.clone(), doc.status.clone()),
        };
        return ParseOutcome::Success(ParseResult {
            valid: true,
            fields: enricher.enrich(captures, doc),
            version: Some(version),
            status: Some(status),
            match_family: Some(family),
        });
    }

    match explain_match_failure(name, doc, &schema.compiled, registry.patterns()) {
        Some(miss) => ParseOutcome::NearMiss(ParseError {
            field: miss.field,
            expected: miss.expected,
            value: miss.value,
            schema_id: Some(doc.schema_id.clone()),
            match_family: Some(family),
        }),
        None => ParseOutcome::NotFound,
    }
}

/// Parse `name` against every known schema
pub fn parse_auto(
    registry: &SchemaRegistry,
    enricher: &dyn FieldEnricher,
    name: &str,
) -> Result<ParseResult> {
    let discovery = registry.discover()?;
    if discovery.locations.is_empty() {
        return Err(RegistryError::NoSchemas {
            root: registry.source().label(),
        }
        .into());
    }

    let mut near_miss: Option<ParseError> = None;
    let mut first_error: Option<SchemaLoadError> = None;

    let hinted = discovery
        .guess_family(name)
        .map(|info| info.current_location.clone());
    if let Some(location) = &hinted {
        tracing::debug!("Trying hinted schema {} for {}", location, name);
        match attempt(registry, Some(&*discovery), enricher, name, location) {
            ParseOutcome::Success(result) => return Ok(result),
            ParseOutcome::NearMiss(err) => near_miss = Some(err),
            ParseOutcome::NotFound => {}
            // the full scan skips this location, so keep the error here
            ParseOutcome::LoadError(e) => {
                tracing::debug!("Hinted schema unreadable: {}", e);
                first_error = Some(e);
            }
        }
    }

    for location in &discovery.locations {
        if hinted.as_ref() == Some(location) {
            continue;
        }
        match attempt(registry, Some(&*discovery), enricher, name, location) {
            ParseOutcome::Success(result) => return Ok(result),
            ParseOutcome::NearMiss(err) => {
                near_miss.get_or_insert(err);
            }
            ParseOutcome::LoadError(e) => {
                first_error.get_or_insert(e);
            }
            ParseOutcome::NotFound => {}
        }
    }

    if let Some(err) = near_miss {
        tracing::debug!("No schema matched {}; nearest miss: {}", name, err);
        return Err(err.into());
    }

    Err(NoMatchError {
        name: name.to_string(),
        root: registry.source().label(),
        scanned: discovery.locations.len(),
        preview: discovery
            .locations
            .iter()
            .take(registry.preview_limit())
            .map(|location| registry.source().relative(location))
            .collect(),
        first_load_error: first_error,
    }
    .into())
}

/// Parse `name` against one named schema
pub fn parse(
    registry: &SchemaRegistry,
    enricher: &dyn FieldEnricher,
    name: &str,
    schema: &SchemaRef,
) -> Result<ParseResult> {
    let location = schema.locate(registry)?;
    // an explicit path may live outside discovery; fall back to document metadata
    let discovery = registry.discover().ok();

    match attempt(registry, discovery.as_deref(), enricher, name, &location) {
        ParseOutcome::Success(result) => Ok(result),
        ParseOutcome::NearMiss(err) => Err(err.into()),
        ParseOutcome::LoadError(err) => Err(err.into()),
        ParseOutcome::NotFound => {
            let doc = registry.load(&location)?;
            Err(ParseError {
                field: "filename".to_string(),
                expected: format!("pattern defined by schema {}", doc.schema_id),
                value: name.to_string(),
                schema_id: Some(doc.schema_id.clone()),
                match_family: Some(doc.family()),
            }
            .into())
        }
    }
}
