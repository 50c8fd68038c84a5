//! Engine facade: one registry plus one enricher

use crate::assembler;
use crate::config::NamingConfig;
use crate::enrich::{FieldEnricher, StacMapEnricher};
use crate::error::Result;
use crate::matcher::Fields;
use crate::parser::{self, ParseResult, SchemaRef};
use crate::registry::{FamilyMatch, SchemaDescription, SchemaRegistry, VersionSummary};
use crate::validator::{self, ValidationReport};

/// Naming engine over a schema registry
///
/// ```no_run
/// use eo_naming::NamingEngine;
///
/// let engine = NamingEngine::bundled();
/// let parsed = engine
///     .parse_auto("S2B_MSIL2A_20241123T224759_N0511_R101_T03VUL_20241123T230829.SAFE")
///     .unwrap();
/// let rebuilt = engine.assemble_auto(&parsed.fields).unwrap();
/// assert!(rebuilt.ends_with(".SAFE"));
/// ```
pub struct NamingEngine {
    registry: SchemaRegistry,
    enricher: Box<dyn FieldEnricher>,
}

impl NamingEngine {
    /// Engine with the `stac_map` enricher
    pub fn new(registry: SchemaRegistry) -> Self {
        Self::with_enricher(registry, StacMapEnricher)
    }

    pub fn with_enricher(registry: SchemaRegistry, enricher: impl FieldEnricher + 'static) -> Self {
        Self {
            registry,
            enricher: Box::new(enricher),
        }
    }

    /// Engine over the bundled schemas
    pub fn bundled() -> Self {
        Self::new(SchemaRegistry::bundled())
    }

    pub fn from_config(config: &NamingConfig) -> Self {
        Self::new(SchemaRegistry::from_config(&config.registry))
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Parse against every known schema
    pub fn parse_auto(&self, name: &str) -> Result<ParseResult> {
        parser::parse_auto(&self.registry, self.enricher.as_ref(), name)
    }

    /// Parse against one schema
    pub fn parse(&self, name: &str, schema: &SchemaRef) -> Result<ParseResult> {
        parser::parse(&self.registry, self.enricher.as_ref(), name, schema)
    }

    /// Render a filename with one schema
    pub fn assemble(&self, fields: &Fields, schema: &SchemaRef) -> Result<String> {
        assembler::assemble(&self.registry, self.enricher.as_ref(), fields, schema)
    }

    /// Render a filename, selecting the schema from `fields`
    pub fn assemble_auto(&self, fields: &Fields) -> Result<String> {
        assembler::assemble_auto(&self.registry, self.enricher.as_ref(), fields)
    }

    pub fn list_families(&self) -> Result<Vec<String>> {
        Ok(self.registry.list_families()?)
    }

    pub fn list_versions(&self, family: &str) -> Result<Vec<VersionSummary>> {
        Ok(self.registry.list_versions(family)?)
    }

    pub fn describe(&self, family: &str, version: Option<&str>) -> Result<SchemaDescription> {
        self.registry.describe(family, version)
    }

    pub fn search_families(&self, query: &str, limit: usize) -> Result<Vec<FamilyMatch>> {
        Ok(self.registry.search_families(query, limit)?)
    }

    /// Round-trip every declared example
    pub fn validate_examples(&self) -> Result<ValidationReport> {
        validator::validate_examples(&self.registry, self.enricher.as_ref())
    }

    pub fn clear_cache(&self) {
        self.registry.clear_cache();
    }
}

impl Default for NamingEngine {
    fn default() -> Self {
        Self::bundled()
    }
}
