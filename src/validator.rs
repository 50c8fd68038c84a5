//! Round-trip validation of schema examples
//!
//! Every example a schema declares must survive two round trips:
//! - parse with its own schema, then assemble with the same schema
//! - `parse_auto`, then `assemble_auto`
//!
//! Both must reproduce the example exactly.

use serde::Serialize;

use crate::assembler::{assemble_at, assemble_auto};
use crate::enrich::FieldEnricher;
use crate::error::Result;
use crate::parser::{attempt, parse_auto, ParseOutcome};
use crate::registry::SchemaRegistry;

/// Placeholder example name for a schema that failed to load
pub const SCHEMA_PLACEHOLDER: &str = "<schema>";

/// One example that failed to round-trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExampleFailure {
    /// Schema path relative to the schema source
    pub path: String,
    pub example: String,
    pub reason: String,
}

/// Outcome of validating every schema's examples
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub schemas: usize,
    pub examples: usize,
    pub failures: Vec<ExampleFailure>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Validate the examples of every discovered schema
pub fn validate_examples(registry: &SchemaRegistry, enricher: &dyn FieldEnricher) -> Result<ValidationReport> {
    let discovery = registry.discover()?;
    let mut report = ValidationReport::default();

    for location in &discovery.locations {
        let path = registry.source().relative(location);
        let fail = |example: &str, reason: String| {
            tracing::warn!("{}: {} -> {}", path, example, reason);
            ExampleFailure {
                path: path.clone(),
                example: example.to_string(),
                reason,
            }
        };

        let doc = match registry.load(location) {
            Ok(doc) => doc,
            Err(e) => {
                report
                    .failures
                    .push(fail(SCHEMA_PLACEHOLDER, format!("failed to load schema: {}", e)));
                continue;
            }
        };
        report.schemas += 1;

        for example in &doc.examples {
            report.examples += 1;

            let own = match attempt(registry, Some(&*discovery), enricher, example, location) {
                ParseOutcome::Success(result) => assemble_at(registry, enricher, &result.fields, location)
                    .map_err(|e| e.to_string()),
                ParseOutcome::NearMiss(e) => Err(e.to_string()),
                ParseOutcome::LoadError(e) => Err(e.to_string()),
                ParseOutcome::NotFound => Err("example does not match its own schema".to_string()),
            };
            match own {
                Ok(rebuilt) if rebuilt == *example => {}
                Ok(rebuilt) => report
                    .failures
                    .push(fail(example, format!("round-trip mismatch: {:?}", rebuilt))),
                Err(reason) => report.failures.push(fail(example, reason)),
            }

            let auto = parse_auto(registry, enricher, example)
                .and_then(|result| assemble_auto(registry, enricher, &result.fields));
            match auto {
                Ok(rebuilt) if rebuilt == *example => {}
                Ok(rebuilt) => report
                    .failures
                    .push(fail(example, format!("auto round-trip mismatch: {:?}", rebuilt))),
                Err(e) => report.failures.push(fail(example, format!("auto round trip: {}", e))),
            }
        }
    }

    tracing::debug!(
        "Validated {} example(s) across {} schema(s), {} failure(s)",
        report.examples,
        report.schemas,
        report.failures.len()
    );
    Ok(report)
}
