//! Filename assembly
//!
//! The inverse of parsing: validate caller-supplied fields against a schema
//! and render its template. [`assemble_auto`] picks the schema itself, keyed
//! on the first compulsory field of each template.

use std::collections::BTreeSet;

use crate::enrich::FieldEnricher;
use crate::error::{AssemblyError, Result};
use crate::field::FieldConstraint;
use crate::matcher::Fields;
use crate::parser::SchemaRef;
use crate::registry::{LoadedSchema, SchemaRegistry};
use crate::schema::{SchemaDocument, SchemaLocation};

/// Assemble a filename with an explicitly named schema
pub fn assemble(
    registry: &SchemaRegistry,
    enricher: &dyn FieldEnricher,
    fields: &Fields,
    schema: &SchemaRef,
) -> Result<String> {
    let location = schema.locate(registry)?;
    assemble_at(registry, enricher, fields, &location)
}

/// Assemble a filename, selecting the schema from the supplied fields
pub fn assemble_auto(
    registry: &SchemaRegistry,
    enricher: &dyn FieldEnricher,
    fields: &Fields,
) -> Result<String> {
    let location = select_schema(registry, enricher, fields)?;
    assemble_at(registry, enricher, fields, &location)
}

/// Assemble with the schema at `location`
pub fn assemble_at(
    registry: &SchemaRegistry,
    enricher: &dyn FieldEnricher,
    fields: &Fields,
    location: &SchemaLocation,
) -> Result<String> {
    let schema = registry.open_schema(location)?;
    let schema_label = registry.source().relative(location);
    Ok(assemble_document(registry, enricher, fields, &schema, &schema_label)?)
}

fn assemble_document(
    registry: &SchemaRegistry,
    enricher: &dyn FieldEnricher,
    fields: &Fields,
    schema: &LoadedSchema,
    schema_label: &str,
) -> std::result::Result<String, AssemblyError> {
    let doc = &schema.document;
    let tokens = enricher.to_tokens(fields.clone(), doc);
    validate_fields(registry, doc, &tokens)?;

    schema
        .compiled
        .template
        .render(&tokens)
        .map_err(|field| AssemblyError::MissingField {
            field,
            schema: schema_label.to_string(),
        })
}

/// Check every supplied field that has a spec
fn validate_fields(
    registry: &SchemaRegistry,
    doc: &SchemaDocument,
    fields: &Fields,
) -> std::result::Result<(), AssemblyError> {
    for (name, value) in fields {
        let Some(spec) = doc.field_spec(name) else {
            continue;
        };
        match &spec.constraint {
            FieldConstraint::Enum(allowed) => {
                if !allowed.contains(value) {
                    return Err(AssemblyError::InvalidEnum {
                        field: name.clone(),
                        value: value.clone(),
                        allowed: allowed.clone(),
                    });
                }
            }
            FieldConstraint::Pattern(pattern) => {
                // a fragment that does not compile accepts nothing
                if !spec.accepts(value, registry.patterns()).unwrap_or(false) {
                    return Err(AssemblyError::InvalidPattern {
                        field: name.clone(),
                        value: value.clone(),
                        pattern: pattern.clone(),
                    });
                }
            }
            FieldConstraint::Unconstrained => {}
        }
    }
    Ok(())
}

/// First field of `order` a caller must supply to select `doc`
///
/// Single-valued enums the caller already filled in are skipped. `None` means
/// the schema cannot be selected: either a supplied enum value falls outside
/// its enum, or every field was skipped.
pub fn first_compulsory_field(doc: &SchemaDocument, order: &[String], fields: &Fields) -> Option<String> {
    for name in order {
        let supplied = fields.get(name);
        match doc.field_spec(name).and_then(|spec| spec.enum_values()) {
            Some([only]) if supplied == Some(only) => continue,
            Some(values) => {
                if supplied.map(|v| !values.contains(v)).unwrap_or(false) {
                    return None;
                }
                return Some(name.clone());
            }
            None => return Some(name.clone()),
        }
    }
    None
}

/// Pick the schema best matching `fields`
///
/// Eligible schemas are those whose first compulsory field was supplied. The
/// winner has the most supplied fields in its template, then the longest
/// template, then the greatest path.
pub fn select_schema(
    registry: &SchemaRegistry,
    enricher: &dyn FieldEnricher,
    fields: &Fields,
) -> Result<SchemaLocation> {
    let discovery = registry.discover()?;
    let mut seen_first_fields = BTreeSet::new();
    let mut best: Option<((usize, usize, String), SchemaLocation)> = None;

    for location in &discovery.locations {
        let schema = match registry.open_schema(location) {
            Ok(schema) => schema,
            Err(e) => {
                tracing::debug!("Skipping {} during schema selection: {}", location, e);
                continue;
            }
        };
        let order = &schema.compiled.field_order;
        let tokens = enricher.to_tokens(fields.clone(), &schema.document);

        let Some(first) = first_compulsory_field(&schema.document, order, &tokens) else {
            continue;
        };
        let eligible = tokens.contains_key(&first);
        seen_first_fields.insert(first);
        if !eligible {
            continue;
        }

        let overlap = tokens.keys().filter(|k| order.contains(k)).count();
        let rank = (overlap, order.len(), registry.source().relative(location));
        if best.as_ref().map(|(current, _)| rank > *current).unwrap_or(true) {
            best = Some((rank, location.clone()));
        }
    }

    match best {
        Some((rank, location)) => {
            tracing::debug!("Selected {} (overlap {}, {} fields)", rank.2, rank.0, rank.1);
            Ok(location)
        }
        None => Err(AssemblyError::NoSchemaSelected {
            first_fields: seen_first_fields.into_iter().collect(),
        }
        .into()),
    }
}
