//! Field enrichment hooks
//!
//! Parsing hands every successful match to a [`FieldEnricher`], and assembly
//! runs supplied fields through [`FieldEnricher::to_tokens`] first, so a
//! caller can work in semantic values while filenames keep their tokens.
//!
//! [`StacMapEnricher`] implements the mapping a schema declares per field:
//!
//! ```json
//! "platform": {
//!   "enum": ["S2A", "S2B"],
//!   "stac_map": {
//!     "preserve_original_as": "platform_code",
//!     "values": {"S2A": {"platform": "sentinel-2a", "constellation": "sentinel-2"}}
//!   }
//! }
//! ```
//!
//! The `values` wrapper is optional; a bare token map is accepted too.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::field::value_to_string;
use crate::matcher::Fields;
use crate::schema::SchemaDocument;

/// Translation between filename tokens and caller-facing values
pub trait FieldEnricher: Send + Sync {
    /// Augment fields extracted from a filename
    fn enrich(&self, fields: Fields, schema: &SchemaDocument) -> Fields;

    /// Map caller-facing values back to the tokens the template expects
    fn to_tokens(&self, fields: Fields, schema: &SchemaDocument) -> Fields;
}

/// Passes fields through untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEnricher;

impl FieldEnricher for NoopEnricher {
    fn enrich(&self, fields: Fields, _schema: &SchemaDocument) -> Fields {
        fields
    }

    fn to_tokens(&self, fields: Fields, _schema: &SchemaDocument) -> Fields {
        fields
    }
}

/// Applies the `stac_map` declarations of a schema's fields
#[derive(Debug, Default, Clone, Copy)]
pub struct StacMapEnricher;

/// Token mapping declared for one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    /// Key that keeps the raw token after enrichment
    pub preserve_as: String,
    /// token → (target field → value)
    pub token_map: BTreeMap<String, Fields>,
}

/// Mappings declared by `schema`, keyed by field name
pub fn field_mappings(schema: &SchemaDocument) -> BTreeMap<String, FieldMapping> {
    let mut mappings = BTreeMap::new();
    for (name, spec) in &schema.fields {
        let Some(Value::Object(raw)) = &spec.stac_map else {
            continue;
        };
        let values = match raw.get("values") {
            Some(Value::Object(values)) => values,
            Some(_) => continue,
            None => raw,
        };

        let token_map: BTreeMap<String, Fields> = values
            .iter()
            .filter_map(|(token, targets)| match targets {
                Value::Object(targets) => Some((
                    token.clone(),
                    targets
                        .iter()
                        .map(|(k, v)| (k.clone(), value_to_string(v)))
                        .collect(),
                )),
                _ => None,
            })
            .collect();
        if token_map.is_empty() {
            continue;
        }

        let preserve_as = match raw.get("preserve_original_as") {
            Some(Value::String(key)) if !key.is_empty() => key.clone(),
            _ => format!("{}_code", name),
        };

        mappings.insert(
            name.clone(),
            FieldMapping {
                preserve_as,
                token_map,
            },
        );
    }
    mappings
}

impl FieldEnricher for StacMapEnricher {
    fn enrich(&self, fields: Fields, schema: &SchemaDocument) -> Fields {
        let mut enriched = fields.clone();
        for (name, mapping) in field_mappings(schema) {
            let Some(token) = fields.get(&name) else {
                continue;
            };
            enriched.insert(mapping.preserve_as.clone(), token.clone());
            if let Some(targets) = mapping.token_map.get(token) {
                enriched.extend(targets.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        enriched
    }

    fn to_tokens(&self, fields: Fields, schema: &SchemaDocument) -> Fields {
        let mut translated = fields.clone();
        for (name, mapping) in field_mappings(schema) {
            let preserved = fields
                .get(&mapping.preserve_as)
                .filter(|token| !token.is_empty())
                .cloned();
            let token = preserved
                .or_else(|| {
                    fields
                        .get(&name)
                        .filter(|value| mapping.token_map.contains_key(*value))
                        .cloned()
                })
                .or_else(|| {
                    // first token, in token order, whose targets are all present
                    mapping
                        .token_map
                        .iter()
                        .find(|(_, targets)| targets.iter().all(|(k, v)| fields.get(k) == Some(v)))
                        .map(|(token, _)| token.clone())
                });
            if let Some(token) = token {
                translated.insert(name, token);
            }
        }
        translated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SchemaDocument {
        serde_json::from_value(serde_json::json!({
            "schema_id": "test:demo:abc",
            "schema_version": "1.0.0",
            "template": "{platform}_{level}",
            "fields": {
                "platform": {
                    "enum": ["S2A", "S2B"],
                    "stac_map": {
                        "values": {
                            "S2A": {"platform": "sentinel-2a", "constellation": "sentinel-2"},
                            "S2B": {"platform": "sentinel-2b", "constellation": "sentinel-2"}
                        }
                    }
                },
                "level": {
                    "enum": ["L1C"],
                    "stac_map": {
                        "preserve_original_as": "level_token",
                        "L1C": {"processing:level": "L1"}
                    }
                }
            }
        }))
        .unwrap()
    }

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_field_mappings_defaults() {
        let mappings = field_mappings(&schema());
        assert_eq!(mappings["platform"].preserve_as, "platform_code");
        assert_eq!(mappings["level"].preserve_as, "level_token");
        assert_eq!(mappings["level"].token_map["L1C"]["processing:level"], "L1");
    }

    #[test]
    fn test_enrich_preserves_token_and_adds_targets() {
        let enriched = StacMapEnricher.enrich(fields(&[("platform", "S2A"), ("level", "L1C")]), &schema());
        assert_eq!(enriched["platform"], "sentinel-2a");
        assert_eq!(enriched["platform_code"], "S2A");
        assert_eq!(enriched["constellation"], "sentinel-2");
        assert_eq!(enriched["level_token"], "L1C");
        assert_eq!(enriched["processing:level"], "L1");
    }

    #[test]
    fn test_to_tokens_inverts_enrich() {
        let schema = schema();
        let original = fields(&[("platform", "S2B"), ("level", "L1C")]);
        let enriched = StacMapEnricher.enrich(original.clone(), &schema);
        let tokens = StacMapEnricher.to_tokens(enriched, &schema);
        assert_eq!(tokens["platform"], "S2B");
        assert_eq!(tokens["level"], "L1C");
    }

    #[test]
    fn test_to_tokens_from_targets_only() {
        let tokens = StacMapEnricher.to_tokens(
            fields(&[("platform", "sentinel-2b"), ("constellation", "sentinel-2")]),
            &schema(),
        );
        assert_eq!(tokens["platform"], "S2B");
    }

    #[test]
    fn test_noop_passes_through() {
        let input = fields(&[("platform", "S2A")]);
        assert_eq!(NoopEnricher.enrich(input.clone(), &schema()), input);
    }
}
