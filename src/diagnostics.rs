//! Near-miss analysis
//!
//! When a filename fails to match a schema, walk the template's fields in
//! order and find the first one whose value breaks its constraint. Each step
//! matches a truncated copy of the compiled pattern: the pattern through the
//! end of the *next* field's group, followed by `.*$`. The first window that
//! fails localizes the problem to the current field or the one after it.
//!
//! Compound mismatches (several fields wrong at once, or a field whose greedy
//! match swallows its neighbour) are not exhaustively explained; the report
//! names the first field the scan can pin down.

use serde::Serialize;

use crate::cache::PatternCache;
use crate::field::{leading_field_regex, FieldSpec};
use crate::matcher::CompiledSchema;
use crate::pattern::{balanced_prefix, balanced_slice};
use crate::schema::SchemaDocument;

/// The field a filename diverges at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NearMiss {
    pub field: String,
    /// Human description of the violated constraint
    pub expected: String,
    /// Offending substring of the filename
    pub value: String,
    /// Byte offset of `value` in the filename
    pub offset: usize,
}

/// Characters that delimit the offending token
const TOKEN_SEPARATORS: [char; 3] = ['_', '.', '-'];

/// Diagnose why `name` does not match `compiled`
///
/// Returns `None` when no field can be blamed.
pub fn explain_match_failure(
    name: &str,
    doc: &SchemaDocument,
    compiled: &CompiledSchema,
    patterns: &PatternCache,
) -> Option<NearMiss> {
    let pattern = compiled.pattern.as_str();
    let order = &compiled.field_order;

    for (i, field) in order.iter().enumerate() {
        let Some(span) = compiled.span(field) else {
            continue;
        };
        let next = order.get(i + 1).and_then(|n| compiled.span(n).map(|s| (n, s)));

        let window_end = next.map(|(_, s)| s.end).unwrap_or(pattern.len());
        let window = format!("{}.*$", balanced_slice(pattern, window_end));
        match patterns.regex(&window) {
            Ok(rx) if rx.is_match(name) => continue,
            Ok(_) => {}
            Err(_) => continue,
        }

        let mut target = field;
        let mut offset = prefix_len(balanced_prefix(pattern, span.start), name, patterns).unwrap_or(0);
        let Ok(mut satisfied) = field_holds(doc.field_spec(target), &name[offset..], patterns) else {
            continue;
        };

        if satisfied {
            if let Some((next_name, next_span)) = next {
                offset = prefix_len(balanced_prefix(pattern, next_span.start), name, patterns)
                    .or_else(|| prefix_len(balanced_slice(pattern, span.end), name, patterns))
                    .unwrap_or(offset);
                target = next_name;
                satisfied = match field_holds(doc.field_spec(target), &name[offset..], patterns) {
                    Ok(holds) => holds,
                    Err(_) => continue,
                };
            }
        }
        if satisfied {
            continue;
        }

        let near_miss = NearMiss {
            field: target.clone(),
            expected: expected_for(doc.field_spec(target)),
            value: offending_token(name, offset).to_string(),
            offset,
        };
        tracing::debug!(
            "{} diverges from {} at field {} ({:?})",
            name,
            doc.schema_id,
            near_miss.field,
            near_miss.value
        );
        return Some(near_miss);
    }

    None
}

/// Length of the leading match of `pattern` against `name`
fn prefix_len(pattern: &str, name: &str, patterns: &PatternCache) -> Option<usize> {
    let rx = patterns.regex(pattern).ok()?;
    rx.find(name).filter(|m| m.start() == 0).map(|m| m.end())
}

fn field_holds(
    spec: Option<&FieldSpec>,
    rest: &str,
    patterns: &PatternCache,
) -> Result<bool, regex::Error> {
    Ok(leading_field_regex(spec, patterns)?.is_match(rest))
}

fn expected_for(spec: Option<&FieldSpec>) -> String {
    spec.map(FieldSpec::expected)
        .unwrap_or_else(|| FieldSpec::unconstrained().expected())
}

/// Token of `name` starting at `start`, bounded by the nearest separator
///
/// A separator sitting exactly at `start` is returned on its own.
pub fn offending_token(name: &str, start: usize) -> &str {
    let start = start.min(name.len());
    let mut end = name.len();
    for sep in TOKEN_SEPARATORS {
        if let Some(found) = name[start..].find(sep) {
            let idx = start + found;
            let boundary = if idx > start { idx } else { idx + sep.len_utf8() };
            end = end.min(boundary);
        }
    }
    &name[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaLocation;
    use std::path::PathBuf;

    fn schema(template: &str, fields: serde_json::Value) -> (SchemaDocument, CompiledSchema, PatternCache) {
        let doc: SchemaDocument = serde_json::from_value(serde_json::json!({
            "schema_id": "test:demo:abc",
            "schema_version": "1.0.0",
            "template": template,
            "fields": fields,
        }))
        .unwrap();
        let patterns = PatternCache::new();
        let location = SchemaLocation::File(PathBuf::from("abc_filename_v1_0_0.json"));
        let compiled = CompiledSchema::compile(&doc, &location, &patterns).unwrap();
        (doc, compiled, patterns)
    }

    fn demo() -> (SchemaDocument, CompiledSchema, PatternCache) {
        schema(
            "{platform}_{level}_{date}.{ext}",
            serde_json::json!({
                "platform": {"enum": ["S2A", "S2B"]},
                "level": {"enum": ["L1C", "L2A"]},
                "date": {"pattern": "[0-9]{8}"},
                "ext": {"enum": ["SAFE"]}
            }),
        )
    }

    #[test]
    fn test_first_field_mismatch() {
        let (doc, compiled, patterns) = demo();
        let miss = explain_match_failure("S2X_L1C_20240101.SAFE", &doc, &compiled, &patterns).unwrap();
        assert_eq!(miss.field, "platform");
        assert_eq!(miss.value, "S2X");
        assert_eq!(miss.offset, 0);
        assert_eq!(miss.expected, "one of [\"S2A\", \"S2B\"]");
    }

    #[test]
    fn test_middle_field_mismatch() {
        let (doc, compiled, patterns) = demo();
        let miss = explain_match_failure("S2A_L9Z_20240101.SAFE", &doc, &compiled, &patterns).unwrap();
        assert_eq!(miss.field, "level");
        assert_eq!(miss.value, "L9Z");
        assert_eq!(miss.offset, 4);
    }

    #[test]
    fn test_pattern_field_mismatch() {
        let (doc, compiled, patterns) = demo();
        let miss = explain_match_failure("S2A_L2A_2024AB01.SAFE", &doc, &compiled, &patterns).unwrap();
        assert_eq!(miss.field, "date");
        assert_eq!(miss.value, "2024AB01");
        assert_eq!(miss.expected, "pattern [0-9]{8}");
    }

    #[test]
    fn test_last_field_mismatch() {
        let (doc, compiled, patterns) = demo();
        let miss = explain_match_failure("S2A_L2A_20240101.ZIP", &doc, &compiled, &patterns).unwrap();
        assert_eq!(miss.field, "ext");
        assert_eq!(miss.value, "ZIP");
    }

    #[test]
    fn test_matching_name_has_no_near_miss() {
        let (doc, compiled, patterns) = demo();
        assert!(explain_match_failure("S2A_L2A_20240101.SAFE", &doc, &compiled, &patterns).is_none());
    }

    #[test]
    fn test_offending_token_boundaries() {
        assert_eq!(offending_token("S2X_MSIL1C", 0), "S2X");
        assert_eq!(offending_token("AB-CD.EF", 3), "CD");
        assert_eq!(offending_token("A_.x", 2), ".");
        assert_eq!(offending_token("tail", 2), "il");
        assert_eq!(offending_token("abc", 7), "");
    }
}
