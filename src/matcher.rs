//! Compiled schemas and filename matching

use regex::Regex;
use std::collections::BTreeMap;

use crate::cache::PatternCache;
use crate::error::{SchemaLoadError, TemplateError};
use crate::pattern::{named_group_spans, GroupSpan};
use crate::schema::{SchemaDocument, SchemaLocation};
use crate::template::Template;

/// Field values extracted from, or supplied for, a filename
pub type Fields = BTreeMap<String, String>;

/// A schema document compiled into an anchored matcher
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub pattern: String,
    pub regex: Regex,
    pub field_order: Vec<String>,
    pub spans: Vec<GroupSpan>,
    pub template: Template,
}

impl CompiledSchema {
    pub fn compile(
        doc: &SchemaDocument,
        location: &SchemaLocation,
        patterns: &PatternCache,
    ) -> Result<Self, SchemaLoadError> {
        let template_error = |source: TemplateError| SchemaLoadError::Template {
            location: location.to_string(),
            source,
        };

        let template = Template::parse(&doc.template).map_err(template_error)?;
        let compiled = template.compile(&doc.fields);
        let regex = patterns.regex(&compiled.pattern).map_err(|err| {
            template_error(TemplateError::InvalidRegex {
                pattern: compiled.pattern.clone(),
                message: err.to_string(),
            })
        })?;
        let spans = named_group_spans(&compiled.pattern);

        tracing::debug!("Compiled {} to {}", location, compiled.pattern);

        Ok(Self {
            pattern: compiled.pattern,
            regex,
            field_order: compiled.field_order,
            spans,
            template,
        })
    }

    /// Span of the capture group for `name`
    pub fn span(&self, name: &str) -> Option<&GroupSpan> {
        self.spans.iter().find(|span| span.name == name)
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Named captures of a full match; groups that did not participate are absent
    pub fn captures(&self, name: &str) -> Option<Fields> {
        let caps = self.regex.captures(name)?;
        let fields = self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|group| {
                caps.name(group)
                    .map(|m| (group.to_string(), m.as_str().to_string()))
            })
            .collect();
        Some(fields)
    }
}

/// Match `name` against a compiled schema
pub fn match_filename(name: &str, compiled: &CompiledSchema) -> Option<Fields> {
    compiled.captures(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn doc(template: &str, fields: serde_json::Value) -> SchemaDocument {
        serde_json::from_value(serde_json::json!({
            "schema_id": "test:demo:abc",
            "schema_version": "1.0.0",
            "template": template,
            "fields": fields,
        }))
        .unwrap()
    }

    fn location() -> SchemaLocation {
        SchemaLocation::File(PathBuf::from("abc_filename_v1_0_0.json"))
    }

    #[test]
    fn test_captures_skip_non_participating_groups() {
        let patterns = PatternCache::new();
        let compiled = CompiledSchema::compile(
            &doc("{a}_{b}[_{c}]", serde_json::json!({"a": {"enum": ["X"]}, "b": {"pattern": "[0-9]+"}})),
            &location(),
            &patterns,
        )
        .unwrap();

        let fields = match_filename("X_12", &compiled).unwrap();
        assert_eq!(fields.get("a").map(String::as_str), Some("X"));
        assert_eq!(fields.get("b").map(String::as_str), Some("12"));
        assert!(!fields.contains_key("c"));

        let fields = match_filename("X_12_hello", &compiled).unwrap();
        assert_eq!(fields.get("c").map(String::as_str), Some("hello"));

        assert!(match_filename("Y_12", &compiled).is_none());
    }

    #[test]
    fn test_spans_follow_field_order() {
        let patterns = PatternCache::new();
        let compiled =
            CompiledSchema::compile(&doc("{a}-{b}", serde_json::json!({})), &location(), &patterns).unwrap();
        let a = compiled.span("a").unwrap();
        let b = compiled.span("b").unwrap();
        assert!(a.end <= b.start);
        assert!(compiled.span("zz").is_none());
    }

    #[test]
    fn test_bad_template_is_a_load_error() {
        let patterns = PatternCache::new();
        let err = CompiledSchema::compile(&doc("{a", serde_json::json!({})), &location(), &patterns).unwrap_err();
        assert!(matches!(err, SchemaLoadError::Template { .. }));
    }

    #[test]
    fn test_bad_field_pattern_is_a_load_error() {
        let patterns = PatternCache::new();
        let err = CompiledSchema::compile(
            &doc("{a}", serde_json::json!({"a": {"pattern": "[0-9"}})),
            &location(),
            &patterns,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaLoadError::Template {
                source: TemplateError::InvalidRegex { .. },
                ..
            }
        ));
    }
}
