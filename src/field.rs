//! Field constraints declared by schema documents

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::PatternCache;

/// What a field's value must look like
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldConstraint {
    /// One of an enumerated set of literal values
    Enum(Vec<String>),
    /// A regex fragment, composed into the schema pattern
    Pattern(String),
    /// Anything, at least one character
    Unconstrained,
}

/// Constraint plus descriptive metadata for one named field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFieldSpec", into = "RawFieldSpec")]
pub struct FieldSpec {
    pub constraint: FieldConstraint,
    pub description: Option<String>,
    /// Declared value type (informational)
    pub kind: Option<String>,
    /// Token → semantic value mapping, see [`crate::enrich::StacMapEnricher`]
    pub stac_map: Option<Value>,
}

/// On-disk shape of a field spec
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawFieldSpec {
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stac_map: Option<Value>,
}

impl From<RawFieldSpec> for FieldSpec {
    fn from(raw: RawFieldSpec) -> Self {
        // enum takes precedence when both keys are present
        let constraint = match (raw.values, raw.pattern) {
            (Some(values), _) => FieldConstraint::Enum(values.iter().map(value_to_string).collect()),
            (None, Some(pattern)) => FieldConstraint::Pattern(pattern),
            (None, None) => FieldConstraint::Unconstrained,
        };
        Self {
            constraint,
            description: raw.description,
            kind: raw.kind,
            stac_map: raw.stac_map,
        }
    }
}

impl From<FieldSpec> for RawFieldSpec {
    fn from(spec: FieldSpec) -> Self {
        let (values, pattern) = match spec.constraint {
            FieldConstraint::Enum(values) => (Some(values.into_iter().map(Value::String).collect()), None),
            FieldConstraint::Pattern(pattern) => (None, Some(pattern)),
            FieldConstraint::Unconstrained => (None, None),
        };
        Self {
            values,
            pattern,
            description: spec.description,
            kind: spec.kind,
            stac_map: spec.stac_map,
        }
    }
}

/// Render a JSON scalar the way it appears inside a filename
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl FieldSpec {
    pub fn enumerated<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_constraint(FieldConstraint::Enum(values.into_iter().map(Into::into).collect()))
    }

    pub fn pattern(fragment: impl Into<String>) -> Self {
        Self::with_constraint(FieldConstraint::Pattern(fragment.into()))
    }

    pub fn unconstrained() -> Self {
        Self::with_constraint(FieldConstraint::Unconstrained)
    }

    fn with_constraint(constraint: FieldConstraint) -> Self {
        Self {
            constraint,
            description: None,
            kind: None,
            stac_map: None,
        }
    }

    /// Enumerated values, if this is an enum field
    pub fn enum_values(&self) -> Option<&[String]> {
        match &self.constraint {
            FieldConstraint::Enum(values) => Some(values),
            _ => None,
        }
    }

    /// Regex fragment for this field, safe to embed inside a group
    pub fn regex_fragment(&self) -> String {
        constraint_fragment(&self.constraint)
    }

    /// Human description of the constraint, used in diagnostics
    pub fn expected(&self) -> String {
        match &self.constraint {
            FieldConstraint::Enum(values) => format!("one of {:?}", values),
            FieldConstraint::Pattern(pattern) => format!("pattern {}", pattern),
            FieldConstraint::Unconstrained => "a different value".to_string(),
        }
    }

    /// Whether `value` as a whole satisfies the constraint
    pub fn accepts(&self, value: &str, patterns: &PatternCache) -> Result<bool, regex::Error> {
        match &self.constraint {
            FieldConstraint::Enum(values) => Ok(values.iter().any(|v| v == value)),
            FieldConstraint::Pattern(_) => {
                let rx = patterns.regex(&format!("^(?:{})$", self.regex_fragment()))?;
                Ok(rx.is_match(value))
            }
            FieldConstraint::Unconstrained => Ok(true),
        }
    }
}

/// Fragment for a field with an optional spec; no spec means `.+`
pub fn field_fragment(spec: Option<&FieldSpec>) -> String {
    spec.map(FieldSpec::regex_fragment)
        .unwrap_or_else(|| constraint_fragment(&FieldConstraint::Unconstrained))
}

/// Regex matching a field value at the start of the haystack
pub(crate) fn leading_field_regex(
    spec: Option<&FieldSpec>,
    patterns: &PatternCache,
) -> Result<Regex, regex::Error> {
    patterns.regex(&format!("^(?:{})", field_fragment(spec)))
}

fn constraint_fragment(constraint: &FieldConstraint) -> String {
    match constraint {
        FieldConstraint::Enum(values) => {
            let alternatives: Vec<String> = values.iter().map(|v| regex::escape(v)).collect();
            format!("(?:{})", alternatives.join("|"))
        }
        FieldConstraint::Pattern(pattern) => strip_anchors(pattern).to_string(),
        FieldConstraint::Unconstrained => ".+".to_string(),
    }
}

/// Drop a leading `^` and an unescaped trailing `$` so the fragment composes
fn strip_anchors(pattern: &str) -> &str {
    let mut fragment = pattern.strip_prefix('^').unwrap_or(pattern);
    if let Some(body) = fragment.strip_suffix('$') {
        let trailing_backslashes = body.chars().rev().take_while(|c| *c == '\\').count();
        if trailing_backslashes % 2 == 0 {
            fragment = body;
        }
    }
    fragment
}
