//! Template DSL
//!
//! A template is literal text with `{field}` placeholders and `[...]` optional
//! segments, which may nest. No other character is interpreted.
//!
//! ```text
//! {platform}_{level}_{date}[_{band}][.{extension}]
//! ```
//!
//! The same parsed tree drives both directions: [`Template::compile`] turns it
//! into an anchored regex, [`Template::render`] turns field values back into a
//! filename.

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::TemplateError;
use crate::field::{field_fragment, FieldSpec};

/// One node of a parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Field(String),
    Optional(Vec<Segment>),
}

/// A parsed template string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

/// Output of the template compiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    /// Anchored regex source with one named group per distinct field
    pub pattern: String,
    /// Field names in first-seen template order
    pub field_order: Vec<String>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut chars = source.char_indices().peekable();
        let segments = parse_segments(&mut chars, None)?;
        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Compile into an anchored pattern
    ///
    /// A field referenced more than once is captured on first use only; later
    /// references match the same constraint without capturing.
    pub fn compile(&self, fields: &BTreeMap<String, FieldSpec>) -> CompiledTemplate {
        let mut pattern = String::from("^");
        let mut field_order = Vec::new();
        compile_segments(&self.segments, fields, &mut field_order, &mut pattern);
        pattern.push('$');
        CompiledTemplate {
            pattern,
            field_order,
        }
    }

    /// Render with `values`
    ///
    /// An optional segment is dropped as a whole when any field inside it is
    /// missing. A missing field outside every optional segment is returned as
    /// the error.
    pub fn render(&self, values: &BTreeMap<String, String>) -> Result<String, String> {
        let mut out = String::new();
        render_segments(&self.segments, values, &mut out)?;
        Ok(out)
    }
}

/// Compile `template` against `fields` in one step
pub fn compile_template(
    template: &str,
    fields: &BTreeMap<String, FieldSpec>,
) -> Result<CompiledTemplate, TemplateError> {
    Ok(Template::parse(template)?.compile(fields))
}

fn parse_segments(
    chars: &mut Peekable<CharIndices<'_>>,
    opened_at: Option<usize>,
) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            '{' => {
                flush_literal(&mut literal, &mut segments);
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, c)) => name.push(c),
                        None => return Err(TemplateError::UnterminatedPlaceholder(offset)),
                    }
                }
                if name.is_empty() {
                    return Err(TemplateError::EmptyPlaceholder(offset));
                }
                segments.push(Segment::Field(name));
            }
            '[' => {
                flush_literal(&mut literal, &mut segments);
                let inner = parse_segments(chars, Some(offset))?;
                segments.push(Segment::Optional(inner));
            }
            ']' => {
                if opened_at.is_none() {
                    return Err(TemplateError::UnexpectedClose(offset));
                }
                flush_literal(&mut literal, &mut segments);
                return Ok(segments);
            }
            _ => literal.push(ch),
        }
    }

    if let Some(start) = opened_at {
        return Err(TemplateError::UnclosedOptional(start));
    }
    flush_literal(&mut literal, &mut segments);
    Ok(segments)
}

fn flush_literal(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

fn compile_segments(
    segments: &[Segment],
    fields: &BTreeMap<String, FieldSpec>,
    seen: &mut Vec<String>,
    out: &mut String,
) {
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(&regex::escape(text)),
            Segment::Field(name) => {
                let body = field_fragment(fields.get(name));
                if seen.contains(name) {
                    out.push_str(&format!("(?:{})", body));
                } else {
                    seen.push(name.clone());
                    out.push_str(&format!("(?P<{}>{})", name, body));
                }
            }
            Segment::Optional(inner) => {
                out.push_str("(?:");
                compile_segments(inner, fields, seen, out);
                out.push_str(")?");
            }
        }
    }
}

fn render_segments(
    segments: &[Segment],
    values: &BTreeMap<String, String>,
    out: &mut String,
) -> Result<(), String> {
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Field(name) => match values.get(name) {
                Some(value) => out.push_str(value),
                None => return Err(name.clone()),
            },
            Segment::Optional(inner) => {
                let mut rendered = String::new();
                if render_segments(inner, values, &mut rendered).is_ok() {
                    out.push_str(&rendered);
                }
            }
        }
    }
    Ok(())
}
