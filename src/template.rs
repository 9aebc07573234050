// src/template.rs

//! `{name}`-style templates, shared by dataset file naming and command lines.
//!
//! Syntax follows the usual brace convention:
//! - `{subject}` is a named field,
//! - `{{` and `}}` are literal braces,
//! - anything else inside braces (`{}`, `{0}`, `{x:>3}`) is rejected.

use std::collections::BTreeMap;

use regex::Regex;

use crate::errors::{PipebuildError, Result};

/// Value used for fields left unconstrained (mandatory patterns, folders).
pub const WILDCARD: &str = "%";

/// Field name → value mapping used to instantiate a template.
pub type Fields = BTreeMap<String, String>;

/// Build a [`Fields`] map from `(name, value)` pairs.
pub fn fields<I, K, V>(pairs: I) -> Fields
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    raw: String,
    segments: Vec<Segment>,
    /// Distinct field names in order of first appearance.
    fields: Vec<String>,
    /// Anchored regex accepting any rendering of this template.
    matcher: Regex,
}

impl Template {
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let segments = parse_segments(&raw)?;

        let mut fields: Vec<String> = Vec::new();
        let mut pattern = String::from("^");
        for segment in &segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Field(name) => {
                    if !fields.contains(name) {
                        fields.push(name.clone());
                    }
                    pattern.push_str("(.+?)");
                }
            }
        }
        pattern.push('$');

        let matcher = Regex::new(&pattern).map_err(|e| PipebuildError::MalformedTemplate {
            template: raw.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            raw,
            segments,
            fields,
            matcher,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Distinct field names, in order of first appearance.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Render the template, asking `lookup` for each field value.
    pub fn render_with<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => {
                    let value = lookup(name).ok_or_else(|| PipebuildError::MissingField {
                        template: self.raw.clone(),
                        field: name.clone(),
                    })?;
                    out.push_str(&value);
                }
            }
        }
        Ok(out)
    }

    pub fn render(&self, values: &Fields) -> Result<String> {
        self.render_with(|name| values.get(name).cloned())
    }

    /// Whether `text` could be a rendering of this template.
    pub fn matches(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

fn parse_segments(raw: &str) -> Result<Vec<Segment>> {
    let malformed = |reason: &str| PipebuildError::MalformedTemplate {
        template: raw.to_string(),
        reason: reason.to_string(),
    };

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => return Err(malformed("unclosed '{'")),
                    }
                }
                if !is_field_name(&name) {
                    return Err(malformed(&format!("invalid field name '{name}'")));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field(name));
            }
            '}' => return Err(malformed("unmatched '}'")),
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn is_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
