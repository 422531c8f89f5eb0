//! Route template matching.
//!
//! A template is a path whose variable segments are written `:name` or `[name]`. Each
//! variable matches exactly one non-empty segment, so `/blog/:slug` covers
//! `/blog/ramazan-2026` but not `/blog/ramazan-2026/extra`. A final catch-all segment
//! (`*name` or `[...name]`) matches one or more trailing segments.

use regex::Regex;
use thiserror::Error;

use super::normalize;
use crate::models::ContentType;

/// Errors raised while compiling a route template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("route template {0:?} does not start with '/'")]
    NotAPath(String),

    #[error("route template {0:?} has a variable segment without a name")]
    UnnamedVariable(String),

    #[error("route template {0:?} has a catch-all segment before its last segment")]
    CatchAllNotLast(String),

    #[error("route template {template:?} could not be compiled: {source}")]
    Regex {
        template: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable,
    CatchAll,
}

impl Segment {
    /// Parse one segment. `None` means a variable without a name.
    fn parse(raw: &str) -> Option<Self> {
        let named = |name: &str, segment: Segment| (!name.is_empty()).then_some(segment);

        if let Some(inner) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            match inner.strip_prefix("...") {
                Some(name) => named(name, Segment::CatchAll),
                None => named(inner, Segment::Variable),
            }
        } else if let Some(name) = raw.strip_prefix(':') {
            named(name, Segment::Variable)
        } else if let Some(name) = raw.strip_prefix('*') {
            named(name, Segment::CatchAll)
        } else {
            Some(Segment::Literal(raw.to_string()))
        }
    }

    fn pattern(&self) -> String {
        match self {
            Segment::Literal(text) => regex::escape(text),
            Segment::Variable => "[^/]+".to_string(),
            Segment::CatchAll => "[^/]+(?:/[^/]+)*".to_string(),
        }
    }
}

/// A template compiled once and matched many times.
#[derive(Debug, Clone)]
pub struct RouteTemplate {
    source: String,
    matcher: Regex,
}

impl RouteTemplate {
    /// Compile a template. The template is normalized the same way URLs are.
    pub fn compile(template: &str) -> Result<Self, TemplateError> {
        let source = normalize(template);
        if !source.starts_with('/') {
            return Err(TemplateError::NotAPath(template.to_string()));
        }

        let segments = if source == "/" {
            Vec::new()
        } else {
            source[1..]
                .split('/')
                .map(Segment::parse)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| TemplateError::UnnamedVariable(template.to_string()))?
        };

        let catch_all_misplaced = segments
            .iter()
            .rev()
            .skip(1)
            .any(|s| matches!(s, Segment::CatchAll));
        if catch_all_misplaced {
            return Err(TemplateError::CatchAllNotLast(template.to_string()));
        }

        let body: String = segments
            .iter()
            .map(|s| format!("/{}", s.pattern()))
            .collect();
        let pattern = if body.is_empty() {
            "^/$".to_string()
        } else {
            format!("^{}$", body)
        };

        let matcher = Regex::new(&pattern).map_err(|source| TemplateError::Regex {
            template: template.to_string(),
            source,
        })?;

        Ok(Self { source, matcher })
    }

    /// Normalized template text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match an already-normalized URL key.
    pub fn matches(&self, normalized_url: &str) -> bool {
        self.matcher.is_match(normalized_url)
    }
}

/// Compile-and-match convenience; an invalid template matches nothing.
pub fn matches(template: &str, normalized_url: &str) -> bool {
    RouteTemplate::compile(template)
        .map(|t| t.matches(normalized_url))
        .unwrap_or(false)
}

/// Templates declared by an inventory, compiled once per run.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: Vec<(RouteTemplate, ContentType)>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, template: RouteTemplate, content_type: ContentType) {
        self.templates.push((template, content_type));
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// First template covering the key.
    pub fn find(&self, normalized_url: &str) -> Option<&RouteTemplate> {
        self.templates
            .iter()
            .map(|(t, _)| t)
            .find(|t| t.matches(normalized_url))
    }

    /// Whether a declared template's own key equals the given key.
    pub fn declares(&self, normalized_key: &str) -> bool {
        self.templates.iter().any(|(t, _)| t.as_str() == normalized_key)
    }

    /// Number of templates declared for a content type.
    pub fn count_for(&self, content_type: &ContentType) -> usize {
        self.templates
            .iter()
            .filter(|(_, ct)| ct == content_type)
            .count()
    }
}
