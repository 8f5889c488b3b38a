use crate::router::RouteError;
use std::sync::Arc;

/// One `/` separated piece of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Static(String),
    /// `:name`, matches exactly one non-empty path segment.
    Named(Arc<str>),
    /// `*name`, matches the rest of the path, only allowed as the last segment.
    Wildcard(Arc<str>),
}

/// A route pattern split into segments.
///
/// The leading `/` is not a segment of its own: `/` parses to a single empty static segment
/// and `/books/` to `books` followed by an empty static segment, so a trailing slash is
/// significant.
#[derive(Debug, Clone)]
pub(crate) struct Pattern {
    raw: Arc<str>,
    segments: Vec<Segment>,
}

impl Pattern {
    pub(crate) fn parse(raw: &str) -> Result<Self, RouteError> {
        let Some(rest) = raw.strip_prefix('/') else {
            return Err(RouteError::invalid_pattern(raw, "a route must start with '/'"));
        };

        let mut segments = Vec::new();
        let mut names: Vec<Arc<str>> = Vec::new();
        let mut parts = rest.split('/').peekable();

        while let Some(part) = parts.next() {
            let segment = match part.as_bytes().first() {
                Some(b':') => Segment::Named(parse_name(raw, &part[1..], &mut names)?),
                Some(b'*') => {
                    let name = parse_name(raw, &part[1..], &mut names)?;
                    if parts.peek().is_some() {
                        return Err(RouteError::NonTerminalWildcard { pattern: raw.to_string(), name: name.to_string() });
                    }
                    Segment::Wildcard(name)
                }
                _ => Segment::Static(part.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self { raw: Arc::from(raw), segments })
    }

    pub(crate) fn raw(&self) -> &Arc<str> {
        &self.raw
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

fn parse_name(raw: &str, name: &str, seen: &mut Vec<Arc<str>>) -> Result<Arc<str>, RouteError> {
    if name.is_empty() {
        return Err(RouteError::invalid_pattern(raw, "parameter names must not be empty"));
    }
    if name.contains([':', '*']) {
        return Err(RouteError::invalid_pattern(raw, "only one parameter is allowed per segment"));
    }
    if seen.iter().any(|existing| existing.as_ref() == name) {
        return Err(RouteError::DuplicateParam { pattern: raw.to_string(), name: name.to_string() });
    }

    let name = Arc::<str>::from(name);
    seen.push(Arc::clone(&name));
    Ok(name)
}
