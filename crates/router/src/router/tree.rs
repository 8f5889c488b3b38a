//! The per-method route trie.
//!
//! Every node has static children keyed by their literal segment, at most one named child and
//! at most one wildcard acceptor. Lookups prefer static over named over wildcard at every
//! depth and fall back to the next kind when the preferred branch fails further down.

use crate::router::pattern::{Pattern, Segment};
use crate::router::RouteError;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct Node<T> {
    statics: HashMap<String, Node<T>>,
    named: Option<Box<Named<T>>>,
    wildcard: Option<Wildcard<T>>,
    value: Option<(Arc<str>, T)>,
}

#[derive(Debug)]
struct Named<T> {
    name: Arc<str>,
    pattern: Arc<str>,
    node: Node<T>,
}

#[derive(Debug)]
struct Wildcard<T> {
    name: Arc<str>,
    pattern: Arc<str>,
    value: T,
}

/// Captured `(name, value)` pairs, borrowed from the trie and the request path.
pub(crate) type Captures<'t, 'p> = Vec<(&'t Arc<str>, &'p str)>;

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self { statics: HashMap::new(), named: None, wildcard: None, value: None }
    }
}

impl<T> Node<T> {
    /// Inserts `value` under `pattern`.
    ///
    /// Nothing is modified when an error is returned: a conflict can only be detected on nodes
    /// that already exist, and nodes created by this call are empty.
    pub(crate) fn insert(&mut self, pattern: &Pattern, value: T) -> Result<(), RouteError> {
        let mut node = self;

        for segment in pattern.segments() {
            node = match segment {
                Segment::Static(text) => node.statics.entry(text.clone()).or_default(),
                Segment::Named(name) => {
                    if let Some(named) = &node.named
                        && named.name != *name
                    {
                        return Err(RouteError::conflict(pattern.raw(), &named.pattern));
                    }
                    let named = node.named.get_or_insert_with(|| {
                        Box::new(Named { name: Arc::clone(name), pattern: Arc::clone(pattern.raw()), node: Node::default() })
                    });
                    &mut named.node
                }
                Segment::Wildcard(name) => {
                    if let Some(wildcard) = &node.wildcard {
                        return Err(RouteError::conflict(pattern.raw(), &wildcard.pattern));
                    }
                    node.wildcard = Some(Wildcard { name: Arc::clone(name), pattern: Arc::clone(pattern.raw()), value });
                    return Ok(());
                }
            };
        }

        if let Some((existing, _)) = &node.value {
            return Err(RouteError::conflict(pattern.raw(), existing));
        }
        node.value = Some((Arc::clone(pattern.raw()), value));
        Ok(())
    }

    /// Converts every stored value, keeping the shape of the trie.
    pub(crate) fn map<U>(self, f: &mut impl FnMut(T) -> U) -> Node<U> {
        Node {
            statics: self.statics.into_iter().map(|(text, child)| (text, child.map(f))).collect(),
            named: self.named.map(|named| {
                Box::new(Named { name: named.name, pattern: named.pattern, node: named.node.map(f) })
            }),
            wildcard: self.wildcard.map(|wildcard| Wildcard {
                name: wildcard.name,
                pattern: wildcard.pattern,
                value: f(wildcard.value),
            }),
            value: self.value.map(|(pattern, value)| (pattern, f(value))),
        }
    }

    /// Finds the value for `path`, which must start with `/`.
    pub(crate) fn lookup<'t, 'p>(&'t self, path: &'p str) -> Option<(&'t T, Captures<'t, 'p>)> {
        let rest = path.strip_prefix('/')?;
        let mut captures = Vec::new();
        let value = self.find(Some(rest), &mut captures)?;
        Some((value, captures))
    }

    fn find<'t, 'p>(&'t self, rest: Option<&'p str>, captures: &mut Captures<'t, 'p>) -> Option<&'t T> {
        let Some(rest) = rest else {
            return self.value.as_ref().map(|(_, value)| value);
        };
        let (segment, tail) = split_segment(rest);

        if let Some(child) = self.statics.get(segment)
            && let Some(value) = child.find(tail, captures)
        {
            return Some(value);
        }

        if !segment.is_empty()
            && let Some(named) = &self.named
        {
            captures.push((&named.name, segment));
            if let Some(value) = named.node.find(tail, captures) {
                return Some(value);
            }
            captures.pop();
        }

        let wildcard = self.wildcard.as_ref()?;
        captures.push((&wildcard.name, rest));
        Some(&wildcard.value)
    }

    /// Finds the canonical spelling of `path` by matching static segments case-insensitively.
    ///
    /// Exact case is tried before other spellings. With `fix_trailing_slash` a missing or extra
    /// trailing slash is corrected as well. Returns `None` when nothing matches.
    pub(crate) fn find_fixed(&self, path: &str, case_insensitive: bool, fix_trailing_slash: bool) -> Option<String> {
        let rest = path.strip_prefix('/')?;
        let mut fixed = String::with_capacity(path.len() + 1);
        fixed.push('/');
        let options = FixOptions { case_insensitive, fix_trailing_slash };
        self.find_fixed_in(Some(rest), options, &mut fixed).then_some(fixed)
    }

    fn find_fixed_in(&self, rest: Option<&str>, options: FixOptions, fixed: &mut String) -> bool {
        let Some(rest) = rest else {
            if self.value.is_some() {
                return true;
            }
            // "/books" for a route registered as "/books/"
            let slash_accepted =
                self.statics.get("").is_some_and(|child| child.value.is_some()) || self.wildcard.is_some();
            if options.fix_trailing_slash && slash_accepted {
                fixed.push('/');
                return true;
            }
            return false;
        };
        let (segment, tail) = split_segment(rest);
        let len = fixed.len();

        // "/books/" for a route registered as "/books"
        if options.fix_trailing_slash && rest.is_empty() && self.value.is_some() {
            fixed.pop();
            return true;
        }

        let candidates = self.statics.get_key_value(segment).into_iter().chain(
            self.statics
                .iter()
                .filter(|(key, _)| options.case_insensitive && key.as_str() != segment && eq_fold_case(key, segment)),
        );
        for (key, child) in candidates {
            push_segment(fixed, key, tail);
            if child.find_fixed_in(tail, options, fixed) {
                return true;
            }
            fixed.truncate(len);
        }

        if !segment.is_empty()
            && let Some(named) = &self.named
        {
            push_segment(fixed, segment, tail);
            if named.node.find_fixed_in(tail, options, fixed) {
                return true;
            }
            fixed.truncate(len);
        }

        if self.wildcard.is_some() {
            fixed.push_str(rest);
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, Copy)]
struct FixOptions {
    case_insensitive: bool,
    fix_trailing_slash: bool,
}

fn split_segment(rest: &str) -> (&str, Option<&str>) {
    match rest.split_once('/') {
        Some((segment, tail)) => (segment, Some(tail)),
        None => (rest, None),
    }
}

fn push_segment(fixed: &mut String, segment: &str, tail: Option<&str>) {
    fixed.push_str(segment);
    if tail.is_some() {
        fixed.push('/');
    }
}

fn eq_fold_case(a: &str, b: &str) -> bool {
    a.chars().flat_map(char::to_lowercase).eq(b.chars().flat_map(char::to_lowercase))
}

/// Resolves `//`, `.` and `..` in `path`, keeping a trailing slash.
///
/// The result always starts with `/` and never climbs above the root.
pub(crate) fn clean_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for part in &parts {
        cleaned.push('/');
        cleaned.push_str(part);
    }
    if cleaned.is_empty() || path.ends_with('/') {
        cleaned.push('/');
    }
    cleaned
}
