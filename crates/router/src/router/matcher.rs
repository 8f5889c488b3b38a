use crate::router::pattern::Pattern;
use crate::router::tree::{clean_path, Node};
use crate::router::{RouteError, RouterConfig};
use crate::PathParams;
use http::Method;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::borrow::Cow;
use std::sync::Arc;

/// Characters re-encoded when a decoded path is sent back in a redirect.
const PATH_ENCODE_SET: &AsciiSet =
    &CONTROLS.add(b' ').add(b'"').add(b'#').add(b'%').add(b'<').add(b'>').add(b'?').add(b'`').add(b'{').add(b'}');

/// Resolves a method and a path to a registered value.
///
/// There is one trie per method; the matcher is built once and only read afterwards.
#[derive(Debug)]
pub struct PathMatcher<T> {
    trees: Vec<(Method, Node<T>)>,
    config: RouterConfig,
}

/// The outcome of [`PathMatcher::at`].
#[derive(Debug)]
pub enum MatchResult<'m, T> {
    Matched { value: &'m T, params: PathParams },
    NotFound,
    /// The path matches under other methods, sorted by name.
    MethodNotAllowed(Vec<Method>),
    /// No exact match, but the canonical path given here does match.
    RedirectSuggested(String),
}

impl<T> Default for PathMatcher<T> {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl<T> PathMatcher<T> {
    pub fn new(config: RouterConfig) -> Self {
        Self { trees: Vec::new(), config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub(crate) fn set_config(&mut self, config: RouterConfig) {
        self.config = config;
    }

    /// Converts every registered value, the routes themselves stay the same.
    pub(crate) fn map<U>(self, mut f: impl FnMut(T) -> U) -> PathMatcher<U> {
        let trees = self.trees.into_iter().map(|(method, tree)| (method, tree.map(&mut f))).collect();
        PathMatcher { trees, config: self.config }
    }

    /// Registers `value` for `method` and `pattern`.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] when the pattern is malformed or collides with a route already
    /// registered for the same method.
    pub fn insert(&mut self, method: Method, pattern: &str, value: T) -> Result<(), RouteError> {
        let pattern = Pattern::parse(pattern)?;
        self.insert_pattern(method, &pattern, value)
    }

    pub(crate) fn insert_pattern(&mut self, method: Method, pattern: &Pattern, value: T) -> Result<(), RouteError> {
        let index = match self.trees.iter().position(|(m, _)| *m == method) {
            Some(index) => index,
            None => {
                self.trees.push((method, Node::default()));
                self.trees.len() - 1
            }
        };
        self.trees[index].1.insert(pattern, value)
    }

    fn tree(&self, method: &Method) -> Option<&Node<T>> {
        self.trees.iter().find(|(m, _)| m == method).map(|(_, tree)| tree)
    }

    fn decode<'p>(&self, path: &'p str) -> Cow<'p, str> {
        if self.config.decode_path { percent_decode_str(path).decode_utf8_lossy() } else { Cow::Borrowed(path) }
    }

    fn encode(&self, path: String) -> String {
        if self.config.decode_path { utf8_percent_encode(&path, PATH_ENCODE_SET).to_string() } else { path }
    }

    /// Exact lookup, no redirects and no method fallback.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<(&T, PathParams)> {
        find(self.tree(method)?, &self.decode(path))
    }

    /// Resolves `method` and `path` into a [`MatchResult`].
    ///
    /// Without an exact match the trailing slash is toggled, then the cleaned and case folded
    /// path is tried, each only when enabled in [`RouterConfig`]. A redirect is suggested
    /// only for methods other than CONNECT and never for `/`.
    pub fn at(&self, method: &Method, path: &str) -> MatchResult<'_, T> {
        let path = self.decode(path);

        if let Some(tree) = self.tree(method) {
            if let Some((value, params)) = find(tree, &path) {
                return MatchResult::Matched { value, params };
            }

            if *method != Method::CONNECT
                && path != "/"
                && let Some(redirect) = self.suggest_redirect(tree, &path)
            {
                return MatchResult::RedirectSuggested(self.encode(redirect));
            }
        }

        if self.config.handle_method_not_allowed {
            let allowed = self.allowed_decoded(&path, method);
            if !allowed.is_empty() {
                return MatchResult::MethodNotAllowed(allowed);
            }
        }

        MatchResult::NotFound
    }

    fn suggest_redirect(&self, tree: &Node<T>, path: &str) -> Option<String> {
        if self.config.redirect_trailing_slash {
            let toggled = match path.strip_suffix('/') {
                Some(stripped) => stripped.to_owned(),
                None => format!("{path}/"),
            };
            if tree.lookup(&toggled).is_some() {
                return Some(toggled);
            }
        }

        if self.config.redirect_fixed_path {
            let cleaned = clean_path(path);
            let fixed =
                tree.find_fixed(&cleaned, self.config.case_insensitive, self.config.redirect_trailing_slash)?;
            if fixed != path {
                return Some(fixed);
            }
        }

        None
    }

    /// Methods other than `exclude` with a route matching `path`, sorted by name.
    ///
    /// The server-wide OPTIONS target `*` is allowed for every registered method.
    pub fn allowed(&self, path: &str, exclude: &Method) -> Vec<Method> {
        self.allowed_decoded(&self.decode(path), exclude)
    }

    fn allowed_decoded(&self, path: &str, exclude: &Method) -> Vec<Method> {
        let mut allowed = self
            .trees
            .iter()
            .filter(|(method, _)| method != exclude)
            .filter(|(_, tree)| path == "*" || tree.lookup(path).is_some())
            .map(|(method, _)| method.clone())
            .collect::<Vec<_>>();
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        allowed
    }
}

fn find<'t, T>(tree: &'t Node<T>, path: &str) -> Option<(&'t T, PathParams)> {
    let (value, captures) = tree.lookup(path)?;
    let captures = captures.into_iter().map(|(name, value)| (Arc::clone(name), value.to_owned())).collect();
    Some((value, PathParams::from_captures(captures)))
}
