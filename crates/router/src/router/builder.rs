use crate::handler::RequestHandler;
use crate::middleware::{Chain, Middleware};
use crate::recovery::{DefaultRecovery, RecoveryHandler};
use crate::router::matcher::PathMatcher;
use crate::router::pattern::Pattern;
use crate::router::{DefaultMethodNotAllowed, DefaultNotFound, DefaultOptions, Route, RouteError, Router, RouterConfig};
use http::Method;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A handler for one method, with the middleware that only applies to this route.
pub struct MethodRoute {
    method: Method,
    handler: Arc<dyn RequestHandler>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MethodRoute {
    pub fn new<H: RequestHandler + 'static>(method: Method, handler: H) -> Self {
        Self { method, handler: Arc::new(handler), middlewares: Vec::new() }
    }

    /// Adds route middleware, it runs after the global and group middleware.
    #[must_use]
    pub fn wrap<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }
}

impl fmt::Debug for MethodRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRoute")
            .field("method", &self.method)
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

macro_rules! method_route {
    ($method:ident, $method_name:ident) => {
        #[doc = concat!("Routes `", stringify!($method_name), "` requests to `handler`.")]
        pub fn $method<H: RequestHandler + 'static>(handler: H) -> MethodRoute {
            MethodRoute::new(Method::$method_name, handler)
        }
    };
}

method_route!(get, GET);
method_route!(post, POST);
method_route!(put, PUT);
method_route!(delete, DELETE);
method_route!(head, HEAD);
method_route!(options, OPTIONS);
method_route!(connect, CONNECT);
method_route!(patch, PATCH);
method_route!(trace, TRACE);

/// Route registration shared by [`RouterBuilder`] and [`Group`].
pub trait Routes {
    /// Registers `route` under `pattern`, relative to the group prefix if any.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] when the pattern is malformed or conflicts with a route that is
    /// already registered for the same method.
    fn route(&mut self, pattern: &str, route: MethodRoute) -> Result<&mut Self, RouteError>;

    /// Opens a group whose routes share `prefix` and the middleware of this registrar.
    fn group(&mut self, prefix: &str) -> Group<'_>;

    /// Registers `handler` for `method` under `pattern`.
    ///
    /// # Errors
    ///
    /// See [`Routes::route`].
    fn on<H: RequestHandler + 'static>(&mut self, method: Method, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.route(pattern, MethodRoute::new(method, handler))
    }
}

/// A registered route waiting for the global middleware to be known.
struct PendingRoute {
    method: Method,
    pattern: Arc<str>,
    middlewares: Vec<Arc<dyn Middleware>>,
    handler: Arc<dyn RequestHandler>,
}

impl PendingRoute {
    fn into_route(self, global: &[Arc<dyn Middleware>]) -> Route {
        let middlewares = global.iter().cloned().chain(self.middlewares).collect();
        Route { method: self.method, pattern: self.pattern, chain: Chain::new(middlewares, self.handler) }
    }
}

/// Collects routes, middleware and fallback handlers, then freezes them into a [`Router`].
///
/// Global middleware applies to every route and to the not found and method not allowed
/// handlers, regardless of the order of registration.
pub struct RouterBuilder {
    matcher: PathMatcher<PendingRoute>,
    middlewares: Vec<Arc<dyn Middleware>>,
    not_found: Arc<dyn RequestHandler>,
    method_not_allowed: Arc<dyn RequestHandler>,
    global_options: Arc<dyn RequestHandler>,
    recovery: Arc<dyn RecoveryHandler>,
}

impl RouterBuilder {
    pub(crate) fn new() -> Self {
        Self {
            matcher: PathMatcher::default(),
            middlewares: Vec::new(),
            not_found: Arc::new(DefaultNotFound),
            method_not_allowed: Arc::new(DefaultMethodNotAllowed),
            global_options: Arc::new(DefaultOptions),
            recovery: Arc::new(DefaultRecovery),
        }
    }

    pub fn config(&mut self, config: RouterConfig) -> &mut Self {
        self.matcher.set_config(config);
        self
    }

    /// Adds global middleware.
    pub fn wrap<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn not_found<H: RequestHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.not_found = Arc::new(handler);
        self
    }

    pub fn method_not_allowed<H: RequestHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.method_not_allowed = Arc::new(handler);
        self
    }

    /// Answers OPTIONS requests for paths that have routes but no OPTIONS route of their own.
    ///
    /// The handler runs without any middleware, the router adds an `Allow` header unless the
    /// handler sets one.
    pub fn global_options<H: RequestHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.global_options = Arc::new(handler);
        self
    }

    pub fn recovery<R: RecoveryHandler + 'static>(&mut self, recovery: R) -> &mut Self {
        self.recovery = Arc::new(recovery);
        self
    }

    fn register(
        &mut self,
        pattern: &str,
        method: Method,
        middlewares: Vec<Arc<dyn Middleware>>,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<(), RouteError> {
        let pattern = Pattern::parse(pattern)?;
        debug!(%method, pattern = pattern.raw().as_ref(), middlewares = middlewares.len(), "register route");

        let pending = PendingRoute { method: method.clone(), pattern: Arc::clone(pattern.raw()), middlewares, handler };
        self.matcher.insert_pattern(method, &pattern, pending)
    }

    /// Builds the router from the accumulated routes, middleware and fallback handlers.
    pub fn build(self) -> Router {
        let global = self.middlewares;
        let fallback = |handler: Arc<dyn RequestHandler>| Chain::new(global.clone(), handler);

        Router {
            not_found: fallback(self.not_found),
            method_not_allowed: fallback(self.method_not_allowed),
            global_options: Chain::new(Vec::new(), self.global_options),
            recovery: self.recovery,
            matcher: self.matcher.map(|pending| pending.into_route(&global)),
        }
    }
}

impl Routes for RouterBuilder {
    fn route(&mut self, pattern: &str, route: MethodRoute) -> Result<&mut Self, RouteError> {
        self.register(pattern, route.method, route.middlewares, route.handler)?;
        Ok(self)
    }

    fn group(&mut self, prefix: &str) -> Group<'_> {
        Group { builder: self, prefix: join_paths("", prefix), middlewares: Vec::new() }
    }
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("config", self.matcher.config())
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

/// Routes sharing a path prefix and middleware.
///
/// Groups nest: a group opened from a group inherits both its prefix and its middleware. The
/// middleware of a group applies to the routes registered after it was added.
///
/// ```
/// use micro_router::middleware::Logger;
/// use micro_router::router::{delete, get, Routes};
/// use micro_router::{handler_fn, Router};
///
/// async fn list() -> &'static str { "users" }
/// async fn remove() -> &'static str { "removed" }
///
/// # fn main() -> Result<(), micro_router::router::RouteError> {
/// let mut builder = Router::builder();
/// let mut api = builder.group("/api").wrap(Logger);
/// api.route("/users", get(handler_fn(list)))?;
///
/// let mut admin = api.group("/admin");
/// admin.route("/users/:id", delete(handler_fn(remove)))?;
///
/// let router = builder.build();
/// # let _ = router;
/// # Ok(())
/// # }
/// ```
pub struct Group<'b> {
    builder: &'b mut RouterBuilder,
    prefix: String,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Group<'_> {
    /// Adds group middleware, it runs after the global and enclosing group middleware.
    #[must_use]
    pub fn wrap<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Routes for Group<'_> {
    fn route(&mut self, pattern: &str, route: MethodRoute) -> Result<&mut Self, RouteError> {
        let pattern = join_paths(&self.prefix, pattern);
        let middlewares = self.middlewares.iter().cloned().chain(route.middlewares).collect();
        self.builder.register(&pattern, route.method, middlewares, route.handler)?;
        Ok(self)
    }

    fn group(&mut self, prefix: &str) -> Group<'_> {
        Group {
            builder: &mut *self.builder,
            prefix: join_paths(&self.prefix, prefix),
            middlewares: self.middlewares.clone(),
        }
    }
}

impl fmt::Debug for Group<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("prefix", &self.prefix)
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

/// Appends `relative` to `prefix`. A trailing slash on `relative` is kept, so `/api` joined
/// with `/` is `/api/`.
fn join_paths(prefix: &str, relative: &str) -> String {
    if relative.is_empty() {
        return prefix.to_owned();
    }

    let prefix = prefix.strip_suffix('/').unwrap_or(prefix);
    let mut joined = String::with_capacity(prefix.len() + relative.len() + 1);
    joined.push_str(prefix);
    if !relative.starts_with('/') {
        joined.push('/');
    }
    joined.push_str(relative);
    joined
}

#[cfg(test)]
mod tests {
    use super::join_paths;

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("", "/api"), "/api");
        assert_eq!(join_paths("/api", "/"), "/api/");
        assert_eq!(join_paths("/api", ""), "/api");
        assert_eq!(join_paths("/api/", "users"), "/api/users");
        assert_eq!(join_paths("/api", "/admin/:id"), "/api/admin/:id");
        assert_eq!(join_paths("/", "/hello"), "/hello");
    }
}
