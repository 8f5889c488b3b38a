//! Route registration and request dispatch.
//!
//! Patterns use `:name` for a parameter matching one path segment and a final `*name` for a
//! parameter matching the rest of the path:
//!
//! | pattern             | path            | parameters           |
//! |---------------------|-----------------|----------------------|
//! | `/hello/:name`      | `/hello/john`   | `name = "john"`      |
//! | `/files/*filepath`  | `/files/a/b/c`  | `filepath = "a/b/c"` |
//! | `/files/*filepath`  | `/files/`       | `filepath = ""`      |
//!
//! At every depth a static segment wins over a parameter, and a parameter wins over a
//! wildcard, so `/books/new` and `/books/:isdn` can be registered side by side.

mod builder;
mod config;
mod error;
mod matcher;
mod pattern;
mod tree;

pub use builder::{connect, delete, get, head, options, patch, post, put, trace};
pub use builder::{Group, MethodRoute, RouterBuilder, Routes};
pub use config::RouterConfig;
pub use error::RouteError;
pub use matcher::{MatchResult, PathMatcher};

use crate::body::ResponseBody;
use crate::handler::RequestHandler;
use crate::middleware::Chain;
use crate::recovery::{self, RecoveryHandler};
use crate::responder::Responder;
use crate::RequestContext;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ALLOW, LOCATION};
use http::{HeaderValue, Method, Request, Response, StatusCode};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A registered route: its method, its pattern and the chain that serves it.
pub struct Route {
    method: Method,
    pattern: Arc<str>,
    chain: Chain,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The number of middleware in front of the handler, global ones included.
    pub fn middleware_count(&self) -> usize {
        self.chain.len() - 1
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("method", &self.method).field("pattern", &self.pattern).finish_non_exhaustive()
    }
}

/// Main router structure that dispatches requests to routes
///
/// A router is immutable once built and can be shared between tasks behind an [`Arc`].
pub struct Router {
    matcher: PathMatcher<Route>,
    not_found: Chain,
    method_not_allowed: Chain,
    global_options: Chain,
    recovery: Arc<dyn RecoveryHandler>,
}

impl Router {
    /// Creates a new router builder
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn config(&self) -> &RouterConfig {
        self.matcher.config()
    }

    /// Matches `method` and `path` against the registered routes
    pub fn at(&self, method: &Method, path: &str) -> MatchResult<'_, Route> {
        self.matcher.at(method, path)
    }

    /// Dispatches one request and produces its response.
    ///
    /// Routing misses are answered by the fallback handlers and failures by the recovery
    /// handler, so dispatch always yields a response.
    pub async fn dispatch(&self, request: Request<Bytes>) -> Response<ResponseBody> {
        let mut ctx = RequestContext::new(request);
        let method = ctx.method().clone();
        let path = ctx.path().to_owned();
        let config = *self.matcher.config();

        if method == Method::OPTIONS && config.handle_options && self.matcher.lookup(&method, &path).is_none() {
            let allowed = self.matcher.allowed(&path, &Method::OPTIONS);
            if !allowed.is_empty() {
                return self.answer_options(ctx, allowed).await;
            }
        }

        match self.matcher.at(&method, &path) {
            MatchResult::Matched { value, params } => {
                ctx.set_params(params);
                ctx.set_route(Arc::clone(&value.pattern));
                recovery::execute(&value.chain, &mut ctx, self.recovery.as_ref()).await
            }
            MatchResult::RedirectSuggested(location) => redirect(&ctx, location),
            MatchResult::MethodNotAllowed(mut allowed) => {
                if config.handle_options && !allowed.contains(&Method::OPTIONS) {
                    allowed.push(Method::OPTIONS);
                    allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                }
                let allow = allow_header(&allowed);
                ctx.set_allowed(allowed);

                let mut response = recovery::execute(&self.method_not_allowed, &mut ctx, self.recovery.as_ref()).await;
                if let Some(allow) = allow {
                    response.headers_mut().entry(ALLOW).or_insert(allow);
                }
                response
            }
            MatchResult::NotFound => recovery::execute(&self.not_found, &mut ctx, self.recovery.as_ref()).await,
        }
    }

    async fn answer_options(&self, mut ctx: RequestContext, mut allowed: Vec<Method>) -> Response<ResponseBody> {
        allowed.push(Method::OPTIONS);
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        let allow = allow_header(&allowed);
        ctx.set_allowed(allowed);

        let mut response = recovery::execute(&self.global_options, &mut ctx, self.recovery.as_ref()).await;
        if let Some(allow) = allow {
            response.headers_mut().entry(ALLOW).or_insert(allow);
        }
        response
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("matcher", &self.matcher).finish_non_exhaustive()
    }
}

fn allow_header(allowed: &[Method]) -> Option<HeaderValue> {
    let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
    HeaderValue::from_str(&allow).ok()
}

/// `301` for GET and HEAD, `308` otherwise so the client repeats the method and body.
fn redirect(ctx: &RequestContext, mut location: String) -> Response<ResponseBody> {
    let status = if ctx.method() == Method::GET || ctx.method() == Method::HEAD {
        StatusCode::MOVED_PERMANENTLY
    } else {
        StatusCode::PERMANENT_REDIRECT
    };
    if let Some(query) = ctx.uri().query() {
        location.push('?');
        location.push_str(query);
    }
    debug!(method = %ctx.method(), path = ctx.path(), %location, "redirect to the canonical path");

    match HeaderValue::from_str(&location) {
        Ok(location) => {
            let mut response = status.response_to(ctx);
            response.headers_mut().insert(LOCATION, location);
            response
        }
        Err(_) => (StatusCode::BAD_REQUEST, "400 bad request").response_to(ctx),
    }
}

/// `404 page not found`
#[derive(Debug, Clone, Copy)]
pub(crate) struct DefaultNotFound;

#[async_trait]
impl RequestHandler for DefaultNotFound {
    async fn invoke(&self, ctx: &mut RequestContext) -> Response<ResponseBody> {
        (StatusCode::NOT_FOUND, "404 page not found").response_to(ctx)
    }
}

/// `405 method not allowed`, the router adds the `Allow` header.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DefaultMethodNotAllowed;

#[async_trait]
impl RequestHandler for DefaultMethodNotAllowed {
    async fn invoke(&self, ctx: &mut RequestContext) -> Response<ResponseBody> {
        (StatusCode::METHOD_NOT_ALLOWED, "405 method not allowed").response_to(ctx)
    }
}

/// `204 No Content`, the router adds the `Allow` header.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DefaultOptions;

#[async_trait]
impl RequestHandler for DefaultOptions {
    async fn invoke(&self, ctx: &mut RequestContext) -> Response<ResponseBody> {
        StatusCode::NO_CONTENT.response_to(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::{delete, get, options, post, put, MatchResult, RouteError, Router, RouterConfig, Routes};
    use crate::middleware::{abort_with, middleware_fn, CorsPreflight, Flow, Middleware, Next};
    use crate::recovery::Fault;
    use crate::{handler_fn, PathParams, RequestContext};
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::header::{
        ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, ALLOW, LOCATION,
    };
    use http::{Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    type Trace = Arc<Mutex<Vec<&'static str>>>;

    struct Record {
        name: &'static str,
        trace: Trace,
    }

    #[async_trait]
    impl Middleware for Record {
        async fn handle(&self, _ctx: &mut RequestContext, _next: &mut Next<'_>) -> Flow {
            self.trace.lock().unwrap().push(self.name);
            Flow::Proceed
        }
    }

    fn record(name: &'static str, trace: &Trace) -> Record {
        Record { name, trace: Arc::clone(trace) }
    }

    async fn hello(params: PathParams) -> String {
        format!("hello, {}!", params.get("name").unwrap_or_default())
    }

    async fn file(params: PathParams) -> String {
        format!("file '{}'", params.get("filepath").unwrap_or_default())
    }

    async fn index() -> &'static str {
        "welcome"
    }

    fn panicking() {
        panic!("demo panic")
    }

    async fn boom() -> &'static str {
        panicking();
        "unreachable"
    }

    fn request(method: Method, uri: &str) -> Request<Bytes> {
        Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap()
    }

    async fn body_of(response: http::Response<crate::ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn demo_router() -> Router {
        let mut builder = Router::builder();
        builder.route("/", get(handler_fn(index))).unwrap();
        builder.route("/hello/:name", get(handler_fn(hello))).unwrap();
        builder.route("/files/*filepath", get(handler_fn(file))).unwrap();
        builder.route("/books/", get(handler_fn(index))).unwrap();
        builder.route("/books/:isdn", get(handler_fn(index))).unwrap();
        builder.route("/books/:isdn", put(handler_fn(index))).unwrap();
        builder.route("/books/:isdn", delete(handler_fn(index))).unwrap();
        builder.route("/login", post(handler_fn(index))).unwrap();
        builder.build()
    }

    #[tokio::test]
    async fn test_named_parameter() {
        let router = demo_router();

        let MatchResult::Matched { value, params } = router.at(&Method::GET, "/hello/john") else {
            panic!("expected a match");
        };
        assert_eq!(value.pattern(), "/hello/:name");
        assert_eq!(params.get("name"), Some("john"));

        let response = router.dispatch(request(Method::GET, "/hello/john")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, "hello, john!");

        let response = router.dispatch(request(Method::GET, "/hello/John%20Doe")).await;
        assert_eq!(body_of(response).await, "hello, John Doe!");

        let response = router.dispatch(request(Method::GET, "/hello/john/x")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await, "404 page not found");
    }

    #[tokio::test]
    async fn test_wildcard_parameter() {
        let router = demo_router();

        let response = router.dispatch(request(Method::GET, "/files/a/b/c")).await;
        assert_eq!(body_of(response).await, "file 'a/b/c'");

        let response = router.dispatch(request(Method::GET, "/files/")).await;
        assert_eq!(body_of(response).await, "file ''");
    }

    #[tokio::test]
    async fn test_redirects_keep_query() {
        let router = demo_router();

        let response = router.dispatch(request(Method::GET, "/books?page=2")).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[LOCATION], "/books/?page=2");

        let response = router.dispatch(request(Method::POST, "/LOGIN")).await;
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers()[LOCATION], "/login");

        let response = router.dispatch(request(Method::GET, "/")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let router = demo_router();

        let response = router.dispatch(request(Method::POST, "/books/123")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "DELETE, GET, OPTIONS, PUT");
    }

    #[tokio::test]
    async fn test_middleware_order() {
        let trace = Trace::default();
        let handler_trace = Arc::clone(&trace);

        let mut builder = Router::builder();
        builder.wrap(record("A", &trace));
        let mut api = builder.group("/api").wrap(record("B", &trace));
        api.route(
            "/users",
            get(handler_fn(move || {
                let trace = Arc::clone(&handler_trace);
                async move {
                    trace.lock().unwrap().push("H");
                    "users"
                }
            }))
            .wrap(record("C", &trace)),
        )
        .unwrap();
        let router = builder.build();

        let response = router.dispatch(request(Method::GET, "/api/users")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*trace.lock().unwrap(), vec!["A", "B", "C", "H"]);
    }

    #[tokio::test]
    async fn test_abort_in_group() {
        let trace = Trace::default();

        let mut builder = Router::builder();
        builder.wrap(record("A", &trace));
        let auth = middleware_fn(|ctx: &mut RequestContext| {
            if ctx.headers().contains_key(http::header::AUTHORIZATION) {
                ctx.insert("user_id", "123".to_string());
                Flow::Proceed
            } else {
                abort_with(ctx, (StatusCode::UNAUTHORIZED, "missing authorization"))
            }
        });
        let mut api = builder.group("/api").wrap(auth);
        let mut admin = api.group("/admin");
        admin.route("/users", get(handler_fn(index)).wrap(record("C", &trace))).unwrap();
        let router = builder.build();

        let response = router.dispatch(request(Method::GET, "/api/admin/users")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_of(response).await, "missing authorization");
        assert_eq!(*trace.lock().unwrap(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_panic_is_recovered_once() {
        let recoveries = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&recoveries);

        let mut builder = Router::builder();
        builder.route("/panic", get(handler_fn(boom))).unwrap();
        builder.route("/", get(handler_fn(index))).unwrap();
        builder.recovery(move |_ctx: &RequestContext, fault: &Fault| {
            counter.fetch_add(1, Ordering::SeqCst);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Recovered from panic: {fault}"))
        });
        let router = builder.build();

        let response = router.dispatch(request(Method::GET, "/panic")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await, "Recovered from panic: demo panic");
        assert_eq!(recoveries.load(Ordering::SeqCst), 1);

        let response = router.dispatch(request(Method::GET, "/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(recoveries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fault_forces_server_error() {
        let mut builder = Router::builder();
        builder.wrap(middleware_fn(|_ctx: &mut RequestContext| Flow::fault("database unavailable")));
        builder.route("/", get(handler_fn(index))).unwrap();
        builder.recovery(|_ctx: &RequestContext, fault: &Fault| fault.to_string());
        let router = builder.build();

        let response = router.dispatch(request(Method::GET, "/")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await, "database unavailable");
    }

    #[tokio::test]
    async fn test_preflight_skips_handlers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut builder = Router::builder();
        builder
            .route(
                "/books/:isdn",
                get(handler_fn(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { "book" }
                })),
            )
            .unwrap();
        builder.global_options(CorsPreflight::default());
        let router = builder.build();

        let mut preflight = request(Method::OPTIONS, "/books/123");
        preflight.headers_mut().insert(ACCESS_CONTROL_REQUEST_METHOD, "GET".parse().unwrap());
        let response = router.dispatch(preflight).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(response.headers().contains_key(ACCESS_CONTROL_ALLOW_METHODS));
        assert_eq!(response.headers()[ALLOW], "GET, OPTIONS");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let response = router.dispatch(request(Method::OPTIONS, "/books/123")).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(!response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));

        let response = router.dispatch(request(Method::OPTIONS, "/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_explicit_options_route_wins() {
        let mut builder = Router::builder();
        builder.route("/books", get(handler_fn(index))).unwrap();
        builder.route("/books", options(handler_fn(|| async { (StatusCode::OK, "custom options") }))).unwrap();
        builder.global_options(CorsPreflight::default());
        let router = builder.build();

        let response = router.dispatch(request(Method::OPTIONS, "/books")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, "custom options");
    }

    #[tokio::test]
    async fn test_fallbacks_run_behind_global_middleware() {
        let trace = Trace::default();

        let mut builder = Router::builder();
        builder.wrap(record("A", &trace));
        builder.route("/", get(handler_fn(index))).unwrap();
        builder.not_found(handler_fn(|| async { (StatusCode::NOT_FOUND, "custom 404") }));
        let router = builder.build();

        let response = router.dispatch(request(Method::GET, "/nowhere")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await, "custom 404");
        assert_eq!(*trace.lock().unwrap(), vec!["A"]);
    }

    #[test]
    fn test_conflicts_fail_at_registration() {
        let mut builder = Router::builder();
        builder.route("/users/:id", get(handler_fn(index))).unwrap();

        let mut api = builder.group("/users");
        let err = api.route("/:name/books", get(handler_fn(index))).unwrap_err();
        assert!(matches!(err, RouteError::Conflict { .. }));

        let err = builder.on(Method::GET, "/files/*path/more", handler_fn(index)).unwrap_err();
        assert!(matches!(err, RouteError::NonTerminalWildcard { .. }));
    }

    #[tokio::test]
    async fn test_config_disables_fallback_behaviour() {
        let mut builder = Router::builder();
        builder.config(RouterConfig { redirect_trailing_slash: false, handle_method_not_allowed: false, ..RouterConfig::default() });
        builder.route("/books/", get(handler_fn(index))).unwrap();
        let router = builder.build();

        let response = router.dispatch(request(Method::GET, "/books")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router.dispatch(request(Method::POST, "/books/")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
