use crate::body::ResponseBody;
use crate::handler::RequestHandler;
use crate::middleware::{Flow, Middleware, Next};
use crate::RequestContext;
use async_trait::async_trait;
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN,
};
use http::{HeaderMap, HeaderValue, Method, Response, StatusCode};
use serde::Deserialize;
use tracing::warn;

/// What cross-origin requests are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// The allowed origin. `None` reflects the request's `Origin` in [`Cors`] and answers `*`
    /// in [`CorsPreflight`].
    pub allow_origin: Option<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: None,
            allow_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"].map(String::from).to_vec(),
            allow_headers: ["Content-Type", "Authorization"].map(String::from).to_vec(),
            expose_headers: Vec::new(),
            allow_credentials: false,
        }
    }
}

/// [`CorsConfig`] rendered into header values once, when the middleware is built.
#[derive(Debug, Clone)]
struct CorsHeaders {
    allow_origin: Option<HeaderValue>,
    allow_methods: Option<HeaderValue>,
    allow_headers: Option<HeaderValue>,
    expose_headers: Option<HeaderValue>,
    allow_credentials: bool,
}

impl CorsHeaders {
    fn new(config: &CorsConfig) -> Self {
        Self {
            allow_origin: config.allow_origin.as_deref().and_then(|origin| header_value("allow_origin", origin)),
            allow_methods: list_value("allow_methods", &config.allow_methods),
            allow_headers: list_value("allow_headers", &config.allow_headers),
            expose_headers: list_value("expose_headers", &config.expose_headers),
            allow_credentials: config.allow_credentials,
        }
    }

    fn apply(&self, origin: Option<HeaderValue>, headers: &mut HeaderMap) {
        if let Some(origin) = self.allow_origin.clone().or(origin) {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }
        if let Some(methods) = &self.allow_methods {
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, methods.clone());
        }
        if let Some(allow) = &self.allow_headers {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, allow.clone());
        }
        if let Some(expose) = &self.expose_headers {
            headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, expose.clone());
        }
        if self.allow_credentials {
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
    }
}

fn header_value(field: &str, value: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| warn!(field, value, cause = %e, "ignoring invalid cors value")).ok()
}

fn list_value(field: &str, values: &[String]) -> Option<HeaderValue> {
    if values.is_empty() {
        return None;
    }
    header_value(field, &values.join(", "))
}

/// Adds CORS headers to requests that carry an `Origin` and answers OPTIONS requests with
/// `204 No Content` without running the rest of the chain.
#[derive(Debug, Clone)]
pub struct Cors {
    headers: CorsHeaders,
}

impl Cors {
    pub fn new(config: &CorsConfig) -> Self {
        Self { headers: CorsHeaders::new(config) }
    }
}

impl Default for Cors {
    fn default() -> Self {
        Self::new(&CorsConfig::default())
    }
}

#[async_trait]
impl Middleware for Cors {
    async fn handle(&self, ctx: &mut RequestContext, next: &mut Next<'_>) -> Flow {
        let origin = ctx.headers().get(ORIGIN).cloned();

        if ctx.method() == Method::OPTIONS {
            let response = ctx.response_mut();
            *response.status_mut() = StatusCode::NO_CONTENT;
            if origin.is_some() {
                self.headers.apply(origin, response.headers_mut());
            }
            return Flow::Abort;
        }

        let flow = next.run(ctx).await;
        if origin.is_some() {
            self.headers.apply(origin, ctx.response_mut().headers_mut());
        }
        flow
    }
}

/// A global OPTIONS handler answering CORS preflight requests.
///
/// Requests carrying `Access-Control-Request-Method` get the configured allow headers, every
/// OPTIONS request gets `204 No Content`.
#[derive(Debug, Clone)]
pub struct CorsPreflight {
    headers: CorsHeaders,
}

impl CorsPreflight {
    pub fn new(config: &CorsConfig) -> Self {
        Self { headers: CorsHeaders::new(config) }
    }
}

impl Default for CorsPreflight {
    fn default() -> Self {
        Self::new(&CorsConfig::default())
    }
}

#[async_trait]
impl RequestHandler for CorsPreflight {
    async fn invoke(&self, ctx: &mut RequestContext) -> Response<ResponseBody> {
        let mut response = Response::new(ResponseBody::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;

        if ctx.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD) {
            self.headers.apply(Some(HeaderValue::from_static("*")), response.headers_mut());
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::{Cors, CorsConfig, CorsPreflight};
    use crate::handler::RequestHandler;
    use crate::middleware::{Chain, Flow, Middleware};
    use crate::{handler_fn, RequestContext};
    use bytes::Bytes;
    use http::header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
        ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN,
    };
    use http::{Method, Request, StatusCode};
    use std::sync::Arc;

    fn request(method: Method, headers: &[(http::HeaderName, &str)]) -> RequestContext {
        let mut builder = Request::builder().method(method).uri("/books/123");
        for (name, value) in headers {
            builder = builder.header(name, *value);
        }
        RequestContext::new(builder.body(Bytes::new()).unwrap())
    }

    #[tokio::test]
    async fn test_preflight() {
        let preflight = CorsPreflight::default();

        let mut ctx = request(Method::OPTIONS, &[(ACCESS_CONTROL_REQUEST_METHOD, "GET")]);
        let response = preflight.invoke(&mut ctx).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, PUT, DELETE, OPTIONS");
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type, Authorization");

        let mut ctx = request(Method::OPTIONS, &[]);
        let response = preflight.invoke(&mut ctx).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().is_empty());
    }

    async fn book() -> &'static str {
        "book"
    }

    fn chain(config: &CorsConfig) -> Chain {
        let cors: Arc<dyn Middleware> = Arc::new(Cors::new(config));
        Chain::new(vec![cors], Arc::new(handler_fn(book)))
    }

    #[tokio::test]
    async fn test_cors_reflects_origin() {
        let config = CorsConfig { allow_credentials: true, ..CorsConfig::default() };
        let chain = chain(&config);

        let mut ctx = request(Method::GET, &[(ORIGIN, "http://localhost:3000")]);
        assert_eq!(chain.run_from(0, &mut ctx).await, Flow::Proceed);
        let response = ctx.response().unwrap();
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:3000");
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

        let mut ctx = request(Method::GET, &[]);
        chain.run_from(0, &mut ctx).await;
        assert!(!ctx.response().unwrap().headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_cors_aborts_options() {
        let config = CorsConfig { allow_origin: Some("https://example.com".into()), ..CorsConfig::default() };
        let chain = chain(&config);

        let mut ctx = request(Method::OPTIONS, &[(ORIGIN, "http://localhost:3000")]);
        assert_eq!(chain.run_from(0, &mut ctx).await, Flow::Abort);
        let response = ctx.response().unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://example.com");
    }
}
