//! Request scoped state that travels through the middleware chain.
//!
//! - [`RequestContext`]: the request head and body, captured path parameters, the key/value
//!   store shared between middleware and the response written so far
//! - [`PathParams`]: parameters captured by the path matcher, in pattern order
//! - [`ContextValues`]: string keyed values set by middleware, e.g. an authenticated user id

mod params;
mod values;

pub use params::PathParams;
pub use values::ContextValues;

use crate::body::ResponseBody;
use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Response, Uri, Version};
use std::any::Any;
use std::sync::Arc;

/// Everything one request owns while it is dispatched.
///
/// A context is created when dispatch starts and dropped once the response is produced. It
/// is never shared between requests; a handler that spawns a detached task has to take a
/// snapshot first, e.g. by cloning [`ContextValues`] and [`PathParams`].
#[derive(Debug)]
pub struct RequestContext {
    head: Parts,
    body: Bytes,
    params: PathParams,
    values: ContextValues,
    route: Option<Arc<str>>,
    allowed: Vec<Method>,
    aborted: bool,
    response: Option<Response<ResponseBody>>,
}

impl RequestContext {
    /// Creates a context from a request whose body has already been read.
    pub fn new(request: Request<Bytes>) -> Self {
        let (head, body) = request.into_parts();
        Self {
            head,
            body,
            params: PathParams::empty(),
            values: ContextValues::new(),
            route: None,
            allowed: Vec::new(),
            aborted: false,
            response: None,
        }
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    /// Returns the path component of the request URI
    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.head.version
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Returns the buffered request body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the parameters captured by the matched route
    pub fn path_params(&self) -> &PathParams {
        &self.params
    }

    /// The pattern of the matched route, `None` for fallback handlers.
    pub fn route_pattern(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Methods registered for this path, filled in for method-not-allowed and OPTIONS handling.
    pub fn allowed_methods(&self) -> &[Method] {
        &self.allowed
    }

    pub fn values(&self) -> &ContextValues {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ContextValues {
        &mut self.values
    }

    /// Stores a value under `key`, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key, value);
    }

    /// Reads the value stored under `key` if it has type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.values.get(key)
    }

    /// Stops the chain: no middleware or handler after the current one will run.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// The response written so far, if any.
    pub fn response(&self) -> Option<&Response<ResponseBody>> {
        self.response.as_ref()
    }

    /// The response written so far, an empty `200 OK` is created when nothing was written yet.
    pub fn response_mut(&mut self) -> &mut Response<ResponseBody> {
        self.response.get_or_insert_with(|| Response::new(ResponseBody::empty()))
    }

    pub fn set_response(&mut self, response: Response<ResponseBody>) {
        self.response = Some(response);
    }

    pub(crate) fn take_response(&mut self) -> Option<Response<ResponseBody>> {
        self.response.take()
    }

    pub(crate) fn set_params(&mut self, params: PathParams) {
        self.params = params;
    }

    pub(crate) fn set_route(&mut self, route: Arc<str>) {
        self.route = Some(route);
    }

    pub(crate) fn set_allowed(&mut self, allowed: Vec<Method>) {
        self.allowed = allowed;
    }
}
