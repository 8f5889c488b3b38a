//! The middleware chain executor.
//!
//! A chain is the global middleware, then the middleware of every enclosing group from the
//! outermost to the innermost, then the route middleware, and finally the terminal
//! [`RequestHandler`]. Each link reports a [`Flow`]:
//!
//! - [`Flow::Proceed`]: continue. A middleware that wants to run code after the rest of the
//!   chain calls [`Next::run`] first, one that does not is followed by the next link once it
//!   returns.
//! - [`Flow::Abort`]: stop, the response written so far is final.
//! - [`Flow::Fault`]: stop, the recovery handler produces the response.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use micro_router::middleware::{Flow, Middleware, Next};
//! use micro_router::RequestContext;
//! use std::time::Instant;
//!
//! struct Timing;
//!
//! #[async_trait]
//! impl Middleware for Timing {
//!     async fn handle(&self, ctx: &mut RequestContext, next: &mut Next<'_>) -> Flow {
//!         let start = Instant::now();
//!         let flow = next.run(ctx).await;
//!         println!("{} took {:?}", ctx.path(), start.elapsed());
//!         flow
//!     }
//! }
//! ```

mod basic_auth;
mod cors;
mod logger;

pub use basic_auth::BasicAuth;
pub use cors::Cors;
pub use cors::CorsConfig;
pub use cors::CorsPreflight;
pub use logger::Logger;

use crate::handler::RequestHandler;
use crate::recovery::Fault;
use crate::responder::Responder;
use crate::RequestContext;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// What a link of the chain decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Proceed,
    Abort,
    Fault(Fault),
}

impl Flow {
    pub fn fault(message: impl Into<std::borrow::Cow<'static, str>>) -> Self {
        Self::Fault(Fault::new(message))
    }
}

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &mut RequestContext, next: &mut Next<'_>) -> Flow;
}

#[async_trait]
impl<T> Middleware for Arc<T>
where
    T: Middleware + ?Sized,
{
    async fn handle(&self, ctx: &mut RequestContext, next: &mut Next<'_>) -> Flow {
        self.as_ref().handle(ctx, next).await
    }
}

/// The rest of the chain, as seen by one middleware.
pub struct Next<'c> {
    chain: &'c Chain,
    index: usize,
    outcome: Option<Flow>,
}

impl Next<'_> {
    /// Runs the rest of the chain and returns its outcome.
    ///
    /// The rest of the chain is entered at most once, calling `run` again returns the outcome
    /// of the first call.
    pub async fn run(&mut self, ctx: &mut RequestContext) -> Flow {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let outcome = self.chain.run_from(self.index, ctx).await;
        self.outcome = Some(outcome.clone());
        outcome
    }

    /// Whether [`Next::run`] has been called.
    pub fn has_run(&self) -> bool {
        self.outcome.is_some()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("index", &self.index).field("outcome", &self.outcome).finish()
    }
}

/// An ordered list of middleware around a terminal handler, built once per route.
#[derive(Clone)]
pub(crate) struct Chain {
    middlewares: Arc<[Arc<dyn Middleware>]>,
    handler: Arc<dyn RequestHandler>,
}

impl Chain {
    pub(crate) fn new(middlewares: Vec<Arc<dyn Middleware>>, handler: Arc<dyn RequestHandler>) -> Self {
        Self { middlewares: middlewares.into(), handler }
    }

    pub(crate) fn len(&self) -> usize {
        self.middlewares.len() + 1
    }

    /// Runs the chain starting at link `index`, the terminal handler being the last link.
    pub(crate) fn run_from<'a>(&'a self, index: usize, ctx: &'a mut RequestContext) -> BoxFuture<'a, Flow> {
        Box::pin(async move {
            if ctx.is_aborted() {
                return Flow::Abort;
            }

            let Some(middleware) = self.middlewares.get(index) else {
                let response = self.handler.invoke(ctx).await;
                ctx.set_response(response);
                return Flow::Proceed;
            };

            let mut next = Next { chain: self, index: index + 1, outcome: None };
            match middleware.handle(ctx, &mut next).await {
                Flow::Proceed => match next.outcome {
                    Some(outcome) => outcome,
                    None => self.run_from(index + 1, ctx).await,
                },
                Flow::Abort => {
                    ctx.abort();
                    Flow::Abort
                }
                Flow::Fault(fault) => Flow::Fault(fault),
            }
        })
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("middlewares", &self.middlewares.len()).finish_non_exhaustive()
    }
}

/// A middleware made of a synchronous function, run before the rest of the chain.
pub struct MiddlewareFn<F> {
    f: F,
}

impl<F> fmt::Debug for MiddlewareFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareFn").field("f", &std::any::type_name::<F>()).finish()
    }
}

/// Turns `f` into a [`Middleware`].
///
/// ```
/// use micro_router::middleware::{middleware_fn, Flow};
/// use micro_router::RequestContext;
///
/// let version = middleware_fn(|ctx: &mut RequestContext| {
///     ctx.insert("api_version", "v1");
///     Flow::Proceed
/// });
/// # let _ = version;
/// ```
pub fn middleware_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: Fn(&mut RequestContext) -> Flow + Send + Sync,
{
    MiddlewareFn { f }
}

#[async_trait]
impl<F> Middleware for MiddlewareFn<F>
where
    F: Fn(&mut RequestContext) -> Flow + Send + Sync,
{
    async fn handle(&self, ctx: &mut RequestContext, _next: &mut Next<'_>) -> Flow {
        (self.f)(ctx)
    }
}

/// Writes `responder` as the final response and aborts the chain.
pub fn abort_with<R: Responder>(ctx: &mut RequestContext, responder: R) -> Flow {
    let response = responder.response_to(ctx);
    ctx.set_response(response);
    ctx.abort();
    Flow::Abort
}

#[cfg(test)]
mod tests {
    use super::{abort_with, middleware_fn, Chain, Flow, Middleware, Next};
    use crate::body::ResponseBody;
    use crate::handler::RequestHandler;
    use crate::RequestContext;
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::{Request, Response, StatusCode};
    use std::sync::{Arc, Mutex};

    type Trace = Arc<Mutex<Vec<String>>>;

    struct Record {
        name: &'static str,
        trace: Trace,
    }

    #[async_trait]
    impl Middleware for Record {
        async fn handle(&self, _ctx: &mut RequestContext, _next: &mut Next<'_>) -> Flow {
            self.trace.lock().unwrap().push(self.name.to_string());
            Flow::Proceed
        }
    }

    struct Wrap {
        trace: Trace,
    }

    #[async_trait]
    impl Middleware for Wrap {
        async fn handle(&self, ctx: &mut RequestContext, next: &mut Next<'_>) -> Flow {
            self.trace.lock().unwrap().push("before".to_string());
            let first = next.run(ctx).await;
            let second = next.run(ctx).await;
            assert_eq!(first, second);
            self.trace.lock().unwrap().push(format!("after {:?}", ctx.response().map(Response::status)));
            first
        }
    }

    struct Handler {
        trace: Trace,
    }

    #[async_trait]
    impl RequestHandler for Handler {
        async fn invoke(&self, _ctx: &mut RequestContext) -> Response<ResponseBody> {
            self.trace.lock().unwrap().push("H".to_string());
            Response::new(ResponseBody::from("done"))
        }
    }

    fn record(name: &'static str, trace: &Trace) -> Arc<dyn Middleware> {
        Arc::new(Record { name, trace: Arc::clone(trace) })
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Request::new(Bytes::new()))
    }

    fn chain(middlewares: Vec<Arc<dyn Middleware>>, trace: &Trace) -> Chain {
        Chain::new(middlewares, Arc::new(Handler { trace: Arc::clone(trace) }))
    }

    #[tokio::test]
    async fn test_runs_in_order() {
        let trace = Trace::default();
        let chain = chain(vec![record("A", &trace), record("B", &trace), record("C", &trace)], &trace);
        let mut ctx = ctx();

        assert_eq!(chain.len(), 4);
        assert_eq!(chain.run_from(0, &mut ctx).await, Flow::Proceed);
        assert_eq!(*trace.lock().unwrap(), vec!["A", "B", "C", "H"]);
        assert_eq!(ctx.response().map(Response::status), Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn test_abort_short_circuits() {
        let trace = Trace::default();
        let abort: Arc<dyn Middleware> =
            Arc::new(middleware_fn(|ctx: &mut RequestContext| abort_with(ctx, (StatusCode::UNAUTHORIZED, "nope"))));
        let chain = chain(vec![record("A", &trace), abort, record("C", &trace)], &trace);
        let mut ctx = ctx();

        assert_eq!(chain.run_from(0, &mut ctx).await, Flow::Abort);
        assert_eq!(*trace.lock().unwrap(), vec!["A"]);
        assert!(ctx.is_aborted());
        assert_eq!(ctx.response().map(Response::status), Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_abort_flag_without_abort_flow() {
        let trace = Trace::default();
        let abort: Arc<dyn Middleware> = Arc::new(middleware_fn(|ctx: &mut RequestContext| {
            ctx.abort();
            Flow::Proceed
        }));
        let chain = chain(vec![abort, record("C", &trace)], &trace);
        let mut ctx = ctx();

        assert_eq!(chain.run_from(0, &mut ctx).await, Flow::Abort);
        assert!(trace.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrapping_runs_rest_once() {
        let trace = Trace::default();
        let wrap: Arc<dyn Middleware> = Arc::new(Wrap { trace: Arc::clone(&trace) });
        let chain = chain(vec![record("A", &trace), wrap, record("C", &trace)], &trace);
        let mut ctx = ctx();

        assert_eq!(chain.run_from(0, &mut ctx).await, Flow::Proceed);
        assert_eq!(*trace.lock().unwrap(), vec!["A", "before", "C", "H", "after Some(200)"]);
    }

    #[tokio::test]
    async fn test_fault_halts_forward_progress() {
        let trace = Trace::default();
        let fault: Arc<dyn Middleware> = Arc::new(middleware_fn(|_ctx: &mut RequestContext| Flow::fault("db down")));
        let wrap: Arc<dyn Middleware> = Arc::new(Wrap { trace: Arc::clone(&trace) });
        let chain = chain(vec![wrap, fault, record("C", &trace)], &trace);
        let mut ctx = ctx();

        assert_eq!(chain.run_from(0, &mut ctx).await, Flow::fault("db down"));
        assert_eq!(*trace.lock().unwrap(), vec!["before", "after None"]);
    }
}
