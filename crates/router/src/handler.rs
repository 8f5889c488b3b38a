use crate::body::ResponseBody;
use crate::extract::FromRequest;
use crate::fn_trait::FnTrait;
use crate::responder::Responder;
use crate::RequestContext;
use async_trait::async_trait;
use http::Response;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// The terminal link of a middleware chain.
///
/// A handler reads what it needs from the [`RequestContext`] and produces the response. The
/// router stores that response in the context, so middleware that wraps the handler can
/// inspect or change it afterwards.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, ctx: &mut RequestContext) -> Response<ResponseBody>;
}

#[async_trait]
impl<T> RequestHandler for Arc<T>
where
    T: RequestHandler + ?Sized,
{
    async fn invoke(&self, ctx: &mut RequestContext) -> Response<ResponseBody> {
        self.as_ref().invoke(ctx).await
    }
}

#[async_trait]
impl<T> RequestHandler for Box<T>
where
    T: RequestHandler + ?Sized,
{
    async fn invoke(&self, ctx: &mut RequestContext) -> Response<ResponseBody> {
        self.as_ref().invoke(ctx).await
    }
}

/// a `FnTrait` holder which represents any async Fn
pub struct FnHandler<F, Args> {
    f: F,
    _phantom: PhantomData<fn(Args)>,
}

impl<F, Args> FnHandler<F, Args>
where
    F: FnTrait<Args>,
{
    fn new(f: F) -> Self {
        Self { f, _phantom: PhantomData }
    }
}

impl<F, Args> fmt::Debug for FnHandler<F, Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("f", &std::any::type_name::<F>()).finish()
    }
}

/// Turns an async function whose arguments are all extractors into a [`RequestHandler`].
///
/// When an extractor fails, its error is answered as the response and the function is not
/// called.
pub fn handler_fn<F, Args>(f: F) -> FnHandler<F, Args>
where
    F: FnTrait<Args>,
{
    FnHandler::new(f)
}

#[async_trait]
impl<F, Args> RequestHandler for FnHandler<F, Args>
where
    F: FnTrait<Args>,
    F::Output: Responder,
    Args: FromRequest,
{
    async fn invoke(&self, ctx: &mut RequestContext) -> Response<ResponseBody> {
        let args = match Args::from_request(ctx) {
            Ok(args) => args,
            Err(e) => return e.response_to(ctx),
        };
        let responder = self.f.call(args).await;
        responder.response_to(ctx)
    }
}
