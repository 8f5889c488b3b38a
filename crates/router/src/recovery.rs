//! Failure recovery for the middleware chain.
//!
//! A middleware or handler fails unrecoverably either by panicking or by returning
//! [`Flow::Fault`](crate::middleware::Flow::Fault). Both end up as a [`Fault`] that is handed to
//! exactly one [`RecoveryHandler`] invocation. The failure never escapes dispatch.

use crate::body::ResponseBody;
use crate::middleware::{Chain, Flow};
use crate::responder::Responder;
use crate::RequestContext;
use futures::FutureExt;
use http::{Response, StatusCode};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::error;

/// The diagnostic payload of an unrecoverable failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    message: Cow<'static, str>,
}

impl Fault {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self { message: message.into() }
    }

    /// Converts a panic payload, keeping the message of `panic!("...")` style panics.
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        if let Some(message) = payload.downcast_ref::<&'static str>() {
            Self::new(*message)
        } else if let Some(message) = payload.downcast_ref::<String>() {
            Self::new(message.clone())
        } else {
            Self::new("handler panicked with a non-string payload")
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Turns a [`Fault`] into the response sent to the client.
///
/// The router forces the final status into the 5xx range, whatever the handler returns.
pub trait RecoveryHandler: Send + Sync {
    fn recover(&self, ctx: &RequestContext, fault: &Fault) -> Response<ResponseBody>;
}

impl<F, R> RecoveryHandler for F
where
    F: Fn(&RequestContext, &Fault) -> R + Send + Sync,
    R: Responder,
{
    fn recover(&self, ctx: &RequestContext, fault: &Fault) -> Response<ResponseBody> {
        (self)(ctx, fault).response_to(ctx)
    }
}

/// Answers `500 Internal Server Error` without exposing the fault.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRecovery;

impl RecoveryHandler for DefaultRecovery {
    fn recover(&self, ctx: &RequestContext, _fault: &Fault) -> Response<ResponseBody> {
        (StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error").response_to(ctx)
    }
}

/// Runs `chain` inside the panic boundary.
///
/// A panic or a [`Flow::Fault`] leads to exactly one call of `recovery`. When the recovery
/// handler itself panics, or answers with a status outside the 5xx range, the response is
/// still a `500`.
pub(crate) async fn execute(chain: &Chain, ctx: &mut RequestContext, recovery: &dyn RecoveryHandler) -> Response<ResponseBody> {
    let outcome = AssertUnwindSafe(chain.run_from(0, ctx)).catch_unwind().await;

    let fault = match outcome {
        Ok(Flow::Proceed | Flow::Abort) => {
            return ctx.take_response().unwrap_or_else(|| Response::new(ResponseBody::empty()));
        }
        Ok(Flow::Fault(fault)) => fault,
        Err(payload) => Fault::from_panic(payload.as_ref()),
    };

    error!(method = %ctx.method(), path = ctx.path(), %fault, "recovered from a failed request");
    let recovered = panic::catch_unwind(AssertUnwindSafe(|| recovery.recover(ctx, &fault)));
    let mut response = match recovered {
        Ok(response) => response,
        Err(payload) => {
            error!(cause = %Fault::from_panic(payload.as_ref()), "recovery handler panicked");
            DefaultRecovery.recover(ctx, &fault)
        }
    };

    if !response.status().is_server_error() {
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    }
    response
}
