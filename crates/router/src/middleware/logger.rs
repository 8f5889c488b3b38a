use crate::middleware::{Flow, Middleware, Next};
use crate::RequestContext;
use async_trait::async_trait;
use http::StatusCode;
use std::time::Instant;
use tracing::{info, warn};

/// Logs one line per request with its method, path, status and latency.
///
/// Install it first so the latency covers every other middleware. A request that faults is
/// logged as well, before the recovery handler runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Logger;

#[async_trait]
impl Middleware for Logger {
    async fn handle(&self, ctx: &mut RequestContext, next: &mut Next<'_>) -> Flow {
        let start = Instant::now();
        let flow = next.run(ctx).await;
        let elapsed = start.elapsed();
        let status = ctx.response().map_or(StatusCode::OK, http::Response::status);

        match &flow {
            Flow::Fault(fault) => {
                warn!(method = %ctx.method(), path = ctx.path(), ?elapsed, %fault, "request failed");
            }
            Flow::Proceed | Flow::Abort => {
                info!(method = %ctx.method(), path = ctx.path(), status = status.as_u16(), ?elapsed, "request completed");
            }
        }
        flow
    }
}
