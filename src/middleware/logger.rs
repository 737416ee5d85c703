use crate::context::Context;
use crate::error::HandlerResult;
use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use std::time::Instant;

/// Logs one line per request with its status and duration.
#[derive(Clone, Copy, Debug, Default)]
pub struct Logger;

impl Middleware for Logger {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request.method;
            let path = ctx.request.path.clone();
            let result = next.run(ctx).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(
                    %method,
                    %path,
                    status = ctx.response.status(),
                    elapsed_ms,
                    "request handled"
                ),
                Err(err) => tracing::warn!(%method, %path, error = %err, elapsed_ms, "request failed"),
            }
            result
        })
    }
}
