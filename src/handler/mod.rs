use crate::context::Context;
use crate::error::{Error, HandlerResult};
pub use futures::future::BoxFuture;
use std::sync::Arc;

/// Terminal request handler.
///
/// Any `for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult>` closure
/// or function is a handler:
///
/// ```rust
/// use shttp::{Context, HandlerResult};
/// use shttp::handler::BoxFuture;
///
/// fn hello(c: &mut Context) -> BoxFuture<'_, HandlerResult> {
///     Box::pin(async move { c.string(200, "Hello") })
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        (self)(ctx)
    }
}

/// Turns a handler failure into a written response. It must write exactly
/// one status and body to the context's response sink.
pub type ErrorHandler = Arc<dyn Fn(&mut Context, Error) + Send + Sync>;

/// Writes `500` with the error's message as a plain-text body.
pub fn default_error_handler() -> ErrorHandler {
    Arc::new(|ctx: &mut Context, err: Error| {
        let _ = ctx.string(500, err.to_string());
    })
}
