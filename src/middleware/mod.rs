mod logger;
mod security;

pub use logger::Logger;
pub use security::{SecurityConfig, SecurityHeaders};

use crate::context::Context;
use crate::error::HandlerResult;
use crate::handler::{BoxFuture, Handler};
use std::sync::Arc;

/// The downstream part of the chain, as seen from a middleware.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    handler: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Runs the rest of the chain. `ctx` may be a reborrow, so the caller
    /// keeps access to the context once the downstream future completes.
    pub fn run<'c>(self, ctx: &'c mut Context) -> BoxFuture<'c, HandlerResult>
    where
        'a: 'c,
    {
        self.handler.call(ctx)
    }
}

/// Wraps the downstream handler with before/after behaviour.
///
/// A middleware that returns without calling [`Next::run`] short-circuits
/// the chain; its result becomes the result of the whole chain.
pub trait Middleware: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, HandlerResult>;
}

/// Middleware built from a closure, see [`from_fn`].
#[derive(Clone)]
pub struct FromFn<F> {
    f: F,
}

/// Adapts a closure into a [`Middleware`].
///
/// ```rust
/// use shttp::middleware::from_fn;
///
/// let stamp = from_fn(|c, next| {
///     Box::pin(async move {
///         c.set("stamped", true);
///         next.run(c).await
///     })
/// });
/// # let _ = stamp;
/// ```
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    FromFn { f }
}

impl<F> Middleware for FromFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
        (self.f)(ctx, next)
    }
}

struct Layered {
    middleware: Arc<dyn Middleware>,
    next: Arc<dyn Handler>,
}

impl Handler for Layered {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        self.middleware.call(
            ctx,
            Next {
                handler: self.next.as_ref(),
            },
        )
    }
}

/// Composes `middlewares` around `endpoint`.
///
/// The first middleware becomes the outermost layer: "before" logic runs
/// in list order, "after" logic in reverse. The result holds no per-request
/// state and may be invoked any number of times.
pub fn compose(endpoint: Arc<dyn Handler>, middlewares: &[Arc<dyn Middleware>]) -> Arc<dyn Handler> {
    let mut next = endpoint;
    for middleware in middlewares.iter().rev() {
        next = Arc::new(Layered {
            middleware: Arc::clone(middleware),
            next,
        });
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::http::{Method, Request};
    use crate::matcher::Params;

    fn context() -> Context {
        Context::new(Request::new(Method::GET, "/"), Params::default())
    }

    fn marker(name: &'static str) -> Arc<dyn Middleware> {
        Arc::new(from_fn(move |c, next| {
            Box::pin(async move {
                c.response.write(format!("{}>", name).as_bytes());
                let result = next.run(c).await;
                c.response.write(format!("<{}", name).as_bytes());
                result
            })
        }))
    }

    fn hello(c: &mut Context) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move {
            c.response.write(b"H");
            Ok(())
        })
    }

    fn fail(_c: &mut Context) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move { Err(Error::msg("boom")) })
    }

    #[tokio::test]
    async fn first_registered_is_outermost() {
        let chain = compose(Arc::new(hello), &[marker("A"), marker("B")]);
        let mut ctx = context();
        chain.call(&mut ctx).await.unwrap();
        assert_eq!(ctx.response.body_string(), "A>B>H<B<A");
    }

    #[tokio::test]
    async fn empty_chain_is_the_endpoint() {
        let chain = compose(Arc::new(hello), &[]);
        let mut ctx = context();
        chain.call(&mut ctx).await.unwrap();
        assert_eq!(ctx.response.body_string(), "H");
    }

    #[tokio::test]
    async fn short_circuit_skips_everything_inside() {
        let deny: Arc<dyn Middleware> = Arc::new(from_fn(|_c, _next| {
            Box::pin(async move { Err(Error::msg("denied")) })
        }));
        let chain = compose(Arc::new(hello), &[marker("A"), deny, marker("B")]);

        let mut ctx = context();
        let err = chain.call(&mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "denied");
        assert_eq!(ctx.response.body_string(), "A><A");
    }

    #[tokio::test]
    async fn endpoint_failure_passes_through_after_logic() {
        let chain = compose(Arc::new(fail), &[marker("A")]);
        let mut ctx = context();
        let err = chain.call(&mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(ctx.response.body_string(), "A><A");
    }

    #[tokio::test]
    async fn invocations_do_not_share_state() {
        let counter: Arc<dyn Middleware> = Arc::new(from_fn(|c, next| {
            Box::pin(async move {
                let seen = c.get_as::<u32>("hits").unwrap_or(0);
                c.set("hits", seen + 1);
                next.run(c).await
            })
        }));
        let chain = compose(Arc::new(hello), &[counter]);

        for _ in 0..2 {
            let mut ctx = context();
            chain.call(&mut ctx).await.unwrap();
            assert_eq!(ctx.get_as::<u32>("hits"), Some(1));
        }
    }
}
