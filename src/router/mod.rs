//! Routing scopes.
//!
//! A [`Router`] is a scope: a path prefix, an ordered middleware list and an
//! error handler, all owned by that scope, plus a handle on the route table
//! shared with every scope derived from the same root.
//!
//! Registration freezes the scope's state into the route: the middleware
//! chain is composed and the error handler captured at the moment `get`,
//! `post`, ... is called. Middleware added or error handlers replaced later
//! only affect routes registered afterwards.
//!
//! Routes must all be registered before the router starts serving.

mod static_files;

use crate::context::Context;
use crate::error::{Error, HandlerResult, RouteError};
use crate::handler::{default_error_handler, BoxFuture, ErrorHandler, Handler};
use crate::http::{Method, Request, Response};
use crate::matcher::{Lookup, Params, PathMatcher, RouteTable};
use crate::middleware::{compose, Middleware};
use futures::FutureExt;
use static_files::StaticFiles;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

pub(crate) const NOT_FOUND_BODY: &str = "404 page not found";
const METHOD_NOT_ALLOWED_BODY: &str = "405 method not allowed";
const ABORTED_BODY: &str = "Internal Server Error";

/// A registered route: the composed chain of one scope plus the error
/// handler that scope had when the route was added.
pub struct Route {
    chain: Arc<dyn Handler>,
    on_error: ErrorHandler,
}

impl Route {
    pub(crate) fn new(chain: Arc<dyn Handler>, on_error: ErrorHandler) -> Self {
        Self { chain, on_error }
    }

    /// Runs the chain for one matched request.
    ///
    /// A failure goes to the captured error handler exactly once. A panic
    /// anywhere in the chain (such as `Context::must_get` on a missing key)
    /// aborts the request instead: whatever was written is discarded and a
    /// bare `500` goes out without involving the error handler.
    pub(crate) async fn handle(&self, request: Request, params: Params) -> Response {
        let method = request.method;
        let path = request.path.clone();
        let mut ctx = Context::new(request, params);

        let outcome = AssertUnwindSafe(self.chain.call(&mut ctx))
            .catch_unwind()
            .await;
        let panicked = match outcome {
            Ok(Ok(())) => return ctx.into_response(),
            Ok(Err(err)) => {
                let on_error = &self.on_error;
                match panic::catch_unwind(AssertUnwindSafe(|| on_error(&mut ctx, err))) {
                    Ok(()) => return ctx.into_response(),
                    Err(panicked) => panicked,
                }
            }
            Err(panicked) => panicked,
        };

        tracing::error!(
            %method,
            %path,
            panic = %panic_message(&*panicked),
            "request aborted"
        );
        Response::text(500, ABORTED_BODY)
    }
}

fn panic_message(panicked: &(dyn Any + Send)) -> String {
    if let Some(msg) = panicked.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panicked.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Unknown panic".to_string()
    }
}

pub struct Router {
    prefix: String,
    middlewares: Vec<Arc<dyn Middleware>>,
    on_error: ErrorHandler,
    table: Arc<RwLock<Box<dyn RouteTable>>>,
}

impl Router {
    /// Creates a root scope over a fresh [`PathMatcher`].
    pub fn new() -> Self {
        Self::with_table(PathMatcher::new())
    }

    /// Creates a root scope over a custom route table.
    pub fn with_table<T: RouteTable>(table: T) -> Self {
        Self {
            prefix: String::new(),
            middlewares: Vec::new(),
            on_error: default_error_handler(),
            table: Arc::new(RwLock::new(Box::new(table))),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Appends a middleware to this scope. Call it once per middleware, in
    /// the order they should wrap the handler; the first one is outermost.
    pub fn middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Replaces this scope's error handler.
    pub fn on_error<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context, Error) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(handler);
        self
    }

    /// Derives a child scope at `self.prefix + prefix`.
    ///
    /// The child shares the route table and starts with a snapshot of this
    /// scope's middleware list and error handler. The two scopes evolve
    /// independently from then on.
    pub fn sub(&self, prefix: &str) -> Router {
        Router {
            prefix: self.join_path(prefix),
            middlewares: self.middlewares.clone(),
            on_error: Arc::clone(&self.on_error),
            table: Arc::clone(&self.table),
        }
    }

    fn join_path(&self, pattern: &str) -> String {
        format!("{}{}", self.prefix, pattern)
    }

    /// Registers `handler` for `method` at `self.prefix + pattern`.
    pub fn try_route<H: Handler>(&self, method: Method, pattern: &str, handler: H) -> Result<(), RouteError> {
        let path = self.join_path(pattern);
        let chain = compose(Arc::new(handler), &self.middlewares);
        let route = Arc::new(Route::new(chain, Arc::clone(&self.on_error)));

        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(method, &path, route)?;

        tracing::debug!(
            %method,
            %path,
            middlewares = self.middlewares.len(),
            "route registered"
        );
        Ok(())
    }

    /// Like [`Router::try_route`].
    ///
    /// # Panics
    ///
    /// Panics when the pattern is invalid or the method is already
    /// registered for the same route shape.
    pub fn route<H: Handler>(&self, method: Method, pattern: &str, handler: H) -> &Self {
        if let Err(err) = self.try_route(method, pattern, handler) {
            panic!("{}", err);
        }
        self
    }

    pub fn get<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.route(Method::GET, pattern, handler)
    }

    pub fn post<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.route(Method::POST, pattern, handler)
    }

    pub fn put<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.route(Method::PUT, pattern, handler)
    }

    pub fn patch<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.route(Method::PATCH, pattern, handler)
    }

    pub fn delete<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.route(Method::DELETE, pattern, handler)
    }

    pub fn options<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.route(Method::OPTIONS, pattern, handler)
    }

    /// Serves files below `root` at `pattern/<relative path>`.
    ///
    /// The route goes through this scope like any other, so its middleware
    /// and error handler apply.
    pub fn static_files<P: Into<PathBuf>>(&self, pattern: &str, root: P) -> &Self {
        let pattern = format!("{}/*filepath", pattern.trim_end_matches('/'));
        self.route(Method::GET, &pattern, StaticFiles::new(root))
    }

    /// Dispatches one request through the shared route table.
    ///
    /// When the path only misses a route by a trailing slash the client is
    /// redirected to the registered form (`301` for `GET`, `308` otherwise).
    /// Other unmatched paths get `404`, a known path with an unregistered
    /// method gets `405` with an `Allow` header. None of these involve an
    /// error handler.
    pub async fn serve(&self, request: Request) -> Response {
        let (lookup, redirect) = {
            let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
            let lookup = table.lookup(request.method, &request.path);
            let redirect = match lookup {
                Lookup::Found(..) => None,
                _ => toggle_trailing_slash(&request.path)
                    .filter(|alt| matches!(table.lookup(request.method, alt), Lookup::Found(..))),
            };
            (lookup, redirect)
        };

        if let Some(path) = redirect {
            let status = if request.method == Method::GET { 301 } else { 308 };
            let mut response = Response::new();
            response.header("Location", location(&path, &request.query));
            response.write_header(status);
            return response;
        }

        match lookup {
            Lookup::Found(route, params) => route.handle(request, params).await,
            Lookup::MethodNotAllowed(allowed) => {
                let allow: Vec<&str> = allowed.iter().map(Method::as_str).collect();
                let mut response = Response::text(405, METHOD_NOT_ALLOWED_BODY);
                response.header("Allow", allow.join(", "));
                response
            }
            Lookup::NotFound => Response::text(404, NOT_FOUND_BODY),
        }
    }
}

fn toggle_trailing_slash(path: &str) -> Option<String> {
    match path.strip_suffix('/') {
        _ if path == "/" => None,
        Some(trimmed) => Some(trimmed.to_string()),
        None => Some(format!("{}/", path)),
    }
}

/// Re-encodes a decoded path and query map into a `Location` value.
fn location(path: &str, query: &HashMap<String, String>) -> String {
    let mut location = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if !query.is_empty() {
        let mut pairs: Vec<_> = query.iter().collect();
        pairs.sort();
        let encoded: Vec<String> = pairs
            .into_iter()
            .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
            .collect();
        location.push('?');
        location.push_str(&encoded.join("&"));
    }
    location
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_prefix_concatenates() {
        let root = Router::new();
        let a = root.sub("/a");
        assert_eq!(a.prefix(), "/a");
        assert_eq!(a.join_path("/hello"), "/a/hello");
        assert_eq!(a.sub("/b").prefix(), "/a/b");
    }

    #[test]
    fn sub_shares_the_route_table() {
        let root = Router::new();
        let child = root.sub("/x").sub("/y");
        assert!(Arc::ptr_eq(&root.table, &child.table));
    }

    #[test]
    fn trailing_slash_toggles_except_root() {
        assert_eq!(toggle_trailing_slash("/"), None);
        assert_eq!(toggle_trailing_slash("/users/7/").as_deref(), Some("/users/7"));
        assert_eq!(toggle_trailing_slash("/users/7").as_deref(), Some("/users/7/"));
    }

    #[test]
    fn location_re_encodes_path_and_query() {
        let mut query = HashMap::new();
        query.insert("q".to_string(), "a b".to_string());
        query.insert("page".to_string(), "2".to_string());
        assert_eq!(location("/café/x y", &query), "/caf%C3%A9/x%20y?page=2&q=a%20b");
        assert_eq!(location("/plain/", &HashMap::new()), "/plain/");
    }

    #[test]
    fn sub_snapshots_middleware() {
        let mut root = Router::new();
        root.middleware(crate::middleware::Logger);
        let child = root.sub("/child");
        root.middleware(crate::middleware::Logger);

        assert_eq!(child.middlewares.len(), 1);
        assert_eq!(root.middlewares.len(), 2);
    }
}
