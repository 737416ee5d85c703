//! # shttp
//!
//! A lightweight HTTP routing facade: routes bound to method + path,
//! middleware composed around every handler, and sub-routers that carry
//! their own prefix, middleware and error handler while sharing one route
//! table.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shttp::{Error, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let app = Router::new();
//!     app.get("/", |c| Box::pin(async move { c.string(200, "Hello") }));
//!     app.get("/error", |_c| Box::pin(async move { Err(Error::msg("error from root")) }));
//!
//!     let mut api = app.sub("/api");
//!     api.on_error(|c, err| {
//!         let _ = c.json(500, &shttp::json!({ "error": err.to_string() }));
//!     });
//!     api.get("/users/:id", |c| {
//!         Box::pin(async move {
//!             let id = c.param("id").unwrap_or_default().to_string();
//!             c.json(200, &shttp::json!({ "id": id }))
//!         })
//!     });
//!
//!     Server::new(app).listen("127.0.0.1:8080").await
//! }
//! ```
//!
//! ## Middleware
//!
//! Middleware registered first wraps everything registered after it:
//!
//! ```rust
//! use shttp::middleware::{from_fn, Logger};
//! use shttp::Router;
//!
//! let mut app = Router::new();
//! app.middleware(Logger);
//! app.middleware(from_fn(|c, next| {
//!     Box::pin(async move {
//!         c.set("user", "anonymous");
//!         next.run(c).await
//!     })
//! }));
//! ```

pub mod context;
pub mod error;
pub mod handler;
pub mod http;
pub mod matcher;
pub mod middleware;
pub mod router;
pub mod server;

pub use serde_json::{json, Value};

pub use context::Context;
pub use error::{Error, HandlerResult, RouteError};
pub use handler::{ErrorHandler, Handler};
pub use http::{Method, Request, Response};
pub use matcher::{Params, PathMatcher, RouteTable};
pub use middleware::{Middleware, Next};
pub use router::Router;
pub use server::{Server, ServerConfig};
