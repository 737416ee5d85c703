//! Basic shttp application
//!
//! - a root scope with a logger and a plain-text error handler
//! - a `/sub` scope answering errors as JSON
//! - static files under `/static`
//!
//! Run with `RUST_LOG=shttp=debug,basic=info cargo run --example basic`.

use shttp::middleware::{from_fn, Logger};
use shttp::{json, Error, Router, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shttp=debug,basic=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut r = Router::new();
    r.on_error(|c, err| {
        let _ = c.string(500, err.to_string());
    });
    r.middleware(Logger);
    r.middleware(from_fn(|c, next| {
        Box::pin(async move {
            c.set("started_by", "root");
            next.run(c).await
        })
    }));

    r.get("/", |c| Box::pin(async move { c.string(200, "Hello") }));
    r.get("/error", |_c| Box::pin(async move { Err(Error::msg("error from root")) }));
    r.get("/users/:id", |c| {
        Box::pin(async move {
            let id = c.param("id").unwrap_or_default().to_string();
            let scope = c.must_get("started_by").clone();
            c.json(200, &json!({ "id": id, "scope": scope }))
        })
    });
    r.static_files("/static", "tests/static");

    let mut sub = r.sub("/sub");
    sub.on_error(|c, err| {
        let _ = c.json(500, &json!({ "error": err.to_string() }));
    });
    sub.get("/", |c| {
        Box::pin(async move { c.json(200, &json!({ "message": "Hello from sub" })) })
    });
    sub.get("/error", |_c| Box::pin(async move { Err(Error::msg("error from sub")) }));

    Server::new(r).listen("127.0.0.1:8080").await
}
