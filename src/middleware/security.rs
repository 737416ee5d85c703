use crate::context::Context;
use crate::error::HandlerResult;
use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};

#[derive(Clone, Debug)]
pub struct SecurityConfig {
    pub hsts: bool,
    pub xss_protection: bool,
    pub content_type_options: bool,
    pub frame_options: Option<String>,
    pub content_security_policy: Option<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            hsts: true,
            xss_protection: true,
            content_type_options: true,
            frame_options: Some("DENY".to_string()),
            content_security_policy: None,
        }
    }
}

/// Adds the configured security headers once the downstream chain has
/// run, whether it succeeded or not, so error responses carry them too.
pub struct SecurityHeaders {
    config: SecurityConfig,
}

impl SecurityHeaders {
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    fn apply(&self, ctx: &mut Context) {
        let response = &mut ctx.response;
        if self.config.hsts {
            response.header("Strict-Transport-Security", "max-age=31536000");
        }
        if self.config.xss_protection {
            response.header("X-XSS-Protection", "1; mode=block");
        }
        if self.config.content_type_options {
            response.header("X-Content-Type-Options", "nosniff");
        }
        if let Some(ref frame_options) = self.config.frame_options {
            response.header("X-Frame-Options", frame_options);
        }
        if let Some(ref content_security_policy) = self.config.content_security_policy {
            response.header("Content-Security-Policy", content_security_policy);
        }
    }
}

impl Middleware for SecurityHeaders {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let result = next.run(ctx).await;
            self.apply(ctx);
            result
        })
    }
}
