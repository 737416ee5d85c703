use crate::http::Method;
use std::io;
use thiserror::Error;

/// Failure signal returned by a handler or a short-circuiting middleware.
///
/// Every `Error` is recovered by the error handler of the scope that
/// registered the route; it never travels further up.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Message(String),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Builds a plain message error, the usual way for a handler to fail.
    pub fn msg<M: Into<String>>(message: M) -> Self {
        Error::Message(message.into())
    }

    pub fn custom<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Custom(Box::new(err))
    }
}

/// Raised while registering a route on the shared route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route conflict: handler for `{method} {path}` already exists")]
    Conflict { method: Method, path: String },
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },
}

pub type HandlerResult = Result<(), Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_error_displays_verbatim() {
        assert_eq!(Error::msg("error from root").to_string(), "error from root");
    }

    #[test]
    fn conflict_names_method_and_path() {
        let err = RouteError::Conflict {
            method: Method::GET,
            path: "/a/:id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "route conflict: handler for `GET /a/:id` already exists"
        );
    }
}
