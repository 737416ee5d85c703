pub(crate) mod request;
pub(crate) mod response;

pub use request::{Body, Method, Request, UnknownMethod};
pub use response::{Response, MIME_HTML, MIME_JSON, MIME_PLAIN_TEXT};
