use std::collections::HashMap;

pub const MIME_PLAIN_TEXT: &str = "plain/text";
pub const MIME_JSON: &str = "application/json; charset=utf8";
pub const MIME_HTML: &str = "text/html";

/// Outbound response sink.
///
/// The status line is write-once: the first `write_header` wins and later
/// calls are dropped. Headers stay mutable until the response is flushed by
/// the transport. Header names are stored lowercase.
#[derive(Debug, Default)]
pub struct Response {
    status: Option<u16>,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Response {
    pub fn new() -> Response {
        Response::default()
    }

    pub fn with_status(status: u16) -> Response {
        let mut response = Response::new();
        response.write_header(status);
        response
    }

    pub fn write_header(&mut self, status: u16) {
        match self.status {
            None => self.status = Some(status),
            Some(current) => {
                tracing::warn!(current, ignored = status, "superfluous write_header call");
            }
        }
    }

    /// Appends to the body, committing a `200` status if none was written.
    pub fn write(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status = Some(200);
        }
        self.body.extend_from_slice(bytes);
    }

    pub fn header<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) -> &mut Self {
        self.headers
            .insert(name.as_ref().to_lowercase(), value.as_ref().to_string());
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn status(&self) -> u16 {
        self.status.unwrap_or(200)
    }

    pub fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Plain-text response used by the transport and the matcher fallbacks.
    pub(crate) fn text(status: u16, body: &str) -> Response {
        let mut response = Response::new();
        response.header("Content-Type", MIME_PLAIN_TEXT);
        response.write_header(status);
        response.write(body.as_bytes());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_status_write_wins() {
        let mut response = Response::new();
        response.write_header(201);
        response.write_header(500);
        assert_eq!(response.status(), 201);
    }

    #[test]
    fn body_write_implies_ok_status() {
        let mut response = Response::new();
        response.write(b"mw1");
        response.write(b"Hello");
        response.write_header(404);
        assert_eq!(response.status(), 200);
        assert_eq!(response.body_string(), "mw1Hello");
    }

    #[test]
    fn headers_are_case_insensitive_and_last_set_wins() {
        let mut response = Response::new();
        response.header("Content-Type", MIME_HTML);
        response.header("content-type", MIME_JSON);
        assert_eq!(response.header_value("CONTENT-TYPE"), Some(MIME_JSON));
    }

    #[test]
    fn uncommitted_response_defaults_to_ok() {
        let response = Response::new();
        assert!(!response.is_committed());
        assert_eq!(response.status(), 200);
        assert!(response.body().is_empty());
    }
}
