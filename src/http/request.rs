use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    CONNECT,
    OPTIONS,
    TRACE,
    PATCH,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::CONNECT => "CONNECT",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
            Method::PATCH => "PATCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown HTTP method `{}`", self.0)
    }
}

impl std::error::Error for UnknownMethod {}

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Method, UnknownMethod> {
        match s {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "HEAD" => Ok(Method::HEAD),
            "CONNECT" => Ok(Method::CONNECT),
            "OPTIONS" => Ok(Method::OPTIONS),
            "TRACE" => Ok(Method::TRACE),
            "PATCH" => Ok(Method::PATCH),
            other => Err(UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw request payload. Parsing it is left to the handler.
#[derive(Debug, Default, Clone)]
pub struct Body {
    pub(crate) data: Vec<u8>,
}

impl Body {
    pub fn new() -> Body {
        Body { data: Vec::new() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.data).to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Body {
        Body { data }
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Body {
        Body {
            data: s.as_bytes().to_vec(),
        }
    }
}

/// Inbound request as seen by the router.
///
/// Header names are stored lowercase.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Body,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: Body::new(),
        }
    }

    /// Builds a request from a request target. The path is percent-decoded
    /// before routing sees it; a path that does not decode to UTF-8 is kept
    /// as sent. The query string is split off and decoded separately.
    pub fn from_target(method: Method, target: &str) -> Self {
        let mut parts = target.splitn(2, '?');
        let path = parts.next().unwrap_or("/");
        let path = if path.is_empty() { "/" } else { path };
        let path = urlencoding::decode(path)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| path.to_string());
        let mut req = Request::new(method, path);
        if let Some(query) = parts.next() {
            req.query = parse_query(query);
        }
        req
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn get_query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

pub(crate) fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = decode(parts.next()?);
            let value = decode(parts.next().unwrap_or(""));
            Some((key, value))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_methods_and_rejects_others() {
        assert_eq!("PATCH".parse::<Method>(), Ok(Method::PATCH));
        assert_eq!(
            "BREW".parse::<Method>(),
            Err(UnknownMethod("BREW".to_string()))
        );
    }

    #[test]
    fn target_query_is_decoded() {
        let req = Request::from_target(Method::GET, "/search?q=hello%20world&tag=a+b&flag");
        assert_eq!(req.path, "/search");
        assert_eq!(req.get_query("q"), Some("hello world"));
        assert_eq!(req.get_query("tag"), Some("a b"));
        assert_eq!(req.get_query("flag"), Some(""));
    }

    #[test]
    fn target_path_is_decoded_once() {
        let req = Request::from_target(Method::GET, "/caf%C3%A9/john%20doe/100%2525?a=b");
        assert_eq!(req.path, "/café/john doe/100%25");
        assert_eq!(req.get_query("a"), Some("b"));

        let req = Request::from_target(Method::GET, "/raw%FF");
        assert_eq!(req.path, "/raw%FF");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(Method::GET, "/").with_header("X-Request-Id", "42");
        assert_eq!(req.get_header("x-request-id"), Some("42"));
        assert_eq!(req.get_header("X-REQUEST-ID"), Some("42"));
    }
}
