//! Per-request carrier threaded through the middleware chain.
//!
//! A [`Context`] is built fresh by the route adapter for every matched
//! request and dropped once the response has been produced. It owns the
//! request, the response sink, the path parameters extracted by the matcher
//! and a scratch map that middleware and handlers use to pass values along
//! the chain.

use crate::error::HandlerResult;
use crate::http::{Request, Response, MIME_HTML, MIME_JSON, MIME_PLAIN_TEXT};
use crate::matcher::Params;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug)]
pub struct Context {
    pub request: Request,
    pub response: Response,
    params: Params,
    values: Option<HashMap<String, Value>>,
}

impl Context {
    pub fn new(request: Request, params: Params) -> Self {
        Self {
            request,
            response: Response::new(),
            params,
            values: None,
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.values
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.as_ref().and_then(|values| values.get(key))
    }

    /// Typed variant of [`Context::get`]; `None` when absent or when the
    /// stored value has a different shape.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        self.get(key)
            .and_then(|value| serde_json::from_value(value.to_owned()).ok())
    }

    /// Returns the value stored under `key`.
    ///
    /// # Panics
    ///
    /// Panics when `key` was never set. A missing value is a programming
    /// error in the chain, not a request failure: the route adapter aborts
    /// the request with a bare `500` and the scope's error handler is not
    /// consulted.
    pub fn must_get(&self, key: &str) -> &Value {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key \"{}\" does not exist in request context", key),
        }
    }

    pub fn string<S: AsRef<str>>(&mut self, status: u16, body: S) -> HandlerResult {
        self.response.header("Content-Type", MIME_PLAIN_TEXT);
        self.response.write_header(status);
        self.response.write(body.as_ref().as_bytes());
        Ok(())
    }

    /// Serializes `value` first so that an encoding failure leaves the sink
    /// untouched for the error handler.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: u16, value: &T) -> HandlerResult {
        let bytes = serde_json::to_vec(value)?;
        self.response.header("Content-Type", MIME_JSON);
        self.response.write_header(status);
        self.response.write(&bytes);
        Ok(())
    }

    pub fn html<S: Serialize>(
        &mut self,
        status: u16,
        template: &minijinja::Template<'_, '_>,
        data: S,
    ) -> HandlerResult {
        let rendered = template.render(data)?;
        self.response.header("Content-Type", MIME_HTML);
        self.response.write_header(status);
        self.response.write(rendered.as_bytes());
        Ok(())
    }

    pub fn no_content(&mut self, status: u16) -> HandlerResult {
        self.response.write_header(status);
        Ok(())
    }

    pub(crate) fn into_response(self) -> Response {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::http::Method;
    use serde::ser::{Serialize, Serializer};
    use serde_json::json;

    fn context() -> Context {
        Context::new(Request::new(Method::GET, "/"), Params::default())
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut ctx = context();
        ctx.set("k", "v");
        assert_eq!(ctx.get("k"), Some(&json!("v")));
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn set_overwrites_previous_value() {
        let mut ctx = context();
        ctx.set("user", 1);
        ctx.set("user", json!({ "id": 2 }));
        assert_eq!(ctx.get("user"), Some(&json!({ "id": 2 })));
    }

    #[test]
    fn get_as_rejects_wrong_shape() {
        let mut ctx = context();
        ctx.set("count", 3);
        assert_eq!(ctx.get_as::<u32>("count"), Some(3));
        assert_eq!(ctx.get_as::<String>("count"), None);
    }

    #[test]
    #[should_panic(expected = "key \"msg\" does not exist in request context")]
    fn must_get_panics_on_missing_key() {
        let ctx = context();
        ctx.must_get("msg");
    }

    #[test]
    fn string_writes_plain_text() {
        let mut ctx = context();
        ctx.string(200, "Hello").unwrap();
        assert_eq!(ctx.response.status(), 200);
        assert_eq!(ctx.response.header_value("Content-Type"), Some(MIME_PLAIN_TEXT));
        assert_eq!(ctx.response.body_string(), "Hello");
    }

    #[test]
    fn no_content_sets_status_only() {
        let mut ctx = context();
        ctx.no_content(204).unwrap();
        assert_eq!(ctx.response.status(), 204);
        assert_eq!(ctx.response.header_value("Content-Type"), None);
        assert!(ctx.response.body().is_empty());
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cannot encode"))
        }
    }

    #[test]
    fn json_failure_leaves_sink_untouched() {
        let mut ctx = context();
        let err = ctx.json(200, &Unserializable).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(!ctx.response.is_committed());
        assert_eq!(ctx.response.header_value("Content-Type"), None);
    }

    #[test]
    fn html_renders_template() {
        let mut env = minijinja::Environment::new();
        env.add_template("hello", "<h1>{{ name }}</h1>").unwrap();
        let template = env.get_template("hello").unwrap();

        let mut ctx = context();
        ctx.html(200, &template, json!({ "name": "A" })).unwrap();
        assert_eq!(ctx.response.header_value("Content-Type"), Some(MIME_HTML));
        assert_eq!(ctx.response.body_string(), "<h1>A</h1>");
    }
}
