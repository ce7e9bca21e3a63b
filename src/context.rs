//! Request/response state handed to the handler under test.

use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Request, StatusCode, Uri};
use serde::Serialize;
use serde::de::DeserializeOwned;

use std::sync::Arc;

use crate::{HarnessError, HarnessResult};

/// A handler under test. It reads the request from the [`Context`] and writes
/// its response into the context's recorder.
pub type HandlerFn = Arc<dyn Fn(&mut Context) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

/// Captures whatever the handler writes.
#[derive(Debug, Clone)]
pub struct ResponseRecorder {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Default for ResponseRecorder {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }
}

impl ResponseRecorder {
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct Context {
    request: Request<Vec<u8>>,
    params: Vec<Param>,
    keys: serde_json::Map<String, serde_json::Value>,
    response: ResponseRecorder,
}

impl Context {
    pub fn new(
        request: Request<Vec<u8>>,
        params: Vec<Param>,
        keys: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            request,
            params,
            keys,
            response: ResponseRecorder::default(),
        }
    }

    pub fn request(&self) -> &Request<Vec<u8>> {
        &self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        self.request.body()
    }

    pub fn bind_json<T: DeserializeOwned>(&self) -> HarnessResult<T> {
        Ok(serde_json::from_slice(self.request.body())?)
    }

    /// Value of a path parameter such as `id` in `/users/:id`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.keys.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.keys.insert(key.into(), value.into());
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.response.status = status;
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> HarnessResult<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HarnessError::InvalidArgument(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| HarnessError::InvalidArgument(format!("invalid header value {value:?}: {e}")))?;
        self.response.headers.insert(name, value);
        Ok(())
    }

    /// Serializes `value` as the response body. Serialization failures become
    /// a 500 with an empty body, like a framework would.
    pub fn json<T: Serialize>(&mut self, status: StatusCode, value: &T) {
        match serde_json::to_vec(value) {
            Ok(body) => {
                self.response.status = status;
                self.response.body = body;
                self.response
                    .headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
            }
            Err(err) => {
                tracing::warn!("failed to serialize handler response: {err}");
                self.response.status = StatusCode::INTERNAL_SERVER_ERROR;
                self.response.body.clear();
            }
        }
    }

    pub fn string(&mut self, status: StatusCode, body: impl Into<String>) {
        self.response.status = status;
        self.response.body = body.into().into_bytes();
        self.response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    }

    pub fn response(&self) -> &ResponseRecorder {
        &self.response
    }

    pub fn into_response(self) -> ResponseRecorder {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Context {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/users/42?verbose=1")
            .header("X-Tenant", "acme")
            .body(br#"{"name":"ada"}"#.to_vec())
            .expect("request");
        let mut keys = serde_json::Map::new();
        keys.insert("user_name".to_string(), serde_json::json!("ada"));
        Context::new(
            request,
            vec![Param {
                key: "id".to_string(),
                value: "42".to_string(),
            }],
            keys,
        )
    }

    #[test]
    fn exposes_request_params_and_keys() {
        let ctx = context();
        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.uri().path(), "/users/42");
        assert_eq!(ctx.header("x-tenant"), Some("acme"));
        assert_eq!(ctx.param("id"), Some("42"));
        assert_eq!(ctx.param("missing"), None);
        assert_eq!(ctx.get("user_name"), Some(&serde_json::json!("ada")));
        let body: serde_json::Value = ctx.bind_json().expect("json body");
        assert_eq!(body["name"], "ada");
    }

    #[test]
    fn json_records_status_body_and_content_type() {
        let mut ctx = context();
        ctx.json(StatusCode::CREATED, &serde_json::json!({"ok": true}));
        let resp = ctx.into_response();
        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(resp.body_string(), r#"{"ok":true}"#);
        assert!(
            resp.headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("application/json"))
        );
    }

    #[test]
    fn set_header_rejects_invalid_names() {
        let mut ctx = context();
        assert!(ctx.set_header("bad header", "x").is_err());
        ctx.set_header("X-Request-Id", "abc").expect("valid header");
        assert_eq!(
            ctx.response().headers.get("x-request-id").and_then(|v| v.to_str().ok()),
            Some("abc")
        );
    }
}
