//! Declarative description of one handler scenario.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, Request};

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{Config, Context, HandlerFn, HarnessError, HarnessResult, Param, ResponseRecorder};

#[derive(Clone)]
pub struct ApiTestCase {
    pub name: String,
    /// Name of the test or benchmark function, used for the profile directory.
    pub function_name: String,
    pub method: Method,
    pub url: String,
    pub handler: HandlerFn,
    pub request_body: String,
    pub path_params: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub context_keys: serde_json::Map<String, serde_json::Value>,
    /// Present in assertion mode, absent for benchmarks and profiling.
    pub expected_code: Option<i64>,
}

impl fmt::Debug for ApiTestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiTestCase")
            .field("name", &self.name)
            .field("function_name", &self.function_name)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("path_params", &self.path_params)
            .field("headers", &self.headers)
            .field("expected_code", &self.expected_code)
            .finish_non_exhaustive()
    }
}

impl ApiTestCase {
    pub fn new<F>(name: impl Into<String>, method: Method, url: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            function_name: String::new(),
            method,
            url: url.into(),
            handler: Arc::new(handler),
            request_body: String::new(),
            path_params: Vec::new(),
            headers: BTreeMap::new(),
            context_keys: serde_json::Map::new(),
            expected_code: None,
        }
    }

    pub fn function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = name.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.request_body = body.into();
        self
    }

    pub fn path_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn context_key(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context_keys.insert(key.into(), value.into());
        self
    }

    pub fn expect_code(mut self, code: i64) -> Self {
        self.expected_code = Some(code);
        self
    }

    /// Builds the request: common headers first, then the case's own.
    /// Header names are case-insensitive, so a case header replaces a common
    /// one however it is spelled.
    pub fn build_request(&self, config: &Config) -> HarnessResult<Request<Vec<u8>>> {
        let mut headers = HeaderMap::new();
        for (key, value) in config.common_headers.iter().chain(&self.headers) {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                HarnessError::Request(format!("case {:?}: invalid header name {key:?}: {e}", self.name))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                HarnessError::Request(format!("case {:?}: invalid value for {key:?}: {e}", self.name))
            })?;
            headers.insert(name, value);
        }
        let mut request = Request::builder()
            .method(self.method.clone())
            .uri(self.url.as_str())
            .body(self.request_body.clone().into_bytes())
            .map_err(|e| HarnessError::Request(format!("case {:?}: {e}", self.name)))?;
        *request.headers_mut() = headers;
        Ok(request)
    }

    pub fn api_path_params(&self) -> Vec<Param> {
        self.path_params
            .iter()
            .map(|(key, value)| Param {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }

    /// Runs the handler once against freshly constructed request state.
    pub fn execute_handler(&self, config: &Config) -> HarnessResult<ResponseRecorder> {
        let request = self.build_request(config)?;
        let mut keys = config.common_context.clone();
        keys.extend(self.context_keys.iter().map(|(k, v)| (k.clone(), v.clone())));
        let mut ctx = Context::new(request, self.api_path_params(), keys);
        (self.handler)(&mut ctx);
        Ok(ctx.into_response())
    }

    /// `<root>/<function>/<case name with spaces as underscores>`. Only the
    /// last segment of a `/` or `::` qualified function name is used.
    pub fn profile_dir(&self, root: &Path) -> PathBuf {
        let case_name = self.name.replace(' ', "_");
        let function_name = self
            .function_name
            .rsplit(['/', ':'])
            .next()
            .unwrap_or_default();
        root.join(function_name).join(case_name)
    }
}
