//! The `{"response": {...}}` envelope handlers are expected to produce.

use serde::{Deserialize, Serialize};

use crate::{HarnessError, HarnessResult};

pub const RESPONSE_KEY: &str = "response";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub api_status: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn new(code: i64, api_status: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            api_status,
            message: message.into(),
            data: None,
            meta_data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_meta_data(mut self, meta_data: serde_json::Value) -> Self {
        self.meta_data = Some(meta_data);
        self
    }

    /// Wraps the response under the envelope key.
    pub fn envelope(&self) -> serde_json::Value {
        let mut outer = serde_json::Map::new();
        outer.insert(
            RESPONSE_KEY.to_string(),
            serde_json::to_value(self).unwrap_or_default(),
        );
        serde_json::Value::Object(outer)
    }
}

/// Parses a handler body into the inner [`ApiResponse`].
pub fn parse_envelope(body: &[u8]) -> HarnessResult<ApiResponse> {
    let outer: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)
        .map_err(|e| HarnessError::Assertion(format!("could not unmarshal JSON response: {e}")))?;
    let Some(inner) = outer.get(RESPONSE_KEY) else {
        return Err(HarnessError::Assertion(format!(
            "missing {RESPONSE_KEY:?} key in JSON"
        )));
    };
    serde_json::from_value(inner.clone())
        .map_err(|e| HarnessError::Assertion(format!("could not unmarshal {RESPONSE_KEY:?}: {e}")))
}
