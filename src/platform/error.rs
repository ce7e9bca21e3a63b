//! Crate-wide error types.

use thiserror::Error;

pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("request error: {0}")]
    Request(String),

    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error("profile state error: {0}")]
    ProfileState(String),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("unsupported output format {0:?} (only \"png\" and \"pdf\" are supported)")]
    UnsupportedFormat(String),

    #[error("unknown profile kind {0:?}")]
    UnknownProfileKind(String),

    #[error("invalid BinData: {0}")]
    BinDataFormat(String),
}
