//! Conversions between UUID strings and MongoDB `BinData(0, '...')` literals.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use uuid::Uuid;

use crate::{HarnessError, HarnessResult};

const PREFIX: &str = "BinData(0, '";
const SUFFIX: &str = "')";

/// `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` -> `BinData(0, '<base64>')`.
pub fn encode_uuid(uuid: &str) -> HarnessResult<String> {
    let parsed = Uuid::parse_str(uuid)
        .map_err(|e| HarnessError::BinDataFormat(format!("invalid uuid {uuid:?}: {e}")))?;
    Ok(format!("{PREFIX}{}{SUFFIX}", STANDARD.encode(parsed.as_bytes())))
}

/// Inverse of [`encode_uuid`]; always yields the lowercase hyphenated form.
pub fn decode_bindata(bindata: &str) -> HarnessResult<String> {
    let Some(encoded) = bindata
        .strip_prefix(PREFIX)
        .and_then(|rest| rest.strip_suffix(SUFFIX))
    else {
        return Err(HarnessError::BinDataFormat(format!(
            "expected {PREFIX}...{SUFFIX}, got {bindata:?}"
        )));
    };
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| HarnessError::BinDataFormat(format!("invalid base64 payload: {e}")))?;
    let uuid = Uuid::from_slice(&bytes).map_err(|_| {
        HarnessError::BinDataFormat(format!(
            "expected 16 bytes, payload decodes to {}",
            bytes.len()
        ))
    })?;
    Ok(uuid.hyphenated().to_string())
}
