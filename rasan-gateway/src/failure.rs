//! Mapping of non-2xx responses onto [`GatewayError`].

use rasan_core::GatewayError;
use serde_json::Value;

/// Build a [`GatewayError`] from a non-2xx status and its raw body.
///
/// A JSON body carrying `detail` is unwrapped to that field first. A body
/// that is not JSON is treated as a plain string message.
pub fn normalize_failure(status: u16, body: &str) -> GatewayError {
    let trimmed = body.trim();
    let raw = if trimmed.is_empty() {
        Value::Null
    } else {
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(mut object)) if object.contains_key("detail") => {
                object.remove("detail").unwrap_or(Value::Null)
            }
            Ok(value) => value,
            Err(_) => Value::String(trimmed.to_string()),
        }
    };
    GatewayError::from_payload(status, raw)
}
