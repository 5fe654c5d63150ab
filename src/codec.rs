// src/codec.rs
//! Flutter JSON method codec
//!
//! Method calls travel as `{"method": ..., "args": ...}`. Replies are a
//! one-element array for success, `[code, message, details]` for errors and
//! an empty reply when the method is not implemented.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{BridgeError, BridgeResult};

/// A method call received on (or sent over) a channel
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Call with no arguments
    pub fn bare(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }

    /// Named argument, `None` when arguments are not a map or the key is absent
    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.as_object()?.get(key)
    }

    /// Named string argument; null and non-string values read as absent
    pub fn string_argument(&self, key: &str) -> Option<&str> {
        self.argument(key)?.as_str()
    }
}

/// Result of handling a method call
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Error {
        code: String,
        message: Option<String>,
        details: Value,
    },
    NotImplemented,
}

impl MethodResponse {
    pub fn success<T: Serialize>(value: T) -> BridgeResult<Self> {
        Ok(MethodResponse::Success(serde_json::to_value(value)?))
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        MethodResponse::Error {
            code: code.into(),
            message: Some(message.into()),
            details: Value::Null,
        }
    }

    pub fn from_error(err: &BridgeError) -> Self {
        Self::error(err.code(), err.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodResponse::Success(_))
    }
}

pub fn encode_method_call(call: &MethodCall) -> Vec<u8> {
    json!({ "method": call.method, "args": call.arguments })
        .to_string()
        .into_bytes()
}

pub fn decode_method_call(bytes: &[u8]) -> BridgeResult<MethodCall> {
    let value: Value = serde_json::from_slice(bytes)?;
    let map = value
        .as_object()
        .ok_or_else(|| BridgeError::Codec(format!("invalid method call: {}", value)))?;
    let method = map
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| BridgeError::Codec(format!("invalid method call: {}", value)))?;
    let arguments = map.get("args").cloned().unwrap_or(Value::Null);
    Ok(MethodCall::new(method, arguments))
}

pub fn encode_success(result: &Value) -> Vec<u8> {
    Value::Array(vec![result.clone()]).to_string().into_bytes()
}

pub fn encode_error(code: &str, message: Option<&str>, details: &Value) -> Vec<u8> {
    json!([code, message, details]).to_string().into_bytes()
}

/// Reply bytes for a response; `None` is the empty not-implemented reply
pub fn encode_response(response: &MethodResponse) -> Option<Vec<u8>> {
    match response {
        MethodResponse::Success(value) => Some(encode_success(value)),
        MethodResponse::Error {
            code,
            message,
            details,
        } => Some(encode_error(code, message.as_deref(), details)),
        MethodResponse::NotImplemented => None,
    }
}

/// Decode a reply produced by [`encode_response`]
pub fn decode_envelope(reply: Option<&[u8]>) -> BridgeResult<MethodResponse> {
    let bytes = match reply {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Ok(MethodResponse::NotImplemented),
    };
    let value: Value = serde_json::from_slice(bytes)?;
    let items = value
        .as_array()
        .ok_or_else(|| BridgeError::Codec(format!("invalid envelope: {}", value)))?;

    match items.as_slice() {
        [result] => Ok(MethodResponse::Success(result.clone())),
        [Value::String(code), message, details, ..] if message.is_null() || message.is_string() => {
            Ok(MethodResponse::Error {
                code: code.clone(),
                message: message.as_str().map(str::to_string),
                details: details.clone(),
            })
        }
        _ => Err(BridgeError::Codec(format!("invalid envelope: {}", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_call_with_and_without_args() {
        let call =
            decode_method_call(br#"{"method":"launchApp","args":{"packageName":"a.b"}}"#).unwrap();
        assert_eq!(call.method, "launchApp");
        assert_eq!(call.string_argument("packageName"), Some("a.b"));

        let call = decode_method_call(br#"{"method":"getInstalledApps"}"#).unwrap();
        assert_eq!(call.arguments, Value::Null);
        assert_eq!(call.string_argument("packageName"), None);
    }

    #[test]
    fn rejects_call_without_method() {
        assert!(matches!(
            decode_method_call(br#"{"args":1}"#),
            Err(BridgeError::Codec(_))
        ));
        assert!(decode_method_call(b"not json").is_err());
    }

    #[test]
    fn non_string_argument_reads_as_absent() {
        let call = MethodCall::new("launchApp", json!({"packageName": 42}));
        assert_eq!(call.string_argument("packageName"), None);
        let call = MethodCall::new("launchApp", json!({"packageName": null}));
        assert_eq!(call.string_argument("packageName"), None);
    }

    #[test]
    fn envelopes_match_flutter_layout() {
        let ok = encode_response(&MethodResponse::Success(json!(true))).unwrap();
        assert_eq!(String::from_utf8(ok).unwrap(), "[true]");

        let err = encode_response(&MethodResponse::error(
            "INVALID_ARGUMENT",
            "Package name is required",
        ))
        .unwrap();
        assert_eq!(
            String::from_utf8(err.clone()).unwrap(),
            r#"["INVALID_ARGUMENT","Package name is required",null]"#
        );
        assert_eq!(
            decode_envelope(Some(&err)).unwrap(),
            MethodResponse::error("INVALID_ARGUMENT", "Package name is required")
        );

        assert_eq!(encode_response(&MethodResponse::NotImplemented), None);
        assert_eq!(decode_envelope(None).unwrap(), MethodResponse::NotImplemented);
    }

    #[test]
    fn rejects_malformed_envelope() {
        assert!(decode_envelope(Some(br#"{"x":1}"#)).is_err());
        assert!(decode_envelope(Some(b"[1,2]")).is_err());
    }
}
