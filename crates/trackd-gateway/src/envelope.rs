// crates/trackd-gateway/src/envelope.rs
//
// JSON-RPC envelopes for the binary face.
//
// The client sends a fully-qualified method name and a JSON params
// payload; the server answers with a success/result/error envelope.
// The error field carries the structured `ErrorBody` as a typed value,
// so nothing along the loopback bridge re-parses strings to recover
// the error shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use trackd_core::error::{ErrorBody, GatewayError};

/// A request envelope on the RPC face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Fully-qualified method, e.g. "/users.UserService/Login".
    pub method: String,
    /// JSON-encoded parameters for the method.
    #[serde(default)]
    pub params: Value,
}

/// A response envelope on the RPC face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// The result data (if success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Structured error (if not success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl RpcResponse {
    pub fn ok(result: Value) -> Self {
        RpcResponse {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(error: &GatewayError) -> Self {
        RpcResponse {
            success: false,
            result: None,
            error: Some(error.to_body()),
        }
    }
}

/// One inbound call as seen by the middleware chain: the decoded
/// envelope plus the transport-level credential.
#[derive(Debug, Clone)]
pub struct RpcCall {
    pub method: String,
    pub params: Value,
    /// Bearer token from the Authorization header, if any.
    pub bearer: Option<String>,
}

/// Extract a bearer credential from request headers.
///
/// Accepts `Authorization: Bearer <token>` with a case-insensitive
/// scheme; anything else is treated as no credential.
pub fn bearer_from_headers(headers: &http::HeaderMap) -> Option<String> {
    let raw = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim().to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_error_envelope_carries_typed_body() {
        let mut fields = HashMap::new();
        fields.insert("title".to_string(), "required".to_string());
        let err = GatewayError::validation("validation failed", fields);

        let resp = RpcResponse::err(&err);
        let json = serde_json::to_string(&resp).unwrap();
        let back: RpcResponse = serde_json::from_str(&json).unwrap();

        assert!(!back.success);
        let body = back.error.unwrap();
        assert_eq!(body.status, 400);
        assert_eq!(body.fields.unwrap()["title"], "required");
    }

    #[test]
    fn test_ok_envelope_omits_error() {
        let resp = RpcResponse::ok(serde_json::json!({"x": 1}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_request_params_default_to_null() {
        let req: RpcRequest = serde_json::from_str(r#"{"method": "/svc.Foo/Bar"}"#).unwrap();
        assert_eq!(req.method, "/svc.Foo/Bar");
        assert!(req.params.is_null());
    }

    #[test]
    fn test_bearer_extraction() {
        let mut headers = http::HeaderMap::new();
        headers.insert(
            http::header::AUTHORIZATION,
            "Bearer abc.def.ghi".parse().unwrap(),
        );
        assert_eq!(bearer_from_headers(&headers), Some("abc.def.ghi".to_string()));

        headers.insert(http::header::AUTHORIZATION, "bearer xyz".parse().unwrap());
        assert_eq!(bearer_from_headers(&headers), Some("xyz".to_string()));

        headers.insert(http::header::AUTHORIZATION, "Basic dXNlcg==".parse().unwrap());
        assert_eq!(bearer_from_headers(&headers), None);

        headers.remove(http::header::AUTHORIZATION);
        assert_eq!(bearer_from_headers(&headers), None);
    }
}
