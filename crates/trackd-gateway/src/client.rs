// crates/trackd-gateway/src/client.rs
//
// Loopback RPC client.
//
// The HTTP/JSON face is a client of the RPC server, not a second
// implementation of business logic: every decoded HTTP request is
// re-issued through this client. Errors come back as the typed body
// inside the envelope; only failures below the envelope layer (refused
// connection, non-envelope response) fall back to the coarse
// status-class mapping.

use serde_json::Value;

use trackd_core::error::GatewayError;

use crate::envelope::{RpcRequest, RpcResponse};

#[derive(Debug, Clone)]
pub struct RpcClient {
    endpoint: String,
    http: reqwest::Client,
}

impl RpcClient {
    /// Client for the RPC listener at `endpoint`,
    /// e.g. "http://127.0.0.1:9090".
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Issue one RPC call, forwarding `bearer` as the Authorization
    /// credential when present.
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        bearer: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let request = RpcRequest {
            method: method.to_string(),
            params,
        };

        let mut builder = self.http.post(&self.endpoint).json(&request);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::internal(format!("rpc transport error: {}", e)))?;

        let status = response.status();
        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| coarse_fallback(status, &e))?;

        if envelope.success {
            Ok(envelope.result.unwrap_or(Value::Null))
        } else {
            match envelope.error {
                Some(body) => Err(GatewayError::from(body)),
                None => Err(GatewayError::internal("malformed rpc error response")),
            }
        }
    }
}

/// Coarse mapping for responses that carry no parseable envelope:
/// client-error transport statuses count as bad input, everything else
/// as internal.
fn coarse_fallback(status: reqwest::StatusCode, err: &reqwest::Error) -> GatewayError {
    if status.is_client_error() {
        GatewayError::validation(
            format!("invalid rpc response: {}", err),
            Default::default(),
        )
    } else {
        GatewayError::internal(format!("unreadable rpc response: {}", err))
    }
}
