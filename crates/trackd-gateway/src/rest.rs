// crates/trackd-gateway/src/rest.rs
//
// Shared state and error mapping for the HTTP/JSON face.
//
// REST handlers are thin transcoders: decode the HTTP request, forward
// it over the loopback client, and map the typed error body to the
// matching HTTP status. The credential header is forwarded verbatim so
// the RPC-side chain makes every authorization decision.

use axum::extract::Json;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use trackd_core::error::GatewayError;

use crate::client::RpcClient;
use crate::envelope::bearer_from_headers;

/// State shared by every REST route.
#[derive(Debug, Clone)]
pub struct RestState {
    pub rpc: RpcClient,
}

/// Wrapper making `GatewayError` an axum response:
/// status from the error kind, body in the canonical shape.
#[derive(Debug)]
pub struct RestError(pub GatewayError);

impl From<GatewayError> for RestError {
    fn from(err: GatewayError) -> Self {
        RestError(err)
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let body = self.0.to_body();
        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

/// Forward one decoded HTTP request as an RPC call, carrying the
/// caller's bearer credential along.
pub async fn forward(
    state: &RestState,
    headers: &HeaderMap,
    method: &str,
    params: Value,
) -> Result<Json<Value>, RestError> {
    let bearer = bearer_from_headers(headers);
    let result = state.rpc.call(method, params, bearer.as_deref()).await?;
    Ok(Json(result))
}
