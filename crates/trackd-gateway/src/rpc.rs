// crates/trackd-gateway/src/rpc.rs
//
// The RPC face: a method table mapping fully-qualified names to typed
// handlers, and the tonic-hosted service that decodes envelopes and
// runs the composed middleware chain.
//
// The service is wired as a raw `tower_service::Service` under tonic's
// server infrastructure, with JSON envelopes instead of proto codegen.
// Request/response types stay plain serde structs and the dispatch
// helper bridges them to the JSON envelope generically.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tonic::Status;

use trackd_core::error::GatewayError;

use crate::context::CallContext;
use crate::envelope::{bearer_from_headers, RpcCall, RpcRequest, RpcResponse};
use crate::middleware::{UnaryFuture, UnaryHandler};

// ---------------------------------------------------------------------------
// MethodTable
// ---------------------------------------------------------------------------

/// Registry of unary business handlers, keyed by fully-qualified
/// method name. Controllers fill it during startup; it becomes the
/// terminal stage of the middleware chain.
#[derive(Default)]
pub struct MethodTable {
    unary: HashMap<String, UnaryHandler>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed unary handler. Params are deserialized into
    /// `Req`; a decode failure is a validation error, a response
    /// serialization failure is internal.
    pub fn register_unary<Req, Resp, F, Fut>(&mut self, method: &str, handler: F)
    where
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + 'static,
        F: Fn(CallContext, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, GatewayError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let wrapped: UnaryHandler = Arc::new(move |ctx, call| {
            let handler = handler.clone();
            Box::pin(async move {
                let request: Req = serde_json::from_value(call.params).map_err(|e| {
                    GatewayError::validation(
                        format!("invalid request payload: {}", e),
                        HashMap::new(),
                    )
                })?;
                let response = handler(ctx, request).await?;
                serde_json::to_value(response).map_err(|e| {
                    GatewayError::internal(format!("failed to serialize response: {}", e))
                })
            })
        });
        self.unary.insert(method.to_string(), wrapped);
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.unary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unary.is_empty()
    }

    /// Collapse the table into the terminal handler of the chain:
    /// look up the method, invoke it, or report an unknown method.
    pub fn into_terminal(self) -> UnaryHandler {
        let table = Arc::new(self.unary);
        Arc::new(move |ctx, call| {
            let table = table.clone();
            Box::pin(async move {
                let handler = table.get(&call.method).cloned();
                match handler {
                    Some(h) => h(ctx, call).await,
                    None => Err(GatewayError::not_found(format!(
                        "unknown method {}",
                        call.method
                    ))),
                }
            }) as UnaryFuture
        })
    }
}

// ---------------------------------------------------------------------------
// Tonic service wiring
// ---------------------------------------------------------------------------

/// The tonic service wrapper. Accepts an envelope request, threads it
/// through the composed chain, and answers with an envelope response.
/// Transport status is always 200; failures travel as typed error
/// bodies inside the envelope.
#[derive(Clone)]
pub struct RpcService {
    handler: UnaryHandler,
}

impl std::fmt::Debug for RpcService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcService").finish()
    }
}

impl RpcService {
    pub fn new(handler: UnaryHandler) -> Self {
        Self { handler }
    }
}

impl tonic::server::NamedService for RpcService {
    const NAME: &'static str = "trackd.gateway.Rpc";
}

impl<B> tower_service::Service<http::Request<B>> for RpcService
where
    B: HttpBody + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    B::Data: Send,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let handler = self.handler.clone();

        Box::pin(async move {
            let bearer = bearer_from_headers(req.headers());

            let body_bytes = match collect_body(req.into_body()).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!("failed to read rpc request body: {}", e);
                    let err = GatewayError::internal("failed to read request body");
                    return Ok(build_response(&RpcResponse::err(&err)));
                }
            };

            let envelope: RpcRequest = match serde_json::from_slice(&body_bytes) {
                Ok(r) => r,
                Err(e) => {
                    let err = GatewayError::validation(
                        format!("invalid rpc envelope: {}", e),
                        HashMap::new(),
                    );
                    return Ok(build_response(&RpcResponse::err(&err)));
                }
            };

            let call = RpcCall {
                method: envelope.method,
                params: envelope.params,
                bearer,
            };

            let response = match handler(CallContext::new(), call).await {
                Ok(value) => RpcResponse::ok(value),
                Err(err) => RpcResponse::err(&err),
            };
            Ok(build_response(&response))
        })
    }
}

/// Collect the body of an HTTP request into bytes.
async fn collect_body<B>(body: B) -> Result<Vec<u8>, String>
where
    B: HttpBody + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    B::Data: Send,
{
    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    loop {
        match std::future::poll_fn(|cx| HttpBody::poll_frame(body.as_mut(), cx)).await {
            Some(Ok(frame)) => {
                if let Ok(data) = frame.into_data() {
                    use bytes::Buf;
                    collected.extend_from_slice(data.chunk());
                }
            }
            Some(Err(e)) => return Err(e.into().to_string()),
            None => break,
        }
    }

    Ok(collected)
}

/// Build an HTTP response carrying the JSON envelope.
fn build_response(response: &RpcResponse) -> http::Response<tonic::body::BoxBody> {
    let json = serde_json::to_vec(response).unwrap_or_default();
    let body = tonic::body::BoxBody::new(
        http_body_util::Full::new(bytes::Bytes::from(json))
            .map_err(|e| Status::internal(format!("body error: {}", e))),
    );

    http::Response::builder()
        .status(200)
        .header("content-type", "application/json")
        .body(body)
        .unwrap()
}
