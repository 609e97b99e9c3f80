// crates/trackd-gateway/src/middleware.rs
//
// Middleware chain builder.
//
// An ordered list of interceptors is composed into one unary handler
// and one stream handler, applying every stage in registration order,
// outermost-first. Three built-in stages bracket the registered ones:
//
//   1. panic recovery  — outermost; converts an unrecovered panic in
//                        the handler stack into an Internal error and
//                        never fails itself
//   2. request tagging — attaches a correlation id to the call context
//   3. logging         — method name, duration, outcome
//
// Registered interceptors follow (here: auth-extraction, then
// auth-verification). Ordering is load-bearing: recovery must wrap
// everything, extraction must precede verification, and tagging and
// logging must wrap the auth stages so auth failures are logged with a
// correlation id.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use futures::Stream;
use serde_json::Value;
use uuid::Uuid;

use trackd_core::error::GatewayError;

use crate::context::CallContext;
use crate::envelope::RpcCall;

pub type UnaryFuture = Pin<Box<dyn Future<Output = Result<Value, GatewayError>> + Send>>;

/// A fully-composed unary call path: context + call in, result out.
pub type UnaryHandler = Arc<dyn Fn(CallContext, RpcCall) -> UnaryFuture + Send + Sync>;

/// A unary wrapping stage. Receives the downstream handler and decides
/// whether/how to invoke it.
pub type UnaryInterceptor =
    Arc<dyn Fn(CallContext, RpcCall, UnaryHandler) -> UnaryFuture + Send + Sync>;

/// Message flow of a streaming call after successful setup.
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Value, GatewayError>> + Send>>;

pub type StreamFuture = Pin<Box<dyn Future<Output = Result<MessageStream, GatewayError>> + Send>>;

/// A fully-composed stream call path.
pub type StreamHandler = Arc<dyn Fn(CallContext, RpcCall) -> StreamFuture + Send + Sync>;

/// A stream wrapping stage.
pub type StreamInterceptor =
    Arc<dyn Fn(CallContext, RpcCall, StreamHandler) -> StreamFuture + Send + Sync>;

/// A pair of optional wrappers, registered as one unit. Either side may
/// be absent; the chain skips absent sides for that call shape.
#[derive(Clone, Default)]
pub struct Interceptor {
    pub unary: Option<UnaryInterceptor>,
    pub stream: Option<StreamInterceptor>,
}

/// Compose built-in stages plus `registered` around the two terminal
/// handlers. Earlier entries end up outermost.
pub fn build_chain(
    registered: &[Interceptor],
    unary_terminal: UnaryHandler,
    stream_terminal: StreamHandler,
) -> (UnaryHandler, StreamHandler) {
    let mut stages: Vec<Interceptor> = vec![recovery(), tagging(), logging()];
    stages.extend(registered.iter().cloned());

    (
        compose_unary(&stages, unary_terminal),
        compose_stream(&stages, stream_terminal),
    )
}

/// Wrap `terminal` with every unary stage in `stages`, first stage
/// outermost.
pub fn compose_unary(stages: &[Interceptor], terminal: UnaryHandler) -> UnaryHandler {
    let mut handler = terminal;
    for stage in stages.iter().rev() {
        if let Some(ic) = &stage.unary {
            let ic = ic.clone();
            let inner = handler.clone();
            handler = Arc::new(move |ctx, call| ic(ctx, call, inner.clone()));
        }
    }
    handler
}

/// Wrap `terminal` with every stream stage in `stages`, first stage
/// outermost.
pub fn compose_stream(stages: &[Interceptor], terminal: StreamHandler) -> StreamHandler {
    let mut handler = terminal;
    for stage in stages.iter().rev() {
        if let Some(ic) = &stage.stream {
            let ic = ic.clone();
            let inner = handler.clone();
            handler = Arc::new(move |ctx, call| ic(ctx, call, inner.clone()));
        }
    }
    handler
}

// ---------------------------------------------------------------------------
// Built-in stages
// ---------------------------------------------------------------------------

/// Panic recovery. Runs the downstream chain on its own task so a
/// panicking handler unwinds that task instead of the server; the
/// caller observes an Internal error.
pub fn recovery() -> Interceptor {
    let unary: UnaryInterceptor = Arc::new(|ctx, call, next| {
        Box::pin(async move {
            match tokio::spawn(next(ctx, call)).await {
                Ok(result) => result,
                Err(join_err) if join_err.is_panic() => {
                    tracing::error!("recovered panic in handler stack");
                    Err(GatewayError::internal("internal server error"))
                }
                Err(_) => Err(GatewayError::internal("request task cancelled")),
            }
        })
    });
    let stream: StreamInterceptor = Arc::new(|ctx, call, next| {
        Box::pin(async move {
            match tokio::spawn(next(ctx, call)).await {
                Ok(result) => result,
                Err(join_err) if join_err.is_panic() => {
                    tracing::error!("recovered panic in stream setup");
                    Err(GatewayError::internal("internal server error"))
                }
                Err(_) => Err(GatewayError::internal("request task cancelled")),
            }
        })
    });
    Interceptor {
        unary: Some(unary),
        stream: Some(stream),
    }
}

/// Request tagging. Attaches a v7 correlation id for downstream
/// logging.
pub fn tagging() -> Interceptor {
    let unary: UnaryInterceptor = Arc::new(|mut ctx, call, next| {
        ctx.correlation_id = Some(Uuid::now_v7());
        next(ctx, call)
    });
    let stream: StreamInterceptor = Arc::new(|mut ctx, call, next| {
        ctx.correlation_id = Some(Uuid::now_v7());
        next(ctx, call)
    });
    Interceptor {
        unary: Some(unary),
        stream: Some(stream),
    }
}

/// Logging. Records method, duration, and outcome, with the
/// correlation id set by the tagging stage.
pub fn logging() -> Interceptor {
    let unary: UnaryInterceptor = Arc::new(|ctx, call, next| {
        Box::pin(async move {
            let method = call.method.clone();
            let correlation_id = ctx.correlation_id;
            let started = Instant::now();
            let result = next(ctx, call).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(
                    method = %method,
                    correlation_id = ?correlation_id,
                    elapsed_ms,
                    "rpc call finished"
                ),
                Err(e) => tracing::warn!(
                    method = %method,
                    correlation_id = ?correlation_id,
                    elapsed_ms,
                    error = %e,
                    "rpc call failed"
                ),
            }
            result
        })
    });
    let stream: StreamInterceptor = Arc::new(|ctx, call, next| {
        Box::pin(async move {
            let method = call.method.clone();
            let correlation_id = ctx.correlation_id;
            let started = Instant::now();
            let result = next(ctx, call).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(
                    method = %method,
                    correlation_id = ?correlation_id,
                    elapsed_ms,
                    "stream opened"
                ),
                Err(e) => tracing::warn!(
                    method = %method,
                    correlation_id = ?correlation_id,
                    elapsed_ms,
                    error = %e,
                    "stream setup failed"
                ),
            }
            result
        })
    });
    Interceptor {
        unary: Some(unary),
        stream: Some(stream),
    }
}
