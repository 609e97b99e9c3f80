// crates/trackd-auth/src/interceptors.rs
//
// The two auth stages of the gateway chain.
//
// Extraction looks the method up in the authorization map and marks
// the context when a credential is required; it never rejects.
// Verification acts only on marked calls: it pulls the bearer token
// from the call, runs the two-phase check, and attaches the resolved
// identity plus the raw token to the context (logout revokes by the
// raw token). Extraction must be registered before verification.

use std::sync::Arc;

use trackd_core::error::GatewayError;

use trackd_gateway::authz::OpenMethods;
use trackd_gateway::middleware::{
    Interceptor, StreamInterceptor, UnaryInterceptor,
};
use trackd_gateway::registry::Registry;

use crate::tokens::TokenManager;

/// Marks protected calls based on the authorization map.
pub fn extraction(open: Arc<OpenMethods>) -> Interceptor {
    let unary_open = open.clone();
    let unary: UnaryInterceptor = Arc::new(move |mut ctx, call, next| {
        if !unary_open.is_open(&call.method) {
            ctx.auth_required = true;
        }
        next(ctx, call)
    });

    let stream: StreamInterceptor = Arc::new(move |mut ctx, call, next| {
        if !open.is_open(&call.method) {
            ctx.auth_required = true;
        }
        next(ctx, call)
    });

    Interceptor {
        unary: Some(unary),
        stream: Some(stream),
    }
}

/// Verifies the bearer credential on calls the extraction stage marked.
pub fn verification(tokens: Arc<TokenManager>) -> Interceptor {
    let unary_tokens = tokens.clone();
    let unary: UnaryInterceptor = Arc::new(move |mut ctx, call, next| {
        let tokens = unary_tokens.clone();
        Box::pin(async move {
            if ctx.auth_required {
                let token = call.bearer.clone().ok_or_else(|| {
                    GatewayError::unauthenticated("missing bearer credential")
                })?;
                let identity = tokens.verify(&token).await?;
                ctx.identity = Some(identity);
                ctx.token = Some(token);
            }
            next(ctx, call).await
        })
    });

    let stream: StreamInterceptor = Arc::new(move |mut ctx, call, next| {
        let tokens = tokens.clone();
        Box::pin(async move {
            if ctx.auth_required {
                let token = call.bearer.clone().ok_or_else(|| {
                    GatewayError::unauthenticated("missing bearer credential")
                })?;
                let identity = tokens.verify(&token).await?;
                ctx.identity = Some(identity);
                ctx.token = Some(token);
            }
            next(ctx, call).await
        })
    });

    Interceptor {
        unary: Some(unary),
        stream: Some(stream),
    }
}

/// Register both auth stages on the registry, in the order the chain
/// needs them.
pub fn register(registry: &Registry, tokens: Arc<TokenManager>) {
    registry.register_interceptor(extraction(registry.open_methods()));
    registry.register_interceptor(verification(tokens));
}
