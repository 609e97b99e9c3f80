// crates/trackd-gateway/src/context.rs
//
// Per-call context threaded through the middleware chain.
//
// Stages mutate the context before handing it to the next stage:
// tagging sets the correlation id, auth-extraction marks the call as
// requiring a credential, auth-verification attaches the resolved
// identity and the raw token for business-logic use (logout needs the
// raw token to revoke it).

use uuid::Uuid;

use trackd_core::entity::Identity;
use trackd_core::error::GatewayError;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Correlation id attached by the tagging stage.
    pub correlation_id: Option<Uuid>,
    /// Set by auth-extraction when the method is not registered open.
    pub auth_required: bool,
    /// Resolved identity, present after successful verification.
    pub identity: Option<Identity>,
    /// Raw bearer token, present after successful verification.
    pub token: Option<String>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The authenticated identity, or an error if the call reached a
    /// handler that expects one without passing verification.
    pub fn current_user(&self) -> Result<&Identity, GatewayError> {
        self.identity
            .as_ref()
            .ok_or_else(|| GatewayError::unauthenticated("no user in context"))
    }

    /// The raw verified token, or an error if absent.
    pub fn bearer_token(&self) -> Result<&str, GatewayError> {
        self.token
            .as_deref()
            .ok_or_else(|| GatewayError::unauthenticated("no token in context"))
    }
}
