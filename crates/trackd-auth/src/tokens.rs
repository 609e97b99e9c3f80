// crates/trackd-auth/src/tokens.rs
//
// Token pair issuing, verification, revocation, and rotation.
//
// Each token is an HS256 JWT carrying the identity reference, its
// expiry, and a unique `jti`, so structural validity is checked
// locally. Each token is also a key in the session store pointing at a
// record that names both halves of its pair, so revocation removes the
// pair as a unit no matter which side is presented. Verification is
// two-phase: (1) signature + expiry on the token itself, (2) record
// existence in the store. Both phases report Unauthenticated on
// failure, never a generic error.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use trackd_core::entity::Identity;
use trackd_core::error::GatewayError;
use trackd_core::traits::KvStore;

/// Access/refresh pair returned by login and rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Which half of a pair a token is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// JWT claims carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account uuid.
    pub sub: Uuid,
    /// Username, for logging and session rebuild.
    pub name: String,
    pub token_use: TokenUse,
    /// Unique token id; keeps re-issued pairs distinct even within one
    /// clock second.
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Store entry written under both token strings of a pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub identity: Identity,
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and checks token pairs against the session store.
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_minutes: u64,
    refresh_hours: u64,
    kv: Arc<dyn KvStore>,
}

impl TokenManager {
    pub fn new(
        secret: &str,
        access_minutes: u64,
        refresh_hours: u64,
        kv: Arc<dyn KvStore>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_minutes,
            refresh_hours,
            kv,
        }
    }

    /// Create a short-lived access token and a long-lived refresh
    /// token for `identity`, persisting one session record under each.
    pub async fn issue_pair(&self, identity: &Identity) -> Result<TokenPair, GatewayError> {
        let now = Utc::now();
        let access_ttl = Duration::from_secs(self.access_minutes * 60);
        let refresh_ttl = Duration::from_secs(self.refresh_hours * 3600);

        let iat = now.timestamp();
        let access_exp = iat + access_ttl.as_secs() as i64;
        let refresh_exp = iat + refresh_ttl.as_secs() as i64;

        let access_token = self.sign(identity, TokenUse::Access, iat, access_exp)?;
        let refresh_token = self.sign(identity, TokenUse::Refresh, iat, refresh_exp)?;

        let record = SessionRecord {
            identity: identity.clone(),
            access_token: access_token.clone(),
            refresh_token: refresh_token.clone(),
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| GatewayError::internal(format!("failed to encode session: {}", e)))?;

        self.kv.set(&access_token, &json, access_ttl).await?;
        self.kv.set(&refresh_token, &json, refresh_ttl).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Two-phase check: local structural/expiry validity, then session
    /// record existence (the revocation check). Returns the identity
    /// bound to the session.
    pub async fn verify(&self, token: &str) -> Result<Identity, GatewayError> {
        self.decode_claims(token)?;
        let record = self.load_record(token).await?;
        Ok(record.identity)
    }

    /// Delete the session records for `token` and its paired sibling,
    /// so the pair dies as a unit regardless of which side is
    /// presented.
    pub async fn revoke(&self, token: &str, is_access: bool) -> Result<(), GatewayError> {
        let record = self.load_record(token).await?;
        self.kv.delete(token).await?;
        let sibling = if is_access {
            &record.refresh_token
        } else {
            &record.access_token
        };
        self.kv.delete(sibling).await?;
        Ok(())
    }

    /// Verify the presented refresh token, revoke the old pair, issue
    /// a new one. The old pair is revoked before the new one is
    /// written: a crash between the two store operations leaves the
    /// presenter logged out, never holding two live pairs. A second
    /// rotation with the same token fails the record check.
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, GatewayError> {
        let claims = self.decode_claims(refresh_token)?;
        if claims.token_use != TokenUse::Refresh {
            return Err(GatewayError::unauthenticated("not a refresh token"));
        }
        let record = self.load_record(refresh_token).await?;
        self.revoke(refresh_token, false).await?;
        self.issue_pair(&record.identity).await
    }

    /// Structural check only: signature and expiry of the token
    /// itself. Does not consult the store.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, GatewayError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| GatewayError::unauthenticated("invalid token"))
    }

    fn sign(
        &self,
        identity: &Identity,
        token_use: TokenUse,
        iat: i64,
        exp: i64,
    ) -> Result<String, GatewayError> {
        let claims = Claims {
            sub: identity.uuid,
            name: identity.username.clone(),
            token_use,
            jti: Uuid::now_v7(),
            iat,
            exp,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| GatewayError::internal(format!("failed to sign token: {}", e)))
    }

    async fn load_record(&self, token: &str) -> Result<SessionRecord, GatewayError> {
        let raw = self.kv.get(token).await.map_err(|e| {
            tracing::warn!(error = %e, "session store read failed");
            GatewayError::unauthenticated("invalid token")
        })?;
        let raw = raw.ok_or_else(|| GatewayError::unauthenticated("session expired"))?;
        serde_json::from_str(&raw)
            .map_err(|_| GatewayError::unauthenticated("invalid session record"))
    }
}
