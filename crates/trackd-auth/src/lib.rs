// crates/trackd-auth/src/lib.rs
//
// trackd-auth: Credential layer for trackd.
//
// Issues, verifies, rotates, and revokes paired access/refresh tokens
// against the session key-value store, and provides the two request
// interceptors (extraction, verification) that the gateway chain runs
// on every inbound call. Tokens are hybrid: self-describing JWTs for
// cheap local expiry/signature checks, plus a session record in the
// store so revocation is possible before natural expiry.

pub mod interceptors;
pub mod password;
pub mod tokens;

// Re-export key types for ergonomic access from downstream crates.
pub use password::{hash_password, verify_password};
pub use tokens::{Claims, SessionRecord, TokenManager, TokenPair, TokenUse};
