// crates/trackd-auth/src/password.rs

use trackd_core::error::GatewayError;

/// Hash a raw password with bcrypt at the default cost.
pub fn hash_password(password: &str) -> Result<String, GatewayError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| GatewayError::internal(format!("failed to hash password: {}", e)))
}

/// Check a raw password against a stored bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_verify_against_garbage_hash_is_false() {
        assert!(!verify_password("hunter2", "not-a-bcrypt-hash"));
    }
}
