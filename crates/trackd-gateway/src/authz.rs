// crates/trackd-gateway/src/authz.rs
//
// Authorization map: which fully-qualified method names may be called
// without a credential.
//
// Absence of an entry means "protected" — the map fails closed. Writes
// happen during startup registration, reads on every inbound call, but
// the structure is safe for concurrent access regardless since module
// registration order is not guaranteed.

use std::collections::HashSet;

use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct OpenMethods {
    inner: RwLock<HashSet<String>>,
}

impl OpenMethods {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method as not requiring a credential.
    pub fn mark_open(&self, method: &str) {
        self.inner.write().insert(method.to_string());
    }

    /// Whether the method may be called without a credential.
    pub fn is_open(&self, method: &str) -> bool {
        self.inner.read().contains(method)
    }
}
