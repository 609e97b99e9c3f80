// crates/trackd-core/src/traits.rs

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// Trait for the external key-value session store.
///
/// One entry per live token, with a time-to-live equal to that token's
/// remaining validity window. The store is expected to be
/// independently concurrency-safe; no in-process locking coordinates
/// requests touching the same key. Implemented by trackd-store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl`. Overwrites.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Fetch the live value under `key`, or `None` if absent/expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
