// crates/trackd-store/src/memory.rs
//
// In-memory TTL key-value store implementing the `KvStore` trait.
//
// Expired entries are dropped lazily: a read that finds a stale entry
// removes it and reports the key as absent. `len` is test/diagnostic
// surface and also skips stale entries.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use trackd_core::error::StoreError;
use trackd_core::traits::KvStore;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local session store. Every operation takes the map lock for
/// the shortest possible window; there is no background sweeper.
#[derive(Default)]
pub struct MemoryKv {
    data: RwLock<HashMap<String, Entry>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let data = self.data.read().await;
        data.values().filter(|e| e.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        let mut data = self.data.write().await;
        data.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        {
            let data = self.data.read().await;
            match data.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {} // stale, fall through to remove
            }
        }
        let mut data = self.data.write().await;
        // Re-check under the write lock: the key may have been replaced
        // with a fresh entry between the two lock acquisitions.
        if let Some(entry) = data.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
            data.remove(key);
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        data.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let kv = MemoryKv::new();
        kv.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), Some("v".to_string()));

        kv.delete("k").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("absent").await.unwrap(), None);
        // Deleting an absent key is not an error.
        kv.delete("absent").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let kv = MemoryKv::new();
        kv.set("k", "v", Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(kv.get("k").await.unwrap(), Some("v".to_string()));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(kv.get("k").await.unwrap(), None);
        assert!(kv.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_resets_ttl() {
        let kv = MemoryKv::new();
        kv.set("k", "old", Duration::from_secs(5)).await.unwrap();
        tokio::time::advance(Duration::from_secs(4)).await;
        kv.set("k", "new", Duration::from_secs(5)).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(kv.get("k").await.unwrap(), Some("new".to_string()));
    }
}
