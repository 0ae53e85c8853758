//! Shared key-value store behind the claim ledger.
//!
//! The ledger needs four primitives from the backend, each a single round
//! trip: atomic set-if-absent with expiry, compare-and-delete, plain
//! get/set, and push-then-trim on a capped list.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StoreConfig;

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Sets `key` only if it does not exist. Returns whether it was set.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Deletes `key` only if it still holds `expected`.
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Prepends `value` and keeps the newest `cap` entries.
    async fn push_capped(&self, key: &str, value: &str, cap: usize) -> Result<(), StoreError>;
}

pub async fn connect(cfg: &StoreConfig) -> Result<Arc<dyn ClaimStore>, StoreError> {
    match cfg {
        StoreConfig::Memory => {
            tracing::warn!("using in-process claim store; locks and records are not shared");
            Ok(Arc::new(MemoryStore::default()))
        }
        StoreConfig::Redis { url } => Ok(Arc::new(RedisStore::connect(url).await?)),
    }
}
