//! Claim ledger: per-(identity, track) locks, last-claim records and the
//! capped audit log, all kept in the shared store.

use std::sync::Arc;
use std::time::Duration;

use rewardgate_core::address::ClaimIdentity;
use rewardgate_core::error::{ClaimError, ClaimResult, Contention};
use serde::{Deserialize, Serialize};

use crate::store::{ClaimStore, StoreError};

pub const AUDIT_KEY: &str = "rewardgate:audit";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: u64,
    pub track: String,
    pub account: Option<u64>,
    pub recipient: String,
    pub amount: String,
}

#[derive(Clone)]
pub struct ClaimLedger {
    store: Arc<dyn ClaimStore>,
    lock_ttl: Duration,
    audit_cap: usize,
}

fn store_failure(err: StoreError) -> ClaimError {
    ClaimError::upstream(err.to_string())
}

pub fn lock_key(track: &str, identity: &ClaimIdentity) -> String {
    format!("rewardgate:lock:{track}:{}", identity.storage_key())
}

pub fn record_key(track: &str, identity: &ClaimIdentity) -> String {
    format!("rewardgate:claim:{track}:{}", identity.storage_key())
}

impl ClaimLedger {
    pub fn new(store: Arc<dyn ClaimStore>, lock_ttl: Duration, audit_cap: usize) -> Self {
        Self {
            store,
            lock_ttl,
            audit_cap,
        }
    }

    pub fn lock_ttl(&self) -> Duration {
        self.lock_ttl
    }

    /// One `SET NX PX` round trip. A held lock is contention, not an error.
    pub async fn acquire(&self, track: &str, identity: &ClaimIdentity) -> ClaimResult<ClaimLock> {
        let key = lock_key(track, identity);
        let token = format!("{:032x}", rand::random::<u128>());
        let acquired = self
            .store
            .set_if_absent(&key, &token, self.lock_ttl)
            .await
            .map_err(store_failure)?;
        if !acquired {
            return Err(ClaimError::Contention {
                kind: Contention::LockHeld,
                retry_after_ms: self.lock_ttl.as_millis() as u64,
            });
        }
        tracing::debug!(%key, "claim lock acquired");
        Ok(ClaimLock {
            store: Arc::clone(&self.store),
            key,
            token,
            held: true,
        })
    }

    pub async fn last_claim(&self, track: &str, identity: &ClaimIdentity) -> ClaimResult<Option<u64>> {
        let raw = self
            .store
            .get(&record_key(track, identity))
            .await
            .map_err(store_failure)?;
        raw.map(|v| {
            v.parse::<u64>()
                .map_err(|_| ClaimError::upstream("claim record is not a timestamp"))
        })
        .transpose()
    }

    pub async fn record_claim(&self, track: &str, identity: &ClaimIdentity, at_ms: u64) -> ClaimResult<()> {
        self.store
            .set(&record_key(track, identity), &at_ms.to_string())
            .await
            .map_err(store_failure)
    }

    pub async fn append_audit(&self, entry: &AuditEntry) -> ClaimResult<()> {
        let encoded = serde_json::to_string(entry)
            .map_err(|e| ClaimError::upstream(format!("audit encode: {e}")))?;
        self.store
            .push_capped(AUDIT_KEY, &encoded, self.audit_cap)
            .await
            .map_err(store_failure)
    }
}

/// Held claim lock. Call [`ClaimLock::release`] on every path; if the guard
/// is dropped instead (panic, cancelled request) the release is spawned onto
/// the runtime, and the TTL covers anything after that.
pub struct ClaimLock {
    store: Arc<dyn ClaimStore>,
    key: String,
    token: String,
    held: bool,
}

impl ClaimLock {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn release(mut self) {
        self.held = false;
        match self.store.delete_if_equals(&self.key, &self.token).await {
            Ok(true) => tracing::debug!(key = %self.key, "claim lock released"),
            Ok(false) => tracing::warn!(key = %self.key, "claim lock expired before release"),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "claim lock release failed; ttl will expire it")
            }
        }
    }
}

impl Drop for ClaimLock {
    fn drop(&mut self) {
        if !self.held {
            return;
        }
        let store = Arc::clone(&self.store);
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = store.delete_if_equals(&key, &token).await {
                        tracing::warn!(%key, error = %err, "deferred claim lock release failed");
                    }
                });
            }
            Err(_) => tracing::warn!(%key, "no runtime to release claim lock; relying on ttl"),
        }
    }
}
