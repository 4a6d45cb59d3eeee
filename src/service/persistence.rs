//! Durable snapshot storage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use redis::AsyncCommands;
use tokio::sync::Mutex;

use crate::ledger::{LedgerSnapshot, SnapshotError};

/// Default Redis key for the ledger snapshot.
pub const DEFAULT_SNAPSHOT_KEY: &str = "attendance:snapshot";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Redis operation failed: {0}")]
    RedisError(String),

    #[error("Stored snapshot is invalid: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Snapshot store unavailable")]
    Unavailable,
}

impl From<redis::RedisError> for PersistenceError {
    fn from(e: redis::RedisError) -> Self {
        PersistenceError::RedisError(e.to_string())
    }
}

/// Where committed ledger state is written.
///
/// `save` is called with the post-operation snapshot before the operation is
/// acknowledged; an error rolls the operation back.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self) -> Result<Option<LedgerSnapshot>, PersistenceError>;

    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), PersistenceError>;
}

/// In-process store, mostly for tests.
#[derive(Default)]
pub struct MemorySnapshotStore {
    bytes: Mutex<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent saves fail with [`PersistenceError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn stored_len(&self) -> Option<usize> {
        self.bytes.lock().await.as_ref().map(Vec::len)
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<LedgerSnapshot>, PersistenceError> {
        match self.bytes.lock().await.as_deref() {
            Some(bytes) => Ok(Some(LedgerSnapshot::from_bytes(bytes)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable);
        }
        *self.bytes.lock().await = Some(snapshot.to_bytes());
        Ok(())
    }
}

/// Snapshot stored as one SCALE-encoded value under a Redis key.
pub struct RedisSnapshotStore {
    redis_client: Arc<redis::Client>,
    key: String,
}

impl RedisSnapshotStore {
    pub fn new(redis_client: Arc<redis::Client>, key: impl Into<String>) -> Self {
        Self {
            redis_client,
            key: key.into(),
        }
    }
}

#[async_trait]
impl SnapshotStore for RedisSnapshotStore {
    async fn load(&self) -> Result<Option<LedgerSnapshot>, PersistenceError> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let bytes: Option<Vec<u8>> = conn.get(&self.key).await?;
        match bytes {
            Some(bytes) => {
                debug!("Loaded {} byte snapshot from {}", bytes.len(), self.key);
                Ok(Some(LedgerSnapshot::from_bytes(&bytes)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), PersistenceError> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let bytes = snapshot.to_bytes();
        let _: () = conn.set(&self.key, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Identity, LedgerLimits, LedgerState};

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().await.unwrap().is_none());

        let owner = Identity::new([1; 32]);
        let mut state = LedgerState::new(owner, LedgerLimits::default());
        state.create_course(&owner, "Intro", &[], 1).unwrap();

        store.save(&state.snapshot()).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, state.snapshot());
    }

    #[tokio::test]
    async fn test_memory_store_failure_switch() {
        let store = MemorySnapshotStore::new();
        store.set_fail_writes(true);
        let state = LedgerState::new(Identity::new([1; 32]), LedgerLimits::default());
        assert!(matches!(
            store.save(&state.snapshot()).await,
            Err(PersistenceError::Unavailable)
        ));
        assert!(store.stored_len().await.is_none());
    }
}
