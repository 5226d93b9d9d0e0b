use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::sequence::SequenceValue;

/// Errors surfaced by a sequence store backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not serve the operation.
    #[error("sequence store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Durable mapping from sequence name to current counter value.
///
/// The store exclusively owns persisted counter state. In a cluster
/// deployment this is a partitioned, replicated region; callers only rely
/// on the contract below.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Creates the backing structure if it does not exist yet.
    ///
    /// Must be idempotent across racing first-callers: every caller
    /// observes the same structure, exactly one creation takes effect.
    async fn ensure_created(&self) -> Result<(), StoreError>;

    /// Current counter value, or `None` for a sequence that has never been
    /// allocated from (treated as 0 by the allocator).
    async fn get(&self, sequence: &str) -> Result<Option<SequenceValue>, StoreError>;

    /// Upserts the counter. Durability across process restart is the
    /// backend's contract.
    async fn put(&self, sequence: &str, value: SequenceValue) -> Result<(), StoreError>;
}

/// In-process [`SequenceStore`], the single-node stand-in for the external
/// durable store. Used by the server node and by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sequences: RwLock<HashMap<String, SequenceValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-sets a counter, e.g. to place a sequence near the wrap boundary.
    pub fn seed(&self, sequence: impl Into<String>, value: SequenceValue) {
        self.sequences.write().insert(sequence.into(), value);
    }
}

#[async_trait]
impl SequenceStore for MemoryStore {
    async fn ensure_created(&self) -> Result<(), StoreError> {
        // The map exists from construction; nothing to create.
        Ok(())
    }

    async fn get(&self, sequence: &str) -> Result<Option<SequenceValue>, StoreError> {
        Ok(self.sequences.read().get(sequence).copied())
    }

    async fn put(&self, sequence: &str, value: SequenceValue) -> Result<(), StoreError> {
        self.sequences.write().insert(sequence.to_string(), value);
        Ok(())
    }
}
