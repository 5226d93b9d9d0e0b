use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::lock::{LockCoordinator, LockError, SequenceLock, lock_name};
use crate::sequence::{MAX_SEQUENCE_VALUE, SequenceValue};
use crate::store::{SequenceStore, StoreError};

/// Errors surfaced by a block allocation.
///
/// Either way the caller gets no partial credit: a failed allocation
/// returns no values, and retrying the whole call is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocateError {
    #[error("store failure during allocation: {0}")]
    Store(#[from] StoreError),

    #[error("lock failure during allocation: {0}")]
    Lock(#[from] LockError),
}

/// Outcome of a bounded-wait allocation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationStatus {
    /// The block was allocated.
    Ready { values: Vec<SequenceValue> },
    /// The per-sequence lock was still held when the wait elapsed. Nothing
    /// was read or written.
    Contended,
}

/// The critical-section logic of the allocation protocol.
///
/// One allocator per node; the instance holding a sequence's lock is the
/// only writer of that counter at any instant. Blocks issued for different
/// sequences proceed fully in parallel.
pub struct BlockAllocator<S, L>
where
    S: SequenceStore + ?Sized,
    L: LockCoordinator + ?Sized,
{
    store: Arc<S>,
    locks: Arc<L>,
}

impl<S, L> Clone for BlockAllocator<S, L>
where
    S: SequenceStore + ?Sized,
    L: LockCoordinator + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S, L> BlockAllocator<S, L>
where
    S: SequenceStore + ?Sized,
    L: LockCoordinator + ?Sized,
{
    pub fn new(store: Arc<S>, locks: Arc<L>) -> Self {
        Self { store, locks }
    }

    /// Allocates the next `block_size` values of `sequence` as one
    /// contiguous, wrap-aware run.
    ///
    /// A `block_size` of 0 yields an empty block without taking the lock or
    /// touching the store. Otherwise the whole read-modify-write executes
    /// inside the sequence's mutual-exclusion window; the lock is released
    /// on every exit path, including store failures.
    pub async fn allocate(
        &self,
        sequence: &str,
        block_size: usize,
    ) -> Result<Vec<SequenceValue>, AllocateError> {
        if block_size == 0 {
            return Ok(Vec::new());
        }

        let lock = self.lock_for(sequence).await?;
        let _guard = lock.acquire().await?;
        self.emit_block(sequence, block_size).await
    }

    /// Bounded-wait variant of [`allocate`](Self::allocate).
    ///
    /// Returns [`AllocationStatus::Contended`] when the lock cannot be
    /// taken within `wait`, so deployments can choose backpressure over the
    /// default indefinite stall.
    pub async fn allocate_within(
        &self,
        sequence: &str,
        block_size: usize,
        wait: Duration,
    ) -> Result<AllocationStatus, AllocateError> {
        if block_size == 0 {
            return Ok(AllocationStatus::Ready { values: Vec::new() });
        }

        let lock = self.lock_for(sequence).await?;
        let Some(_guard) = lock.acquire_within(wait).await? else {
            return Ok(AllocationStatus::Contended);
        };
        let values = self.emit_block(sequence, block_size).await?;
        Ok(AllocationStatus::Ready { values })
    }

    /// Resolves the sequence's lock handle, proactively requesting grant
    /// authority so ownership can migrate off a failed member.
    async fn lock_for(&self, sequence: &str) -> Result<Arc<dyn SequenceLock>, LockError> {
        let lock = self.locks.get_or_create(&lock_name(sequence)).await?;
        if !lock.is_grantor() {
            lock.become_grantor().await?;
        }
        Ok(lock)
    }

    /// Counter read-modify-write. Callers must hold the sequence lock.
    async fn emit_block(
        &self,
        sequence: &str,
        block_size: usize,
    ) -> Result<Vec<SequenceValue>, AllocateError> {
        let mut value = self.store.get(sequence).await?.unwrap_or(0);

        let mut values = Vec::with_capacity(block_size);
        for _ in 0..block_size {
            values.push(value);
            value += 1;
            // `>=` keeps MAX_SEQUENCE_VALUE itself out of the domain.
            if value >= MAX_SEQUENCE_VALUE {
                value = 0;
            }
        }

        self.store.put(sequence, value).await?;
        trace!(sequence, block_size, next = value, "allocated block");
        Ok(values)
    }
}
