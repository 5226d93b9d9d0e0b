use std::sync::Arc;

use crate::allocator::BlockAllocator;
use crate::lock::LockCoordinator;
use crate::partition::PartitionMap;
use crate::store::{SequenceStore, StoreError};

/// Explicit wiring of a node's cluster collaborators.
///
/// Constructed once at startup and passed by reference into routers and
/// allocators, in place of ambient "current instance" lookups.
/// Construction is side-effect-free and deterministic; all startup work
/// happens in the awaited [`bootstrap`](Self::bootstrap) step.
pub struct ClusterContext<S, L>
where
    S: SequenceStore + ?Sized,
    L: LockCoordinator + ?Sized,
{
    store: Arc<S>,
    locks: Arc<L>,
    partitions: PartitionMap,
}

impl<S, L> Clone for ClusterContext<S, L>
where
    S: SequenceStore + ?Sized,
    L: LockCoordinator + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            locks: Arc::clone(&self.locks),
            partitions: self.partitions,
        }
    }
}

impl<S, L> ClusterContext<S, L>
where
    S: SequenceStore + ?Sized,
    L: LockCoordinator + ?Sized,
{
    pub fn new(store: Arc<S>, locks: Arc<L>, partitions: PartitionMap) -> Self {
        Self {
            store,
            locks,
            partitions,
        }
    }

    /// One-time startup step invoked by node bootstrap logic: creates the
    /// backing store structure, idempotently across racing members.
    pub async fn bootstrap(&self) -> Result<(), StoreError> {
        self.store.ensure_created().await
    }

    /// An allocator over this context's store and lock coordinator.
    pub fn allocator(&self) -> BlockAllocator<S, L> {
        BlockAllocator::new(Arc::clone(&self.store), Arc::clone(&self.locks))
    }

    pub fn partition_map(&self) -> PartitionMap {
        self.partitions
    }

    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    pub fn locks(&self) -> Arc<L> {
        Arc::clone(&self.locks)
    }
}
