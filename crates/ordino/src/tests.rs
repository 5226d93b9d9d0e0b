use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    AllocateError, AllocationStatus, BlockAllocator, ClusterContext, DEFAULT_PARTITIONS,
    LocalLockCoordinator, LockCoordinator, MAX_SEQUENCE_VALUE, MemoryStore, PartitionMap,
    SequenceStore, SequenceValue, StoreError, lock_name,
};

/// Store wrapper that tracks overlapping critical sections.
///
/// The window opens at `get` and closes at `put`; an artificial delay in
/// between widens any race so overlap would actually be observed.
struct OverlapProbe {
    inner: MemoryStore,
    active: AtomicUsize,
    max_active: AtomicUsize,
    delay: Duration,
}

impl OverlapProbe {
    fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            delay,
        }
    }

    fn max_overlap(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SequenceStore for OverlapProbe {
    async fn ensure_created(&self) -> Result<(), StoreError> {
        self.inner.ensure_created().await
    }

    async fn get(&self, sequence: &str) -> Result<Option<SequenceValue>, StoreError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.get(sequence).await
    }

    async fn put(&self, sequence: &str, value: SequenceValue) -> Result<(), StoreError> {
        let result = self.inner.put(sequence, value).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Store that counts operations and can fail the first `fail_puts` writes.
struct FlakyStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    puts: AtomicUsize,
    fail_puts: AtomicUsize,
}

impl FlakyStore {
    fn new(fail_puts: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            fail_puts: AtomicUsize::new(fail_puts),
        }
    }
}

#[async_trait]
impl SequenceStore for FlakyStore {
    async fn ensure_created(&self) -> Result<(), StoreError> {
        self.inner.ensure_created().await
    }

    async fn get(&self, sequence: &str) -> Result<Option<SequenceValue>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(sequence).await
    }

    async fn put(&self, sequence: &str, value: SequenceValue) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_puts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Unavailable {
                reason: "injected write failure".to_string(),
            });
        }
        self.inner.put(sequence, value).await
    }
}

fn allocator_over<S: SequenceStore>(store: Arc<S>) -> BlockAllocator<S, LocalLockCoordinator> {
    BlockAllocator::new(store, Arc::new(LocalLockCoordinator::new()))
}

#[tokio::test]
async fn empty_block_takes_no_lock_and_touches_nothing() {
    let store = Arc::new(FlakyStore::new(0));
    let allocator = allocator_over(Arc::clone(&store));

    let block = allocator.allocate("orders", 0).await.unwrap();

    assert!(block.is_empty());
    assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    assert_eq!(store.puts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn block_is_contiguous_and_advances_the_counter() {
    let store = Arc::new(MemoryStore::new());
    let allocator = allocator_over(Arc::clone(&store));

    let block = allocator.allocate("orders", 5).await.unwrap();

    assert_eq!(block, vec![0, 1, 2, 3, 4]);
    assert_eq!(store.get("orders").await.unwrap(), Some(5));

    let block = allocator.allocate("orders", 3).await.unwrap();
    assert_eq!(block, vec![5, 6, 7]);
}

#[tokio::test]
async fn block_wraps_without_emitting_the_max_value() {
    let store = Arc::new(MemoryStore::new());
    store.seed("orders", MAX_SEQUENCE_VALUE - 3);
    let allocator = allocator_over(Arc::clone(&store));

    let block = allocator.allocate("orders", 10).await.unwrap();

    assert_eq!(
        block,
        vec![
            MAX_SEQUENCE_VALUE - 3,
            MAX_SEQUENCE_VALUE - 2,
            MAX_SEQUENCE_VALUE - 1,
            0,
            1,
            2,
            3,
            4,
            5,
            6,
        ]
    );
    assert_eq!(store.get("orders").await.unwrap(), Some(7));
}

#[tokio::test]
async fn store_failure_yields_no_values_and_releases_the_lock() {
    let store = Arc::new(FlakyStore::new(1));
    let allocator = allocator_over(Arc::clone(&store));

    let err = allocator.allocate("orders", 4).await.unwrap_err();
    assert!(matches!(err, AllocateError::Store(_)));

    // The counter never advanced and the lock is free again, so the retry
    // re-emits the same run.
    let block = allocator.allocate("orders", 4).await.unwrap();
    assert_eq!(block, vec![0, 1, 2, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_allocations_never_overlap_in_the_critical_section() {
    const WORKERS: usize = 8;
    const ITERATIONS: usize = 10;
    const BLOCK: usize = 7;

    let store = Arc::new(OverlapProbe::new(Duration::from_millis(2)));
    let allocator = Arc::new(allocator_over(Arc::clone(&store)));

    let mut handles = Vec::with_capacity(WORKERS);
    for _ in 0..WORKERS {
        let allocator = Arc::clone(&allocator);
        handles.push(tokio::spawn(async move {
            let mut collected = Vec::with_capacity(ITERATIONS * BLOCK);
            for _ in 0..ITERATIONS {
                collected.extend(allocator.allocate("orders", BLOCK).await.unwrap());
            }
            collected
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }

    assert_eq!(store.max_overlap(), 1, "critical sections overlapped");
    assert_eq!(all.len(), WORKERS * ITERATIONS * BLOCK);

    let unique: HashSet<_> = all.iter().copied().collect();
    assert_eq!(unique.len(), all.len(), "duplicate values emitted");

    all.sort_unstable();
    let expected: Vec<SequenceValue> = (0..(WORKERS * ITERATIONS * BLOCK) as u64).collect();
    assert_eq!(all, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sequences_do_not_interfere() {
    const WORKERS: usize = 4;
    const ITERATIONS: usize = 5;
    const BLOCK: usize = 10;

    let store = Arc::new(MemoryStore::new());
    let allocator = Arc::new(allocator_over(Arc::clone(&store)));

    let mut handles = Vec::new();
    for worker in 0..WORKERS * 2 {
        let allocator = Arc::clone(&allocator);
        // Disjoint worker pools: evens draw from one sequence, odds from
        // the other.
        let sequence = if worker % 2 == 0 { "left" } else { "right" };
        handles.push(tokio::spawn(async move {
            let mut collected = Vec::new();
            for _ in 0..ITERATIONS {
                collected.extend(allocator.allocate(sequence, BLOCK).await.unwrap());
            }
            (sequence, collected)
        }));
    }

    let mut left = Vec::new();
    let mut right = Vec::new();
    for handle in handles {
        let (sequence, collected) = handle.await.unwrap();
        match sequence {
            "left" => left.extend(collected),
            _ => right.extend(collected),
        }
    }

    let expected: Vec<SequenceValue> = (0..(WORKERS * ITERATIONS * BLOCK) as u64).collect();
    left.sort_unstable();
    right.sort_unstable();
    // The value sets coincide numerically because each sequence has its own
    // counter; each set must independently be the full contiguous range.
    assert_eq!(left, expected);
    assert_eq!(right, expected);
}

#[tokio::test]
async fn bounded_wait_reports_contention_without_side_effects() {
    let store = Arc::new(FlakyStore::new(0));
    let locks = Arc::new(LocalLockCoordinator::new());
    let allocator = BlockAllocator::new(Arc::clone(&store), Arc::clone(&locks));

    let lock = locks.get_or_create(&lock_name("orders")).await.unwrap();
    let guard = lock.acquire().await.unwrap();

    let status = allocator
        .allocate_within("orders", 5, Duration::from_millis(20))
        .await
        .unwrap();
    assert_eq!(status, AllocationStatus::Contended);
    assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    assert_eq!(store.puts.load(Ordering::SeqCst), 0);

    drop(guard);

    let status = allocator
        .allocate_within("orders", 5, Duration::from_millis(20))
        .await
        .unwrap();
    assert_eq!(
        status,
        AllocationStatus::Ready {
            values: vec![0, 1, 2, 3, 4]
        }
    );
}

#[tokio::test]
async fn lock_handles_are_created_once_and_shared() {
    let locks = LocalLockCoordinator::new();

    let first = locks.get_or_create("sequence_orders").await.unwrap();
    let second = locks.get_or_create("sequence_orders").await.unwrap();
    let other = locks.get_or_create("sequence_users").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(first.name(), "sequence_orders");
}

#[tokio::test]
async fn grantor_promotion_is_requested_on_first_use() {
    let store = Arc::new(MemoryStore::new());
    let locks = Arc::new(LocalLockCoordinator::new());
    let allocator = BlockAllocator::new(Arc::clone(&store), Arc::clone(&locks));

    allocator.allocate("orders", 1).await.unwrap();

    let lock = locks.get_or_create(&lock_name("orders")).await.unwrap();
    assert!(lock.is_grantor());
}

#[tokio::test]
async fn bootstrap_is_an_explicit_idempotent_step() {
    let context = ClusterContext::new(
        Arc::new(MemoryStore::new()),
        Arc::new(LocalLockCoordinator::new()),
        PartitionMap::default(),
    );

    context.bootstrap().await.unwrap();
    context.bootstrap().await.unwrap();

    let block = context.allocator().allocate("orders", 3).await.unwrap();
    assert_eq!(block, vec![0, 1, 2]);
}

#[test]
fn routing_is_stable_and_in_range() {
    let map = PartitionMap::default();
    assert_eq!(map.partitions(), DEFAULT_PARTITIONS);

    for key in ["orders", "users", "", "a-rather-long-sequence-name"] {
        let partition = map.partition_for(key);
        assert!(partition < map.partitions());
        assert_eq!(partition, map.partition_for(key));
        assert!(map.owner_of(key, 4) < 4);
        assert_eq!(map.owner_of(key, 1), 0);
    }
}

#[test]
fn lock_names_carry_the_sequence_prefix() {
    assert_eq!(lock_name("orders"), "sequence_orders");
}
