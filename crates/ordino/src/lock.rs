use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

/// Name prefix for per-sequence lock handles.
pub const LOCK_PREFIX: &str = "sequence_";

/// Builds the lock-handle name for a sequence.
pub fn lock_name(sequence: &str) -> String {
    format!("{LOCK_PREFIX}{sequence}")
}

/// Errors surfaced by a lock coordinator backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    /// The coordinator could not serve the operation.
    #[error("lock service unavailable: {reason}")]
    Unavailable { reason: String },

    /// Grant authority could not be transferred to this member.
    #[error("grantor transfer failed for '{name}': {reason}")]
    GrantorTransfer { name: String, reason: String },
}

/// RAII guard for a held sequence lock.
///
/// Dropping the guard releases the lock. Holding the critical section
/// through a guard is what guarantees release on every exit path,
/// including store failures mid-window.
pub struct LockGuard {
    _token: Box<dyn Any + Send>,
}

impl LockGuard {
    /// Wraps whatever release token the coordinator hands out.
    pub fn new(token: impl Any + Send) -> Self {
        Self {
            _token: Box::new(token),
        }
    }
}

/// A named, cluster-shared mutual-exclusion handle.
#[async_trait]
pub trait SequenceLock: Send + Sync {
    fn name(&self) -> &str;

    /// Blocks until the lock is granted. No wait timeout and no lease
    /// expiry: zero duplicate allocation is prioritized over liveness, so a
    /// stalled grantor stalls every waiter until ownership migrates.
    async fn acquire(&self) -> Result<LockGuard, LockError>;

    /// Bounded-wait acquisition. Returns `None` when the lock is still
    /// contended after `wait`, letting deployments choose backpressure over
    /// unbounded stalls.
    async fn acquire_within(&self, wait: Duration) -> Result<Option<LockGuard>, LockError>;

    /// Whether this member currently decides ownership for the lock.
    fn is_grantor(&self) -> bool;

    /// Requests that this member become the lock's grantor, so grant
    /// authority migrates away from a failed member instead of requiring a
    /// manual failover step.
    async fn become_grantor(&self) -> Result<(), LockError>;
}

/// Per-key mutual exclusion with dynamic grantor migration.
#[async_trait]
pub trait LockCoordinator: Send + Sync {
    /// Looks up or creates the handle for `name`.
    ///
    /// Creation is atomic: when two callers race, exactly one creation
    /// takes effect and both observe the same handle.
    async fn get_or_create(&self, name: &str) -> Result<Arc<dyn SequenceLock>, LockError>;
}

/// Single-process [`LockCoordinator`] backed by per-name async mutexes.
///
/// The registry mutex makes `get_or_create` an atomic create-if-absent;
/// there is no double-checked lookup window. Grantor state is recorded so
/// the allocator's proactive self-promotion is observable, though with a
/// single member there is nowhere for authority to migrate.
#[derive(Default)]
pub struct LocalLockCoordinator {
    registry: Mutex<HashMap<String, Arc<LocalLock>>>,
}

impl LocalLockCoordinator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockCoordinator for LocalLockCoordinator {
    async fn get_or_create(&self, name: &str) -> Result<Arc<dyn SequenceLock>, LockError> {
        let mut registry = self.registry.lock();
        let lock = registry
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(LocalLock::new(name)))
            .clone();
        Ok(lock)
    }
}

/// Handle produced by [`LocalLockCoordinator`].
pub struct LocalLock {
    name: String,
    mutex: Arc<tokio::sync::Mutex<()>>,
    grantor: AtomicBool,
}

impl LocalLock {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mutex: Arc::new(tokio::sync::Mutex::new(())),
            grantor: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SequenceLock for LocalLock {
    fn name(&self) -> &str {
        &self.name
    }

    async fn acquire(&self) -> Result<LockGuard, LockError> {
        let guard = Arc::clone(&self.mutex).lock_owned().await;
        Ok(LockGuard::new(guard))
    }

    async fn acquire_within(&self, wait: Duration) -> Result<Option<LockGuard>, LockError> {
        match tokio::time::timeout(wait, Arc::clone(&self.mutex).lock_owned()).await {
            Ok(guard) => Ok(Some(LockGuard::new(guard))),
            Err(_) => Ok(None),
        }
    }

    fn is_grantor(&self) -> bool {
        self.grantor.load(Ordering::Acquire)
    }

    async fn become_grantor(&self) -> Result<(), LockError> {
        self.grantor.store(true, Ordering::Release);
        Ok(())
    }
}
