//! Partition-owner worker pool.
//!
//! This module defines the [`PartitionPool`] struct, which manages the
//! worker tasks that execute allocations. Work is distributed by key
//! ownership: the partition map decides which worker owns a sequence, so
//! allocations for one sequence are always handled by the same worker
//! rather than broadcast across the pool. Shutdown is coordinated through
//! a shared [`CancellationToken`].

use core::time::Duration;

use ordino::PartitionMap;
use ordino_tonic_core::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::server::routing::request::WorkRequest;
use crate::server::service::handler::{get_streams_inflight, set_global_shutdown};

/// A pool of partition-owner workers that process [`WorkRequest`]s.
///
/// Workers receive requests over bounded MPSC channels. Requests are
/// routed by the partition owning the sequence name, and the pool
/// supports graceful, cancellable shutdown.
pub struct PartitionPool {
    workers: Vec<mpsc::Sender<WorkRequest>>,
    partitions: PartitionMap,
    shutdown_token: CancellationToken,
    shutdown_timeout: usize,
}

impl PartitionPool {
    /// Constructs a new [`PartitionPool`] from initialized worker channels,
    /// the node's partition map, and a shared cancellation token.
    pub const fn new(
        workers: Vec<mpsc::Sender<WorkRequest>>,
        partitions: PartitionMap,
        shutdown_token: CancellationToken,
        shutdown_timeout: usize,
    ) -> Self {
        Self {
            workers,
            partitions,
            shutdown_token,
            shutdown_timeout,
        }
    }

    /// Index of the worker owning `sequence`'s partition.
    ///
    /// Deterministic: the same sequence always resolves to the same
    /// worker, which is what keeps a sequence's allocations serialized on
    /// one owner.
    pub fn owner_index(&self, sequence: &str) -> usize {
        self.partitions.owner_of(sequence, self.workers.len())
    }

    /// Sends a [`WorkRequest`] to the worker owning `sequence`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The service is shutting down (`shutdown_token` was cancelled).
    /// - The owner's channel is closed.
    pub async fn send_to_owner(&self, sequence: &str, request: WorkRequest) -> Result<(), Error> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        let worker_idx = self.owner_index(sequence);
        let worker = &self.workers[worker_idx];

        match worker.send(request).await {
            Ok(()) => Ok(()),
            Err(_) => Err(Error::ChannelError {
                context: format!("Worker {worker_idx} channel closed"),
            }),
        }
    }

    /// Gracefully shuts down all workers in the pool.
    ///
    /// - Refuses new requests, then waits for in-flight streams to drain.
    /// - Cancels the shared [`CancellationToken`] to stop remaining work.
    /// - Sends a [`WorkRequest::Shutdown`] to each worker and waits (up to
    ///   3 seconds per worker) for acknowledgements.
    pub async fn shutdown(&self) -> Result<(), Error> {
        // === Phase 0: Stop accepting new requests ===
        info!("Refusing new requests");
        set_global_shutdown();

        // === Phase 1: Wait for in-flight streams to drain ===
        info!(
            "Draining in-flight streams ({} active)",
            get_streams_inflight()
        );
        let drain_result = timeout(Duration::from_secs(self.shutdown_timeout as u64), async {
            while get_streams_inflight() > 0 {
                sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        match drain_result {
            Ok(()) => {
                debug!("All in-flight streams drained successfully");
            }
            Err(_) => {
                warn!(
                    "Graceful drain timed out ({} streams still active)",
                    get_streams_inflight()
                );
            }
        }

        // === Phase 2: Cancel any remaining work ===
        debug!("Cancelling remaining work via shutdown token");
        self.shutdown_token.cancel();

        // === Phase 3: Notify workers to shut down ===
        debug!("Notifying all workers to shut down");
        let mut shutdown_handles = Vec::with_capacity(self.workers.len());

        for (i, worker) in self.workers.iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            if let Err(e) = worker.send(WorkRequest::Shutdown { response: tx }).await {
                error!("Failed to send shutdown to worker {i}: {e}");
            } else {
                shutdown_handles.push((i, rx));
            }
        }

        debug!("Waiting for up to 3s per worker for shutdown acknowledgements");

        for (i, rx) in shutdown_handles {
            match timeout(Duration::from_secs(3), rx).await {
                Ok(Ok(())) => {
                    trace!("Worker {i} shutdown acknowledged");
                }
                Ok(Err(e)) => {
                    error!("Worker {i} returned error: {e}");
                }
                Err(_) => {
                    warn!("Worker {i} shutdown timed out");
                }
            }
        }

        info!("Worker pool shutdown complete");

        Ok(())
    }
}
