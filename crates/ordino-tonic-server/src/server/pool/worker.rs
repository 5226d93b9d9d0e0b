use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use crate::server::routing::{processor::handle_allocate_request, request::WorkRequest};
use crate::server::service::Allocator;

/// Worker task owning the allocations of its assigned partitions.
///
/// Each worker holds its own [`Allocator`] over the node's shared store
/// and lock coordinator. The worker listens on an MPSC channel and
/// processes requests until a shutdown signal is received; the dispatcher
/// guarantees that every request arriving here is for a sequence this
/// worker owns.
///
/// # Arguments
///
/// - `worker_id`: Unique numeric identifier for this worker (used for
///   logs).
/// - `rx`: Receiver through which [`WorkRequest`]s are received.
/// - `allocator`: The [`Allocator`] executing this worker's critical
///   sections.
/// - `chunk_bytes`: The maximum size (in bytes) of a response chunk.
pub async fn worker_loop(
    worker_id: usize,
    mut rx: mpsc::Receiver<WorkRequest>,
    allocator: Allocator,
    chunk_bytes: usize,
) {
    trace!("Worker {worker_id} started");

    // Pre-allocate a reusable buffer to avoid heap churn during packing.
    let mut chunk_buf = vec![0_u8; chunk_bytes];

    while let Some(work) = rx.recv().await {
        match work {
            WorkRequest::Allocate {
                sequence,
                block_size,
                chunk_tx,
            } => {
                handle_allocate_request(
                    worker_id,
                    &mut chunk_buf,
                    chunk_bytes,
                    &sequence,
                    block_size,
                    chunk_tx,
                    &allocator,
                )
                .await;
            }
            WorkRequest::Shutdown { response } => {
                debug!("Worker {worker_id} received shutdown signal");

                if response.send(()).is_err() {
                    error!("Worker {worker_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    trace!("Worker {worker_id} stopped");
}
