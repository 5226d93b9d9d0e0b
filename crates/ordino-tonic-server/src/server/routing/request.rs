use ordino_tonic_core::proto::BlockChunk;
use tokio::sync::{mpsc, oneshot};
use tonic::Status;

/// Messages processed by partition-owner workers.
pub enum WorkRequest {
    /// Allocate one block and stream its packed chunks back in order.
    Allocate {
        sequence: String,
        block_size: usize,
        chunk_tx: mpsc::Sender<Result<BlockChunk, Status>>,
    },
    /// Stop the worker and acknowledge over `response`.
    Shutdown { response: oneshot::Sender<()> },
}
