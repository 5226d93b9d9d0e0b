use std::sync::Arc;

use ordino_tonic_core::{Error, proto::BlockChunk};
use tokio::sync::mpsc;
use tonic::Status;
use tracing::warn;

use super::request::WorkRequest;
use crate::server::pool::manager::PartitionPool;

/// Routes one allocation request to the partition owner and flattens its
/// reply into the response stream.
///
/// The sequence name is the sole routing key: the request lands on exactly
/// the worker owning that key's partition, never on the whole pool. The
/// owner replies with one ordered run of chunks (normally exactly one
/// collection, since a single key maps to a single partition); forwarding
/// them in arrival order is the flattening — chunks are concatenated,
/// never re-sorted.
///
/// On dispatch or send failure the stream is terminated early and the
/// error surfaced to the client when possible.
pub async fn route_block(
    sequence: String,
    block_size: usize,
    pool: Arc<PartitionPool>,
    resp_tx: mpsc::Sender<Result<BlockChunk, Status>>,
) -> ordino_tonic_core::Result<()> {
    // Temporary channel used to receive the packed chunks from the owner.
    let (chunk_tx, mut chunk_rx) = mpsc::channel(2);

    match pool
        .send_to_owner(
            &sequence,
            WorkRequest::Allocate {
                sequence: sequence.clone(),
                block_size,
                chunk_tx,
            },
        )
        .await
    {
        Ok(()) => {
            while let Some(msg) = chunk_rx.recv().await {
                // Forward to the client. A failure here means the client
                // side of the stream is gone; surface it upstream.
                if let Err(e) = resp_tx.send(msg).await {
                    return Err(Error::ChannelError {
                        context: format!("Failed to forward chunk: {e}"),
                    });
                }
            }
            Ok(())
        }
        Err(e) => {
            // Best effort to surface the error to the client; the client
            // may have disconnected as well, so return the original error
            // and only log the failed hand-off.
            if let Err(send_err) = resp_tx.send(Err(e.clone().into())).await {
                warn!("Failed to forward err: {send_err}");
            }
            Err(e)
        }
    }
}
