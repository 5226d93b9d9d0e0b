use ordino_tonic_core::{Error, proto::BlockChunk, types::SEQUENCE_VALUE_SIZE};
use tokio::sync::mpsc;
use tonic::Status;
use tracing::debug;

use crate::server::service::Allocator;

/// Executes a single allocation inside a partition-owner worker.
///
/// The whole block is taken inside the sequence's mutual-exclusion window
/// before anything is streamed, so a failed allocation sends no values and
/// never hands out partial credit. Allocated values are then written into
/// a reusable byte buffer and streamed back as serialized [`BlockChunk`]
/// messages, full chunks first and any remainder as a final partial chunk.
/// If the client disconnects, the task exits early.
pub async fn handle_allocate_request(
    worker_id: usize,
    chunk_buf: &mut [u8],
    chunk_bytes: usize,
    sequence: &str,
    block_size: usize,
    chunk_tx: mpsc::Sender<Result<BlockChunk, Status>>,
    allocator: &Allocator,
) {
    let values = match allocator.allocate(sequence, block_size).await {
        Ok(values) => values,
        Err(e) => {
            if chunk_tx.is_closed() {
                debug!("Worker {worker_id} exiting after allocation error");
                return;
            }
            if let Err(send_err) = chunk_tx.send(Err(Error::Allocation(e).into())).await {
                debug!("Worker {worker_id} failed to send error: {send_err}");
            }
            return;
        }
    };

    let mut buff_pos = 0;
    for value in values {
        // Pack the value as little-endian bytes into the buffer.
        let le = value.to_le_bytes();
        chunk_buf[buff_pos..buff_pos + SEQUENCE_VALUE_SIZE].copy_from_slice(&le);
        buff_pos += SEQUENCE_VALUE_SIZE;

        // If the buffer is full, send it as a chunk.
        if buff_pos == chunk_bytes {
            if chunk_tx.is_closed() {
                debug!("Worker {worker_id} exiting before chunk send");
                return;
            }

            let packed = bytes::Bytes::copy_from_slice(chunk_buf);
            if let Err(send_err) = chunk_tx
                .send(Ok(BlockChunk {
                    packed_values: packed,
                }))
                .await
            {
                debug!("Worker {worker_id} failed to send chunk: {send_err}");
                return;
            }

            buff_pos = 0;
        }
    }

    // Flush the final partial chunk if anything remains in the buffer.
    if buff_pos > 0 && !chunk_tx.is_closed() {
        let packed = bytes::Bytes::copy_from_slice(&chunk_buf[..buff_pos]);
        if let Err(send_err) = chunk_tx
            .send(Ok(BlockChunk {
                packed_values: packed,
            }))
            .await
        {
            debug!("Worker {worker_id} failed to send final chunk: {send_err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ordino::{LocalLockCoordinator, MemoryStore, SequenceValue};
    use tokio::sync::mpsc;

    use super::*;

    fn decode(chunk: &BlockChunk) -> Vec<SequenceValue> {
        assert_eq!(chunk.packed_values.len() % SEQUENCE_VALUE_SIZE, 0);
        chunk
            .packed_values
            .chunks_exact(SEQUENCE_VALUE_SIZE)
            .map(|packed| {
                let mut le = [0_u8; SEQUENCE_VALUE_SIZE];
                le.copy_from_slice(packed);
                SequenceValue::from_le_bytes(le)
            })
            .collect()
    }

    #[tokio::test]
    async fn block_is_split_into_full_chunks_and_a_partial_tail() {
        let allocator = Allocator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(LocalLockCoordinator::new()),
        );
        // Room for 4 values per chunk; 10 values split 4 + 4 + 2.
        let chunk_bytes = 4 * SEQUENCE_VALUE_SIZE;
        let mut chunk_buf = vec![0_u8; chunk_bytes];
        let (chunk_tx, mut chunk_rx) = mpsc::channel(8);

        handle_allocate_request(0, &mut chunk_buf, chunk_bytes, "orders", 10, chunk_tx, &allocator)
            .await;

        let mut sizes = Vec::new();
        let mut values = Vec::new();
        while let Some(msg) = chunk_rx.recv().await {
            let chunk = msg.unwrap();
            let decoded = decode(&chunk);
            sizes.push(decoded.len());
            values.extend(decoded);
        }

        assert_eq!(sizes, vec![4, 4, 2]);
        let expected: Vec<SequenceValue> = (0..10).collect();
        assert_eq!(values, expected);
    }
}
