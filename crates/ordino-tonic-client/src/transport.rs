use async_trait::async_trait;
use ordino_tonic_core::proto::{
    AllocateBlockRequest, sequence_allocator_client::SequenceAllocatorClient,
};
use ordino_tonic_core::types::{SEQUENCE_VALUE_SIZE, SequenceValue};
use tokio_stream::StreamExt;
use tonic::codec::CompressionEncoding;
use tonic::transport::{Channel, Endpoint};

/// Errors surfaced by an allocation round trip.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(#[from] tonic::transport::Error),

    #[error("allocation call failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("corrupt chunk: length {len} is not a multiple of {value_size}")]
    CorruptChunk { len: usize, value_size: usize },
}

/// One allocation round trip against an allocator node.
#[async_trait]
pub trait BlockTransport: Send + Sync {
    /// Requests `block_size` values of `sequence` and returns the
    /// flattened block, in allocation order.
    async fn next_block(
        &self,
        sequence: &str,
        block_size: u64,
    ) -> Result<Vec<SequenceValue>, TransportError>;
}

/// gRPC [`BlockTransport`] against a running allocator node.
#[derive(Clone)]
pub struct GrpcTransport {
    client: SequenceAllocatorClient<Channel>,
}

impl GrpcTransport {
    /// Connects to the node at `addr` (e.g. `http://127.0.0.1:50051`).
    pub async fn connect(addr: String) -> Result<Self, TransportError> {
        let channel = Endpoint::from_shared(addr)?.connect().await?;
        let client = SequenceAllocatorClient::new(channel)
            .send_compressed(CompressionEncoding::Zstd)
            .accept_compressed(CompressionEncoding::Zstd);
        Ok(Self { client })
    }
}

#[async_trait]
impl BlockTransport for GrpcTransport {
    async fn next_block(
        &self,
        sequence: &str,
        block_size: u64,
    ) -> Result<Vec<SequenceValue>, TransportError> {
        let mut client = self.client.clone();
        let mut stream = client
            .allocate_block(AllocateBlockRequest {
                sequence: sequence.to_string(),
                block_size,
            })
            .await?
            .into_inner();

        let mut values = Vec::with_capacity(block_size as usize);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let bytes = chunk.packed_values.as_ref();

            if bytes.len() % SEQUENCE_VALUE_SIZE != 0 {
                return Err(TransportError::CorruptChunk {
                    len: bytes.len(),
                    value_size: SEQUENCE_VALUE_SIZE,
                });
            }

            // Chunks arrive in allocation order; concatenating them
            // reassembles the block without re-sorting.
            for packed in bytes.chunks_exact(SEQUENCE_VALUE_SIZE) {
                let mut le = [0_u8; SEQUENCE_VALUE_SIZE];
                le.copy_from_slice(packed);
                values.push(SequenceValue::from_le_bytes(le));
            }
        }

        Ok(values)
    }
}
