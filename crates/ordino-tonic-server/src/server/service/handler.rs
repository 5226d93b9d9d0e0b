//! gRPC service implementation for block sequence allocation.
//!
//! This module defines [`SequenceService`], the concrete implementation of
//! the [`SequenceAllocator`] gRPC service defined in the protobuf
//! specification. It exposes a streaming endpoint that hands one
//! contiguous block of sequence values to each caller.
//!
//! ## Responsibilities
//!
//! - Wire the node's cluster context and spawn the partition workers.
//! - Validate incoming `AllocateBlock` requests and enforce limits.
//! - Route each request to the worker owning the sequence's partition.
//! - Track in-flight streams and coordinate graceful shutdown.

use core::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ordino::{DEFAULT_SEQUENCE, LocalLockCoordinator, MemoryStore, PartitionMap};
use ordino_tonic_core::{
    Error,
    proto::{AllocateBlockRequest, BlockChunk, sequence_allocator_server::SequenceAllocator},
};
use tokio::sync::mpsc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::warn;

use crate::server::{
    config::ServerConfig,
    pool::{manager::PartitionPool, worker::worker_loop},
    routing::dispatcher::route_block,
    service::NodeContext,
};

static STREAMS_INFLIGHT: AtomicUsize = AtomicUsize::new(0);
static GLOBAL_SHUTDOWN: AtomicBool = AtomicBool::new(false);

pub fn get_streams_inflight() -> usize {
    STREAMS_INFLIGHT.load(Ordering::Acquire)
}

/// Flips the service into refuse-new-requests mode. Called once by the
/// pool at the start of graceful shutdown.
pub fn set_global_shutdown() {
    GLOBAL_SHUTDOWN.store(true, Ordering::Release);
}

fn is_shutting_down() -> bool {
    GLOBAL_SHUTDOWN.load(Ordering::Acquire)
}

fn increment_streams_inflight() {
    STREAMS_INFLIGHT.fetch_add(1, Ordering::AcqRel);
}

fn decrement_streams_inflight() {
    STREAMS_INFLIGHT.fetch_sub(1, Ordering::AcqRel);
}

/// gRPC service handing out contiguous blocks of sequence values.
///
/// Implements the [`SequenceAllocator`] service defined in the protobuf
/// schema. Each request is routed by its sequence name to the
/// partition-owner worker responsible for that key; the worker allocates
/// the whole block inside the sequence's mutual-exclusion window and
/// streams it back as binary-packed [`BlockChunk`]s.
#[derive(Clone)]
pub struct SequenceService {
    config: ServerConfig,
    pool: Arc<PartitionPool>,
}

impl SequenceService {
    /// Builds the node and spawns its partition-owner workers.
    ///
    /// Construction of the cluster context is side-effect-free; the
    /// awaited bootstrap step here is what creates the backing store
    /// structure before any request is served.
    pub async fn bootstrap(config: ServerConfig) -> anyhow::Result<Self> {
        let context = NodeContext::new(
            Arc::new(MemoryStore::new()),
            Arc::new(LocalLockCoordinator::new()),
            PartitionMap::new(config.partitions),
        );
        context.bootstrap().await?;

        let shutdown_token = CancellationToken::new();
        let mut workers = Vec::with_capacity(config.num_workers);

        for worker_id in 0..config.num_workers {
            // One in-flight request per worker: the dispatcher hands a
            // worker its next request only after the previous one finished
            // streaming, which keeps allocations for a partition strictly
            // ordered and memory usage predictable.
            let (tx, rx) = mpsc::channel(1);
            workers.push(tx);

            tokio::spawn(worker_loop(
                worker_id,
                rx,
                context.allocator(),
                config.chunk_bytes,
            ));
        }

        let pool = PartitionPool::new(
            workers,
            context.partition_map(),
            shutdown_token,
            config.shutdown_timeout_secs,
        );

        Ok(Self {
            config,
            pool: Arc::new(pool),
        })
    }

    /// Initiates a graceful shutdown of the worker pool.
    ///
    /// New requests are refused, in-flight streams drain, and the call
    /// blocks until each worker acknowledges termination.
    pub async fn shutdown(&self) -> Result<(), Error> {
        self.pool.shutdown().await
    }
}

#[tonic::async_trait]
impl SequenceAllocator for SequenceService {
    type AllocateBlockStream = Pin<Box<dyn Stream<Item = Result<BlockChunk, Status>> + Send>>;

    /// Handles one block allocation request.
    ///
    /// Validates the requested size, routes the request to the partition
    /// owner of the sequence name, and streams the packed block back. A
    /// block size of zero yields an empty stream without taking the
    /// sequence lock or touching the store.
    async fn allocate_block(
        &self,
        req: Request<AllocateBlockRequest>,
    ) -> Result<Response<Self::AllocateBlockStream>, Status> {
        if is_shutting_down() {
            return Err(Error::ServiceShutdown.into());
        }

        let block_size = req.get_ref().block_size as usize;
        let sequence = match req.get_ref().sequence.as_str() {
            "" => DEFAULT_SEQUENCE.to_string(),
            name => name.to_string(),
        };

        if block_size == 0 {
            return Ok(Response::new(Box::pin(tokio_stream::empty())));
        }

        if block_size > self.config.max_block_size {
            return Err(Error::InvalidRequest {
                reason: format!(
                    "Block size {} exceeds maximum allowed ({})",
                    block_size, self.config.max_block_size
                ),
            }
            .into());
        }

        let (resp_tx, resp_rx) =
            mpsc::channel::<Result<BlockChunk, Status>>(self.config.stream_buffer_size);

        increment_streams_inflight();
        let pool = Arc::clone(&self.pool);

        tokio::spawn(async move {
            if let Err(e) = route_block(sequence, block_size, pool, resp_tx).await {
                warn!("Error: {e}");
            }
            decrement_streams_inflight();
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(resp_rx))))
    }
}
