//! Concurrent load generator.
//!
//! Spawns workers that draw blocks through a [`BlockTransport`] and feeds
//! everything returned into the correctness oracle in [`crate::verify`].

use std::sync::Arc;

use ordino_tonic_core::types::SequenceValue;
use parking_lot::Mutex;

use crate::transport::BlockTransport;
use crate::verify::{self, Report};

/// Load shape for one driver run.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Number of concurrent workers.
    pub threads: usize,
    /// Values requested per allocation call.
    pub block_size: u64,
    /// Sequential allocation calls per worker.
    pub iterations: usize,
    /// Sequence every worker draws from.
    pub sequence: String,
}

/// Runs the load and verifies the union of everything returned.
///
/// Each worker calls the transport sequentially `iterations` times and
/// appends every returned value to one shared buffer behind a single
/// coarse lock. A failed iteration is printed and skipped — no retry, no
/// backoff, no abort — so transient failures surface only as a count
/// shortfall in the report. Once all workers have joined, the buffer is
/// sorted and scanned.
pub async fn run<T>(transport: Arc<T>, config: DriverConfig) -> Report
where
    T: BlockTransport + ?Sized + 'static,
{
    let expected = config.threads * config.block_size as usize * config.iterations;
    let results: Arc<Mutex<Vec<SequenceValue>>> = Arc::new(Mutex::new(Vec::with_capacity(expected)));

    let mut workers = Vec::with_capacity(config.threads);
    for _ in 0..config.threads {
        let transport = Arc::clone(&transport);
        let results = Arc::clone(&results);
        let sequence = config.sequence.clone();
        let block_size = config.block_size;
        let iterations = config.iterations;

        workers.push(tokio::spawn(async move {
            for _ in 0..iterations {
                match transport.next_block(&sequence, block_size).await {
                    Ok(block) => results.lock().extend(block),
                    Err(e) => println!("allocation failed, iteration skipped: {e}"),
                }
            }
        }));
    }

    for worker in workers {
        // A lost worker is treated like its remaining iterations failed:
        // the shortfall shows up in the count check.
        if let Err(e) = worker.await {
            println!("worker terminated early: {e}");
        }
    }

    let mut values = std::mem::take(&mut *results.lock());
    verify::verify(&mut values, expected)
}
