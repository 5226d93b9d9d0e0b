use anyhow::bail;
use clap::Parser;
use ordino::DEFAULT_PARTITIONS;
use ordino_tonic_core::types::SEQUENCE_VALUE_SIZE;

/// Runtime configuration for the `ordino-tonic-server` binary.
///
/// These settings control partitioning, concurrency, buffering, and
/// chunking behavior of the sequence allocation service. All values are
/// parsed from CLI arguments or environment variables, with defaults
/// suitable for a single-node deployment.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ordino-tonic-server",
    version,
    about = "A gRPC service allocating blocks of cluster-wide sequence values"
)]
pub struct CliArgs {
    /// Maximum number of values allowed per allocation request.
    ///
    /// Enforced server-side so one caller cannot drain an entire wrap
    /// epoch or exhaust server memory with a single request.
    ///
    /// Environment variable: `MAX_BLOCK_SIZE`
    #[arg(long, env = "MAX_BLOCK_SIZE", default_value_t = 1_000_000)]
    pub max_block_size: usize,

    /// Number of partition-owner worker tasks.
    ///
    /// Partitions are spread across the workers; requests for one
    /// sequence always land on the worker owning its partition.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = 4)]
    pub num_workers: usize,

    /// Number of partitions the sequence keyspace is divided into.
    ///
    /// Environment variable: `PARTITIONS`
    #[arg(long, env = "PARTITIONS", default_value_t = DEFAULT_PARTITIONS)]
    pub partitions: u32,

    /// Number of sequence values packed into each response chunk.
    ///
    /// Defines the size of each `BlockChunk`. Most blocks are far smaller
    /// than this and travel as a single partial chunk.
    ///
    /// Environment variable: `VALUES_PER_CHUNK`
    #[arg(long, env = "VALUES_PER_CHUNK", default_value_t = 4096)]
    pub values_per_chunk: usize,

    /// Capacity of the response buffer between worker and gRPC stream.
    ///
    /// Lower values increase backpressure responsiveness; higher values
    /// enable deeper pipelining.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,

    /// Seconds to wait for in-flight streams to drain during shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT_SECS`
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 3)]
    pub shutdown_timeout_secs: usize,

    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/ordino-uds.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_block_size: usize,
    pub num_workers: usize,
    pub partitions: u32,
    pub values_per_chunk: usize,
    pub stream_buffer_size: usize,
    pub shutdown_timeout_secs: usize,
    pub chunk_bytes: usize,
    pub server_addr: String,
    pub uds: bool,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.partitions == 0 {
            bail!("PARTITIONS must be greater than 0");
        }

        if args.values_per_chunk == 0 {
            bail!("VALUES_PER_CHUNK must be greater than 0");
        }

        let chunk_bytes = args
            .values_per_chunk
            .checked_mul(SEQUENCE_VALUE_SIZE)
            .ok_or_else(|| anyhow::anyhow!("Overflow in chunk_bytes computation"))?;

        Ok(Self {
            max_block_size: args.max_block_size,
            num_workers: args.num_workers,
            partitions: args.partitions,
            values_per_chunk: args.values_per_chunk,
            stream_buffer_size: args.stream_buffer_size,
            shutdown_timeout_secs: args.shutdown_timeout_secs,
            chunk_bytes,
            server_addr: args.server_addr,
            uds: args.uds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CliArgs {
        CliArgs {
            max_block_size: 1_000_000,
            num_workers: 4,
            partitions: DEFAULT_PARTITIONS,
            values_per_chunk: 4096,
            stream_buffer_size: 8,
            shutdown_timeout_secs: 3,
            server_addr: "0.0.0.0:50051".to_string(),
            uds: false,
        }
    }

    #[test]
    fn chunk_bytes_follows_values_per_chunk() {
        let config = ServerConfig::try_from(args()).unwrap();
        assert_eq!(config.chunk_bytes, 4096 * SEQUENCE_VALUE_SIZE);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let config = ServerConfig::try_from(CliArgs {
            num_workers: 0,
            ..args()
        });
        assert!(config.is_err());
    }

    #[test]
    fn zero_partitions_is_rejected() {
        let config = ServerConfig::try_from(CliArgs {
            partitions: 0,
            ..args()
        });
        assert!(config.is_err());
    }

    #[test]
    fn zero_values_per_chunk_is_rejected() {
        let config = ServerConfig::try_from(CliArgs {
            values_per_chunk: 0,
            ..args()
        });
        assert!(config.is_err());
    }
}
