use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ordino_tonic_client::driver::{self, DriverConfig};
use ordino_tonic_client::transport::GrpcTransport;

/// Drives concurrent block allocation against an ordino node and verifies
/// global ordering of everything returned.
#[derive(Parser, Debug)]
#[command(
    name = "ordino-tonic-client",
    version,
    about = "Concurrent sequence allocation driver and verifier"
)]
struct CliArgs {
    /// Number of concurrent workers.
    #[arg(long)]
    threads: usize,

    /// Values requested per allocation call.
    #[arg(long)]
    block_size: u64,

    /// Sequential allocation calls per worker.
    #[arg(long)]
    iterations: usize,

    /// Address of the allocator node.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("http://127.0.0.1:50051"))]
    addr: String,

    /// Sequence every worker draws from.
    #[arg(long, default_value_t = String::from("my-sequence"))]
    sequence: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse();

    let transport = Arc::new(GrpcTransport::connect(args.addr.clone()).await?);
    let report = driver::run(
        transport,
        DriverConfig {
            threads: args.threads,
            block_size: args.block_size,
            iterations: args.iterations,
            sequence: args.sequence,
        },
    )
    .await;

    println!(
        "Checking order of {} values - right count: {}",
        report.collected,
        report.count_matches()
    );

    if let Some((previous, current)) = report.violation {
        println!("Failure: {previous} > {current}");
        return Ok(ExitCode::from(1));
    }

    println!("Everything OK");
    Ok(ExitCode::SUCCESS)
}
