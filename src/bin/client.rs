//! hybridpir-client: fetch one element from a set of HybridPIR replicas

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hybrid_pir::math::GaussianSampler;
use hybrid_pir::{DispatchConfig, HttpTransport, HybridPirClient, RetrievalParams, Target};

#[derive(Parser)]
#[command(name = "hybridpir-client")]
#[command(about = "HybridPIR client")]
#[command(version)]
struct Args {
    /// Replica addresses (host:port), in replica id order
    #[arg(long, value_delimiter = ',', default_value = "127.0.0.1:7000,127.0.0.1:7001")]
    targets: Vec<String>,

    /// Element index to fetch; defaults to the demo marker at count/2
    #[arg(long)]
    index: Option<usize>,

    #[arg(long, default_value_t = 1 << 25)]
    db_size: usize,

    #[arg(long, default_value_t = 8)]
    element_size: usize,

    #[arg(long, default_value_t = 2)]
    raidpir_redundancy: usize,

    #[arg(long, default_value_t = 1 << 12)]
    raidpir_size: usize,

    #[arg(long, default_value_t = 2048)]
    sealpir_degree: usize,

    #[arg(long, default_value_t = 12)]
    sealpir_log: u32,

    #[arg(long, default_value_t = 2)]
    sealpir_d: usize,

    /// Per-target timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Deadline for the whole retrieval in seconds
    #[arg(long, default_value_t = 120)]
    deadline_secs: u64,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

#[derive(Serialize)]
struct Output {
    index: usize,
    hex: String,
    elapsed_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let params = RetrievalParams {
        db_size: args.db_size,
        element_size: args.element_size,
        raidpir_redundancy: args.raidpir_redundancy,
        raidpir_size: args.raidpir_size,
        sealpir_degree: args.sealpir_degree,
        sealpir_log: args.sealpir_log,
        sealpir_d: args.sealpir_d,
    };
    let index = args.index.unwrap_or(params.element_count() / 2);
    let targets: Vec<Target> = args
        .targets
        .iter()
        .enumerate()
        .map(|(replica, address)| Target::new(address.clone(), replica))
        .collect();

    info!("Generating keys for {} targets", targets.len());
    let sigma = params.sealpir().wrap_err("Invalid SealPIR parameters")?.sigma;
    let client = HybridPirClient::new(params, targets, GaussianSampler::new(sigma))
        .wrap_err("Invalid retrieval configuration")?;

    let config = DispatchConfig::new(
        Duration::from_secs(args.timeout_secs),
        Duration::from_secs(args.deadline_secs),
    );
    let transport = Arc::new(HttpTransport::with_timeouts(
        Duration::from_secs(10),
        config.per_target_timeout,
    ));

    let start = std::time::Instant::now();
    let element = client
        .retrieve(&transport, index, &config)
        .await
        .with_context(|| format!("Failed to retrieve index {}", index))?;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let output = Output {
        index: element.index,
        hex: hex::encode(&element.bytes),
        elapsed_ms,
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}: {} ({} ms)", output.index, output.hex, output.elapsed_ms);
    }
    Ok(())
}
