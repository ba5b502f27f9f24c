//! hybridpir-server: one HybridPIR replica over HTTP
//!
//! Serves a deterministic demo database; every replica started with the
//! same parameters and seed holds identical content.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hybrid_pir::server::{demo_database, http, HybridPirServer};
use hybrid_pir::RetrievalParams;

#[derive(Parser)]
#[command(name = "hybridpir-server")]
#[command(about = "HybridPIR replica server")]
#[command(version)]
struct Args {
    /// Replica id of this server
    #[arg(long)]
    replica: usize,

    /// Total number of replicas
    #[arg(long, default_value_t = 2)]
    servers: usize,

    /// Bind address; defaults to 0.0.0.0:(7000 + replica)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Database size in bytes
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

    /// Seed of the demo database content
    #[arg(long, default_value_t = 1234)]
    seed: u64,

    /// Precompute subset XOR tables for block selection (32x memory)
    #[arg(long)]
    russians: bool,

    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
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
    params
        .validate()
        .wrap_err("Invalid retrieval parameters")?;

    info!("HybridPIR replica {} of {}", args.replica, args.servers);
    let load_start = Instant::now();
    let count = params.element_count();
    let db = demo_database(count, params.element_size, args.seed);
    info!(
        "Demo database: {} elements of {} bytes, marker at index {}",
        count,
        params.element_size,
        count / 2
    );

    let mut server = HybridPirServer::new(db, args.replica, args.servers, params)
        .wrap_err("Failed to build replica")?;
    if args.russians {
        server = server.with_four_russians();
    }
    info!("Load time: {:.2?}", load_start.elapsed());

    let addr = args
        .bind
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 7000 + args.replica as u16)));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, http::router(Arc::new(server)))
        .await
        .wrap_err("Server error")?;
    Ok(())
}
