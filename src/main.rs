use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use waypost::config::Config;
use waypost::graph::{GraphReader, TileGrid};
use waypost::server::{build_router, run_server, spawn_worker, Downstream};
use waypost::snapshot::GraphSnapshot;
use waypost::worker::Worker;

#[derive(Parser)]
#[command(name = "waypost")]
#[command(about = "Location correlation worker for a distributed routing pipeline", long_about = None)]
struct Cli {
    /// Service configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Override the configured listen address
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let snapshot = GraphSnapshot::load(&config.graph.snapshot)?;
    let grid = TileGrid::new(config.graph.tile_size_deg);
    let (store, index) = snapshot.into_parts(grid);
    let reader = GraphReader::new(store, grid, config.graph.cache_budget_bytes);

    let worker = Worker::new(&config, reader, Box::new(index));
    let handle = spawn_worker(worker);
    let downstream = config.service.downstream.clone().map(Downstream::new);
    let router = build_router(handle, downstream);

    let listen = cli.listen.unwrap_or_else(|| config.service.listen.clone());
    run_server(&listen, router).await
}
