//! berthd — the berth node daemon.
//!
//! One binary runs on every host in the fleet. Each node serves the full
//! HTTP surface (controller and worker roles at once) and runs the
//! reconciliation scheduler in the background; the scheduler lease in KV
//! picks which node's ticks actually execute.
//!
//! # Usage
//!
//! ```text
//! berthd --listen 0.0.0.0:8888 --kv-endpoint http://pi1:2379 --data-dir ./data
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use berth_api::{build_router, AppState};
use berth_cluster::PeerClient;
use berth_runtime::{local_host_name, ContainerRuntime, DockerRuntime, Probe, SysProbe};
use berth_scheduler::Scheduler;
use berth_state::{KvStore, Store};
use berth_storage::StorageService;

#[derive(Parser)]
#[command(name = "berthd", about = "berth cluster node daemon")]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8888")]
    listen: SocketAddr,

    /// Endpoint of the cluster KV store.
    #[arg(long, default_value = "http://127.0.0.1:2379")]
    kv_endpoint: String,

    /// Local data directory for stored files.
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Advertised host name (defaults to the OS hostname).
    #[arg(long)]
    host_name: Option<String>,

    /// Reconciliation tick interval in seconds.
    #[arg(long, default_value = "60")]
    schedule_interval: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,berthd=debug,berth=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let local_host = cli
        .host_name
        .or_else(local_host_name)
        .unwrap_or_else(|| "localhost".to_string());

    info!(host = %local_host, listen = %cli.listen, "berthd starting");

    std::fs::create_dir_all(&cli.data_dir)?;

    // KV connectivity is fatal; everything else degrades per-request.
    let kv = KvStore::connect(&cli.kv_endpoint).await?;
    let store = Store::new(kv);
    info!(endpoint = %cli.kv_endpoint, "kv store connected");

    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerRuntime::connect()?);
    info!("container runtime connected");

    let probe: Arc<dyn Probe> = Arc::new(SysProbe::new(&cli.data_dir));
    let peers = PeerClient::new()?;
    let storage = StorageService::new(
        &cli.data_dir,
        store.clone(),
        peers.clone(),
        probe.clone(),
        local_host.clone(),
        cli.listen.port(),
    );

    let state = AppState {
        store: store.clone(),
        runtime,
        probe,
        peers: peers.clone(),
        storage,
        local_host: local_host.clone(),
        listen_port: cli.listen.port(),
    };

    // ── Background scheduler ───────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Scheduler::new(
        store,
        peers,
        local_host,
        cli.listen.port(),
        Duration::from_secs(cli.schedule_interval),
    );
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    // ── HTTP server ────────────────────────────────────────────────

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    info!(addr = %cli.listen, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = scheduler_handle.await;
    info!("berthd stopped");
    Ok(())
}
