//! Atoll store node binary
//!
//! Wires the region controller onto a standalone (non-replicated) engine:
//! config, logging, meta stores, recovery, and shutdown in order.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use atoll::config::Config;
use atoll::controller::RegionController;
use atoll::engine::{LocalEngine, NoopLogStorage, RocksRawEngine};
use atoll::heartbeat::HeartbeatNotifier;
use atoll::meta::{CommandLog, MetaStore, RaftMetaStore, RegionMetaStore};
use atoll::metrics::RegionMetricsRegistry;
use atoll::peer_client::LocalPeerClient;
use atoll::services::Services;

/// Atoll store node configuration
#[derive(Parser, Debug)]
#[command(name = "atoll")]
#[command(about = "Atoll - store node of a distributed key/value and vector database")]
struct Args {
    /// Store ID
    #[arg(short, long, default_value = "1")]
    store_id: u64,

    /// Node role: store or index
    #[arg(short, long, default_value = "store")]
    role: String,

    /// Data storage directory
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Configuration file path (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration from file if specified, otherwise use defaults
    let mut config = if let Some(config_path) = &args.config {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    // Override config with command line arguments
    if args.store_id > 0 {
        config.node.store_id = args.store_id;
    }
    if !args.role.is_empty() {
        config.node.role = args.role.clone();
    }
    if !args.data_dir.as_os_str().is_empty() {
        config.storage.data_dir = args.data_dir.clone();
    }
    if !args.log_level.is_empty() {
        config.log.level = args.log_level.clone();
    }

    // Initialize logging
    let level = match config.log.level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("starting atoll store node {}", config.node.store_id);
    info!("data directory: {:?}", config.storage.data_dir);

    std::fs::create_dir_all(&config.storage.data_dir)?;

    // Meta stores share one durable store and hydrate before the controller
    // starts.
    let meta_store = Arc::new(MetaStore::open(config.storage.meta_dir())?);
    let region_meta = Arc::new(RegionMetaStore::new(meta_store.clone()));
    region_meta.init()?;
    let raft_meta = Arc::new(RaftMetaStore::new(meta_store.clone()));
    raft_meta.init()?;
    let command_log = Arc::new(CommandLog::new(meta_store));
    command_log.init()?;

    let raw_engine = Arc::new(RocksRawEngine::open(config.storage.data_dir.join("raw"))?);
    let (heartbeat, mut heartbeat_rx) = HeartbeatNotifier::new();

    let services = Arc::new(Services::new(
        config.node.store_id,
        config.node.node_role(),
        region_meta,
        raft_meta,
        command_log,
        Arc::new(LocalEngine),
        raw_engine,
        Arc::new(NoopLogStorage),
        None,
        Arc::new(heartbeat),
        Arc::new(LocalPeerClient),
        Arc::new(RegionMetricsRegistry::new()),
    ));

    let controller = RegionController::new(services);
    controller.init();
    controller.recover();

    // Standalone nodes have no coordinator; drain triggers into the log so
    // command completions stay observable.
    tokio::spawn(async move {
        while let Some(region_id) = heartbeat_rx.recv().await {
            debug!("store heartbeat trigger for region {}", region_id);
        }
    });

    info!("atoll store node is ready");
    tokio::signal::ctrl_c().await?;

    info!("shutting down");
    controller.destroy().await;
    Ok(())
}
