//! brainers-node — the Brainers full-node binary.
//!
//! Startup sequence:
//!   1. Open (or initialise) the block store and replay it into memory
//!   2. Apply genesis if the store is fresh
//!   3. Start the WebSocket peer network (gossip + sync + discovery)
//!   4. Start the HTTP query API
//!   5. Run the block producer loop until shutdown

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use brainers_consensus::BlockProducer;
use brainers_core::block::Block;
use brainers_core::constants::VALIDATOR_REFRESH_INTERVAL_SECS;
use brainers_genesis::{apply_genesis, GenesisParams};
use brainers_p2p::{P2pConfig, PeerMessage, PeerNetwork};
use brainers_state::{Engine, NoopRuntime, Store};

#[derive(Parser, Debug)]
#[command(
    name = "brainers-node",
    version,
    about = "Brainers full node — proof-of-stake ledger engine"
)]
struct Args {
    /// Peer WebSocket listen host.
    host: String,

    /// Peer WebSocket listen port.
    port: u16,

    /// Directory for the persistent block store.
    #[arg(long, default_value = "~/.brainers/data")]
    data_dir: PathBuf,

    /// HTTP query API listen address.
    #[arg(long, default_value = "127.0.0.1:8080")]
    rpc_addr: SocketAddr,

    /// Bootstrap peers (host:port, comma-separated).
    #[arg(long, value_delimiter = ',')]
    bootstrap: Vec<String>,

    /// Path to genesis params JSON (only required on first run).
    #[arg(long)]
    genesis_params: Option<PathBuf>,

    /// Re-derive state from the block log before serving.
    #[arg(long)]
    reindex: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,brainers=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("Brainers node starting");

    // ── Store & engine ───────────────────────────────────────────────────────
    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let store = Store::open(&data_dir).context("opening block store")?;
    let engine = Arc::new(Engine::open(store, Box::new(NoopRuntime)).context("opening engine")?);

    if args.reindex {
        engine.reindex().context("reindexing")?;
    }

    // ── Genesis if fresh ─────────────────────────────────────────────────────
    if engine.tip_index() < 0 {
        info!("fresh store — applying genesis");
        let params = load_or_generate_genesis_params(args.genesis_params.as_deref())?;
        apply_genesis(&engine, &params).context("applying genesis")?;
    } else {
        info!(height = engine.tip_index(), "existing chain found — skipping genesis");
    }

    // ── Shutdown signal ──────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    // ── Peer network ─────────────────────────────────────────────────────────
    let p2p_config = P2pConfig {
        listen_addr: format!("{}:{}", args.host, args.port),
        bootstrap_peers: args.bootstrap.clone(),
    };
    let network = PeerNetwork::new(Arc::clone(&engine), p2p_config);
    let gossip = network.gossip_handle();
    tokio::spawn(network.run(shutdown_rx.clone()));

    // ── Block producer ───────────────────────────────────────────────────────
    let (blocks_tx, mut blocks_rx) = mpsc::channel::<Block>(64);
    tokio::spawn(BlockProducer::new(Arc::clone(&engine), blocks_tx).run(shutdown_rx.clone()));

    // Gossip every locally produced block.
    let gossip_blocks = gossip.clone();
    tokio::spawn(async move {
        while let Some(block) = blocks_rx.recv().await {
            let _ = gossip_blocks.send(PeerMessage::NewBlock { block });
        }
    });

    // ── Periodic validator refresh ───────────────────────────────────────────
    let refresh_engine = Arc::clone(&engine);
    let mut refresh_rx = shutdown_rx.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(VALIDATOR_REFRESH_INTERVAL_SECS)) => {
                    let summary = refresh_engine.chain_summary();
                    info!(
                        active = summary.active_validators,
                        height = summary.chain_length,
                        pending = summary.pending_transactions,
                        "validator set refreshed"
                    );
                }
                _ = refresh_rx.changed() => {
                    if *refresh_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });

    // ── Query API (runs until shutdown) ──────────────────────────────────────
    info!("node ready");
    brainers_rpc::serve(Arc::clone(&engine), args.rpc_addr, shutdown_rx).await?;

    engine.flush().context("flushing store")?;
    info!("node stopped");
    Ok(())
}

/// Load genesis parameters from a JSON file, or generate throwaway wallets.
///
/// # Warning
/// Ephemeral wallets are **not reproducible**: a genesis built from them
/// cannot be shared with other nodes. Only use for local development.
fn load_or_generate_genesis_params(path: Option<&Path>) -> anyhow::Result<GenesisParams> {
    if let Some(p) = path {
        let json = std::fs::read_to_string(p)
            .with_context(|| format!("reading genesis params from {}", p.display()))?;
        return serde_json::from_str(&json).context("parsing genesis params JSON");
    }
    warn!("No --genesis-params provided. Generating ephemeral wallets — DO NOT USE IN PRODUCTION.");
    let (params, keys) = GenesisParams::generate_ephemeral(chrono::Utc::now().timestamp_micros());
    for (name, kp) in &keys {
        info!(wallet = name.as_str(), address = %kp.address, "ephemeral genesis wallet");
        match kp.to_pkcs8_pem() {
            Ok(pem) => info!("{name} private key:\n{pem}"),
            Err(e) => warn!(error = %e, "could not export {name} private key"),
        }
    }
    Ok(params)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
