use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use brainers_core::constants::PEER_DISCOVERY_INTERVAL_SECS;
use brainers_state::{Engine, IngestOutcome};

use crate::config::P2pConfig;
use crate::message::PeerMessage;

/// Capacity of the gossip fan-out channel; slow connections drop frames
/// rather than stalling the network task.
const GOSSIP_CAPACITY: usize = 256;

/// The peer network task. Owns the listener and the discovery loop; every
/// connection (inbound or dialed) runs the same frame handler, which funnels
/// transactions and blocks into the engine's critical section.
pub struct PeerNetwork {
    engine: Arc<Engine>,
    config: P2pConfig,
    gossip: broadcast::Sender<PeerMessage>,
    peers: Arc<Mutex<HashSet<String>>>,
}

impl PeerNetwork {
    pub fn new(engine: Arc<Engine>, config: P2pConfig) -> Self {
        let (gossip, _) = broadcast::channel(GOSSIP_CAPACITY);
        PeerNetwork {
            engine,
            config,
            gossip,
            peers: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Handle for pushing locally produced blocks and transactions to every
    /// live peer.
    pub fn gossip_handle(&self) -> broadcast::Sender<PeerMessage> {
        self.gossip.clone()
    }

    /// Drive the listener and discovery loops until shutdown.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let listener = match TcpListener::bind(&self.config.listen_addr).await {
            Ok(l) => l,
            Err(e) => {
                warn!(addr = %self.config.listen_addr, error = %e, "peer listener failed to bind");
                return;
            }
        };
        info!(addr = %self.config.listen_addr, "peer network listening");

        tokio::spawn(discovery_loop(
            Arc::clone(&self.engine),
            self.config.clone(),
            self.gossip.clone(),
            Arc::clone(&self.peers),
            shutdown.clone(),
        ));

        let mut shutdown_rx = shutdown.clone();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let Ok((stream, addr)) = accepted else { continue };
                    let engine = Arc::clone(&self.engine);
                    let gossip = self.gossip.clone();
                    let peers = Arc::clone(&self.peers);
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        match tokio_tungstenite::accept_async(stream).await {
                            Ok(ws) => {
                                let peer = addr.to_string();
                                peers.lock().insert(peer.clone());
                                run_connection(engine, ws, gossip, peers, peer, false, shutdown)
                                    .await;
                            }
                            Err(e) => debug!(peer = %addr, error = %e, "websocket handshake failed"),
                        }
                    });
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("peer network stopped");
    }
}

/// Periodically dial bootstrap peers we are not connected to. A freshly
/// dialed peer gets a hello and a sync_request so a lagging node catches up
/// immediately.
async fn discovery_loop(
    engine: Arc<Engine>,
    config: P2pConfig,
    gossip: broadcast::Sender<PeerMessage>,
    peers: Arc<Mutex<HashSet<String>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        for peer in &config.bootstrap_peers {
            if peers.lock().contains(peer) {
                continue;
            }
            match tokio_tungstenite::connect_async(format!("ws://{peer}")).await {
                Ok((ws, _)) => {
                    info!(peer = %peer, "connected to bootstrap peer");
                    peers.lock().insert(peer.clone());
                    tokio::spawn(run_connection(
                        Arc::clone(&engine),
                        ws,
                        gossip.clone(),
                        Arc::clone(&peers),
                        peer.clone(),
                        true,
                        shutdown.clone(),
                    ));
                }
                Err(e) => debug!(peer = %peer, error = %e, "bootstrap connect failed"),
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(PEER_DISCOVERY_INTERVAL_SECS)) => {}
            _ = shutdown.changed() => {}
        }
    }
}

/// Serve one peer connection: react to inbound frames, forward gossip, and
/// drop the peer from the live set on any error or disconnect.
async fn run_connection<S>(
    engine: Arc<Engine>,
    ws: WebSocketStream<S>,
    gossip: broadcast::Sender<PeerMessage>,
    peers: Arc<Mutex<HashSet<String>>>,
    peer: String,
    dialed: bool,
    mut shutdown: watch::Receiver<bool>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = ws.split();
    let mut gossip_rx = gossip.subscribe();

    if dialed {
        let greeting = [
            PeerMessage::Hello,
            PeerMessage::SyncRequest { last_block: engine.tip_index() },
        ];
        for msg in greeting {
            if sink.send(Message::Text(msg.to_text())).await.is_err() {
                peers.lock().remove(&peer);
                return;
            }
        }
    }

    loop {
        tokio::select! {
            frame = stream.next() => {
                let Some(Ok(frame)) = frame else { break };
                let Message::Text(text) = frame else { continue };
                let msg = match PeerMessage::from_text(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        debug!(peer = %peer, error = %e, "undecodable frame; closing");
                        break;
                    }
                };
                match handle_frame(&engine, &gossip, &peer, msg) {
                    Ok(replies) => {
                        let mut failed = false;
                        for reply in replies {
                            if sink.send(Message::Text(reply.to_text())).await.is_err() {
                                failed = true;
                                break;
                            }
                        }
                        if failed {
                            break;
                        }
                    }
                    // Peer errors close the offending connection; the peer
                    // may reconnect.
                    Err(e) => {
                        warn!(peer = %peer, error = %e, "peer error; closing connection");
                        break;
                    }
                }
            }
            outbound = gossip_rx.recv() => {
                match outbound {
                    Ok(msg) => {
                        if sink.send(Message::Text(msg.to_text())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(peer = %peer, skipped, "gossip lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    peers.lock().remove(&peer);
    debug!(peer = %peer, "peer disconnected");
}

/// React to one inbound frame; returns the frames to send back on this
/// connection. Errors close the connection.
fn handle_frame(
    engine: &Engine,
    gossip: &broadcast::Sender<PeerMessage>,
    peer: &str,
    msg: PeerMessage,
) -> Result<Vec<PeerMessage>, brainers_core::error::LedgerError> {
    match msg {
        PeerMessage::Hello => Ok(vec![]),

        PeerMessage::NewTransaction { transaction } => {
            let now = chrono::Utc::now().timestamp_micros();
            let success = match engine.admit_transaction(transaction, now) {
                Ok(()) => true,
                Err(e) => {
                    debug!(peer = %peer, error = %e, "peer transaction rejected");
                    false
                }
            };
            Ok(vec![PeerMessage::TransactionResponse { success }])
        }

        PeerMessage::NewBlock { block } => match engine.ingest_block(block.clone())? {
            IngestOutcome::Committed => {
                // Accepted: pass it along to everyone else.
                let _ = gossip.send(PeerMessage::NewBlock { block });
                Ok(vec![])
            }
            IngestOutcome::KnownBlock => Ok(vec![]),
            IngestOutcome::AheadOfTip { local_tip } => {
                debug!(peer = %peer, local_tip, ahead = block.index, "requesting sync");
                Ok(vec![PeerMessage::SyncRequest { last_block: local_tip }])
            }
        },

        PeerMessage::GetBlockchainState => {
            let state = serde_json::to_value(engine.chain_summary())
                .map_err(|e| brainers_core::error::LedgerError::Serialization(e.to_string()))?;
            Ok(vec![PeerMessage::BlockchainState { state }])
        }

        PeerMessage::SyncRequest { last_block } => Ok(vec![PeerMessage::SyncResponse {
            blocks: engine.blocks_after(last_block)?,
        }]),

        PeerMessage::SyncResponse { blocks } => {
            for block in blocks {
                match engine.ingest_block(block)? {
                    IngestOutcome::Committed | IngestOutcome::KnownBlock => {}
                    IngestOutcome::AheadOfTip { local_tip } => {
                        // The peer skipped blocks; ask again from our tip.
                        return Ok(vec![PeerMessage::SyncRequest { last_block: local_tip }]);
                    }
                }
            }
            Ok(vec![])
        }

        // Responses arriving unsolicited carry no action.
        PeerMessage::TransactionResponse { .. } | PeerMessage::BlockchainState { .. } => {
            Ok(vec![])
        }
    }
}
