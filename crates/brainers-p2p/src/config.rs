/// Configuration for the peer network.
#[derive(Debug, Clone)]
pub struct P2pConfig {
    /// Local WebSocket listen address, `host:port`.
    pub listen_addr: String,
    /// Static bootstrap peers, `host:port`, retried every discovery cycle.
    pub bootstrap_peers: Vec<String>,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8765".into(),
            bootstrap_peers: Vec::new(),
        }
    }
}
