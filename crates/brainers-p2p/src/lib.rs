//! brainers-p2p
//!
//! The peer protocol: UTF-8 JSON frames, one per WebSocket message.
//! Transactions and blocks gossip to every live peer; a block arriving ahead
//! of the local tip triggers a sync_request for the gap. Peer discovery
//! retries the bootstrap list every five minutes; failed peers are forgotten
//! on disconnect.

pub mod config;
pub mod message;
pub mod network;

pub use config::P2pConfig;
pub use message::PeerMessage;
pub use network::PeerNetwork;
