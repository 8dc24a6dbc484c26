use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use brainers_core::types::{Address, Amount, Timestamp};
use brainers_crypto::KeyPair;

/// The six treasury wallets, in distribution order. The ratios sum to
/// 9998/10000 — the remaining 0.02% of the initial supply is never issued.
pub fn distribution() -> Vec<(&'static str, Amount)> {
    vec![
        ("Reserve", Amount::ratio(742, 10_000)),
        ("Liquidity", Amount::ratio(19, 100)),
        ("Stablecoin-Reserve", Amount::ratio(19, 100)),
        ("Investor", Amount::ratio(20, 100)),
        ("Guarantee", Amount::ratio(19, 100)),
        ("Farming", Amount::ratio(558, 10_000)),
    ]
}

/// Everything a node needs to build the (shared, deterministic) genesis
/// block: a timestamp and a recipient address per treasury wallet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisParams {
    /// Unix-micros timestamp stamped on block 0. Identical on every node of
    /// a chain.
    pub timestamp: Timestamp,
    /// Treasury wallet name → recipient address.
    pub wallets: BTreeMap<String, Address>,
}

impl GenesisParams {
    /// Generate throwaway wallets for local development. The keypairs are
    /// returned so the caller can print or persist them — they are NOT
    /// reproducible, and a genesis built from them cannot be shared.
    pub fn generate_ephemeral(timestamp: Timestamp) -> (Self, Vec<(String, KeyPair)>) {
        let mut wallets = BTreeMap::new();
        let mut keys = Vec::new();
        for (name, _) in distribution() {
            let kp = KeyPair::generate();
            wallets.insert(name.to_string(), kp.address.clone());
            keys.push((name.to_string(), kp));
        }
        (GenesisParams { timestamp, wallets }, keys)
    }
}
