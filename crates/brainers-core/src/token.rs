use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::canonical::sha256_hex;
use crate::types::{Address, Amount, Timestamp, TokenId, ADDRESS_DIGEST_LEN, ADDRESS_PREFIX};

/// A user-created fungible asset.
///
/// Invariants: `0 ≤ circulating_supply ≤ total_supply` and the holder map
/// sums to `circulating_supply`. The holder map mirrors the account table;
/// the state engine keeps the two in lockstep on every credit and debit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    pub name: String,
    pub symbol: String,
    pub total_supply: Amount,
    pub circulating_supply: Amount,
    pub creator: Address,
    pub is_minable: bool,
    pub difficulty: u32,
    pub address: TokenId,
    pub holders: BTreeMap<Address, Amount>,
}

impl Token {
    pub fn new(
        name: String,
        symbol: String,
        total_supply: Amount,
        creator: Address,
        is_minable: bool,
        created_at: Timestamp,
    ) -> Self {
        let address = derive_token_address(&name, &symbol, &total_supply, &creator, created_at);
        Token {
            name,
            symbol,
            total_supply,
            circulating_supply: Amount::zero(),
            creator,
            is_minable,
            difficulty: 0,
            address,
            holders: BTreeMap::new(),
        }
    }

    pub fn holder_balance(&self, holder: &Address) -> Amount {
        self.holders.get(holder).cloned().unwrap_or_else(Amount::zero)
    }
}

/// Token address: `0xBrainers` + the first 34 hex chars of
/// SHA-256(name ∥ symbol ∥ total_supply ∥ creator ∥ creation_time).
pub fn derive_token_address(
    name: &str,
    symbol: &str,
    total_supply: &Amount,
    creator: &Address,
    created_at: Timestamp,
) -> TokenId {
    let digest =
        sha256_hex(format!("{name}{symbol}{total_supply}{creator}{created_at}").as_bytes());
    format!("{ADDRESS_PREFIX}{}", &digest[..ADDRESS_DIGEST_LEN])
}

// ── Tests ────────────────────────────────────────────────────────────────────
