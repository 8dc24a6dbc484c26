use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use brainers_core::canonical::sha256_hex;
use brainers_core::constants::MICROS_PER_SEC;
use brainers_core::types::{Address, Amount, Timestamp, TokenId};

/// A time-locked vault escrowing fungible tokens. Transferable before
/// unlock; claimable by the current owner once the lock period elapses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vault {
    pub id: String,
    pub creator: Address,
    pub owner: Address,
    pub name: String,
    pub image_url: String,
    pub token: TokenId,
    pub token_amount: Amount,
    pub lock_period_secs: i64,
    pub created_at: Timestamp,
}

impl Vault {
    pub fn unlocks_at(&self) -> Timestamp {
        self.created_at + self.lock_period_secs * MICROS_PER_SEC
    }

    pub fn is_claimable(&self, now: Timestamp) -> bool {
        now >= self.unlocks_at()
    }

    pub fn info(&self, now: Timestamp) -> VaultInfo {
        VaultInfo {
            id: self.id.clone(),
            creator: self.creator.clone(),
            owner: self.owner.clone(),
            name: self.name.clone(),
            image_url: self.image_url.clone(),
            token: self.token.clone(),
            token_amount: self.token_amount.clone(),
            lock_period_secs: self.lock_period_secs,
            created_at: self.created_at,
            claimable: self.is_claimable(now),
        }
    }
}

/// `TUV-` + the first 16 hex chars of SHA-256(creator ∥ name ∥ time).
pub fn vault_id(creator: &Address, name: &str, now: Timestamp) -> String {
    let digest = sha256_hex(format!("{creator}{name}{now}").as_bytes());
    format!("TUV-{}", &digest[..16])
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TuvState {
    pub vaults: BTreeMap<String, Vault>,
}

/// Read-only vault view served by the query API.
#[derive(Clone, Debug, Serialize)]
pub struct VaultInfo {
    pub id: String,
    pub creator: Address,
    pub owner: Address,
    pub name: String,
    pub image_url: String,
    pub token: TokenId,
    pub token_amount: Amount,
    pub lock_period_secs: i64,
    pub created_at: Timestamp,
    pub claimable: bool,
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn creator() -> Address {
        Address::new_unchecked("0xBrainersCREATORXXXXXXXXXXXXXXXXXXXXXXXXXXXX")
    }

    #[test]
    fn id_shape_and_determinism() {
        let a = vault_id(&creator(), "rainy day", 1_000);
        let b = vault_id(&creator(), "rainy day", 1_000);
        assert_eq!(a, b);
        assert_eq!(a.len(), 4 + 16);
        assert!(a.starts_with("TUV-"));
        assert_ne!(a, vault_id(&creator(), "rainy day", 1_001));
    }

    #[test]
    fn claimable_only_after_lock_period() {
        let vault = Vault {
            id: "TUV-0000000000000000".into(),
            creator: creator(),
            owner: creator(),
            name: "lock".into(),
            image_url: String::new(),
            token: "0xBrainersT".into(),
            token_amount: Amount::from_int(500),
            lock_period_secs: 3_600,
            created_at: 0,
        };
        assert!(!vault.is_claimable(3_500 * MICROS_PER_SEC));
        assert!(vault.is_claimable(3_600 * MICROS_PER_SEC));
        assert!(vault.is_claimable(3_700 * MICROS_PER_SEC));
        assert!(!vault.info(3_500 * MICROS_PER_SEC).claimable);
    }
}
