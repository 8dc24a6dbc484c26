use std::collections::BTreeMap;

use serde::Serialize;

use brainers_core::canonical::sha256_hex;
use brainers_core::constants::NATIVE_TOKEN;
use brainers_core::contract::SmartContract;
use brainers_core::error::LedgerError;
use brainers_core::token::Token;
use brainers_core::types::{Address, Amount, TokenId};
use brainers_core::validator::Validator;
use brainers_markets::{DexState, TtfState, TuvState};

/// The full in-memory world: everything the state root commits to, plus the
/// sub-ledger books and conservation bookkeeping.
///
/// Missing account/token entries read as zero; writes lazily materialize
/// them. A custom token's holder map mirrors the account table — every
/// credit/debit/adjust keeps the two in lockstep.
#[derive(Clone, Debug, Default)]
pub struct WorldState {
    pub accounts: BTreeMap<Address, BTreeMap<TokenId, Amount>>,
    pub tokens: BTreeMap<TokenId, Token>,
    pub validators: BTreeMap<Address, Validator>,
    pub contracts: BTreeMap<Address, SmartContract>,
    /// address → base58 DER public key, populated at a sender's first valid
    /// signed transaction.
    pub key_registry: BTreeMap<Address, String>,

    pub dex: DexState,
    pub ttf: TtfState,
    pub tuv: TuvState,

    /// Native supply destroyed so far (fees and burns).
    pub burned_total: Amount,
    /// Native supply issued as block rewards.
    pub rewards_issued: Amount,
    /// Native supply issued at genesis.
    pub genesis_issued: Amount,
}

impl WorldState {
    /// Balance lookup; absent entries read as zero without materializing.
    pub fn balance(&self, address: &Address, token: &str) -> Amount {
        self.accounts
            .get(address)
            .and_then(|tokens| tokens.get(token))
            .cloned()
            .unwrap_or_else(Amount::zero)
    }

    pub fn credit(&mut self, address: &Address, token: &str, amount: &Amount) {
        *self
            .accounts
            .entry(address.clone())
            .or_default()
            .entry(token.to_string())
            .or_default() += amount.clone();
        self.sync_holder(token, address);
    }

    pub fn debit(&mut self, address: &Address, token: &str, amount: &Amount) -> Result<(), LedgerError> {
        let balance = self.balance(address, token);
        if balance < *amount {
            return Err(LedgerError::InsufficientBalance {
                need: amount.clone(),
                have: balance,
            });
        }
        *self
            .accounts
            .entry(address.clone())
            .or_default()
            .entry(token.to_string())
            .or_default() -= amount.clone();
        self.sync_holder(token, address);
        Ok(())
    }

    /// Signed, unchecked balance adjustment. Trade settlement and position
    /// payouts go through here; they follow the source semantics, which
    /// tolerate transient negatives (conservation holds, non-negativity is
    /// not an invariant).
    pub fn adjust(&mut self, address: &Address, token: &str, delta: &Amount) {
        *self
            .accounts
            .entry(address.clone())
            .or_default()
            .entry(token.to_string())
            .or_default() += delta.clone();
        self.sync_holder(token, address);
    }

    /// Mirror an account balance into the token's holder map.
    fn sync_holder(&mut self, token: &str, address: &Address) {
        if token == NATIVE_TOKEN {
            return;
        }
        let balance = self.balance(address, token);
        if let Some(t) = self.tokens.get_mut(token) {
            t.holders.insert(address.clone(), balance);
        }
    }

    /// Destroy `amount` of supply that has already been debited from an
    /// account: native burns accrue to `burned_total`, token burns shrink
    /// the token's circulating supply.
    pub fn record_burn(&mut self, token: &str, amount: &Amount) {
        if amount.is_zero() {
            return;
        }
        if token == NATIVE_TOKEN {
            self.burned_total += amount.clone();
        } else if let Some(t) = self.tokens.get_mut(token) {
            t.circulating_supply -= amount.clone();
        }
    }

    /// Total BRAINERS currently held in accounts.
    pub fn circulating_native(&self) -> Amount {
        self.accounts
            .values()
            .filter_map(|tokens| tokens.get(NATIVE_TOKEN))
            .cloned()
            .sum()
    }

    /// Total stake across all validators.
    pub fn total_stake(&self) -> Amount {
        self.validators.values().map(|v| v.stake.clone()).sum()
    }

    /// SHA-256 over canonical JSON of `{accounts, validators, tokens,
    /// contracts}`. Key order is deterministic (everything is a BTreeMap)
    /// and rationals serialize as canonical strings.
    pub fn state_root(&self) -> Result<String, LedgerError> {
        #[derive(Serialize)]
        struct Snapshot<'a> {
            accounts: &'a BTreeMap<Address, BTreeMap<TokenId, Amount>>,
            validators: &'a BTreeMap<Address, Validator>,
            tokens: &'a BTreeMap<TokenId, Token>,
            contracts: &'a BTreeMap<Address, SmartContract>,
        }
        let json = brainers_core::canonical::canonical_json(&Snapshot {
            accounts: &self.accounts,
            validators: &self.validators,
            tokens: &self.tokens,
            contracts: &self.contracts,
        })?;
        Ok(sha256_hex(json.as_bytes()))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
