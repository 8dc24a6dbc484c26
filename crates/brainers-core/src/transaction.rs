use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::sha256_hex;
use crate::constants::NATIVE_TOKEN;
use crate::error::LedgerError;
use crate::types::{Address, Amount, Timestamp, TokenId};

// ── TxKind ───────────────────────────────────────────────────────────────────

/// Every state-changing operation in the Brainers ledger is one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    // ── Native asset ─────────────────────────────────────────────────────────
    Genesis,
    Transfer,
    Reward,
    Burn,

    // ── Tokens & validators ──────────────────────────────────────────────────
    CreateToken,
    Stake,
    Unstake,
    GiftValidator,

    // ── Contracts ────────────────────────────────────────────────────────────
    CreateContract,
    ExecuteContract,

    // ── DEX ──────────────────────────────────────────────────────────────────
    AddLiquidity,
    RemoveLiquidity,
    PlaceOrder,
    ChatMessage,

    // ── TTF ──────────────────────────────────────────────────────────────────
    CreateFuture,
    OpenPosition,
    ClosePosition,
    UpdateOracle,

    // ── TUV ──────────────────────────────────────────────────────────────────
    CreateVault,
    TransferVault,
    ClaimVault,
}

impl TxKind {
    /// The snake_case wire name; part of the hash preimage.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Genesis => "genesis",
            TxKind::Transfer => "transfer",
            TxKind::Reward => "reward",
            TxKind::Burn => "burn",
            TxKind::CreateToken => "create_token",
            TxKind::Stake => "stake",
            TxKind::Unstake => "unstake",
            TxKind::GiftValidator => "gift_validator",
            TxKind::CreateContract => "create_contract",
            TxKind::ExecuteContract => "execute_contract",
            TxKind::AddLiquidity => "add_liquidity",
            TxKind::RemoveLiquidity => "remove_liquidity",
            TxKind::PlaceOrder => "place_order",
            TxKind::ChatMessage => "chat_message",
            TxKind::CreateFuture => "create_future",
            TxKind::OpenPosition => "open_position",
            TxKind::ClosePosition => "close_position",
            TxKind::UpdateOracle => "update_oracle",
            TxKind::CreateVault => "create_vault",
            TxKind::TransferVault => "transfer_vault",
            TxKind::ClaimVault => "claim_vault",
        }
    }

    /// Genesis and reward transactions originate from the zero address and
    /// carry no signature.
    pub fn is_system(&self) -> bool {
        matches!(self, TxKind::Genesis | TxKind::Reward)
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Transaction ──────────────────────────────────────────────────────────────

/// A signed, ordered ledger operation.
///
/// `hash` is SHA-256 over the concatenation of sender, recipient, the
/// amount's canonical string, the kind name, the fee's canonical string, the
/// canonical JSON of `data`, and the timestamp. `signature` is ECDSA(P-256,
/// SHA-256) over the ASCII bytes of `hash`, base58-encoded.
///
/// `public_key` (base58 DER) rides outside the hash preimage: the engine's
/// key registry is populated from it on a transaction's first appearance, so
/// later transactions from the same sender may omit it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Address,
    pub recipient: Address,
    pub amount: Amount,
    pub kind: TxKind,
    pub fee: Amount,
    #[serde(default)]
    pub data: serde_json::Map<String, Value>,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub hash: String,
}

impl Transaction {
    /// Build an unsigned transaction with its hash computed.
    pub fn new(
        sender: Address,
        recipient: Address,
        amount: Amount,
        kind: TxKind,
        fee: Amount,
        data: serde_json::Map<String, Value>,
        timestamp: Timestamp,
    ) -> Self {
        let mut tx = Transaction {
            sender,
            recipient,
            amount,
            kind,
            fee,
            data,
            timestamp,
            signature: String::new(),
            public_key: None,
            hash: String::new(),
        };
        tx.hash = tx.compute_hash();
        tx
    }

    /// Canonical JSON of the `data` object (keys sorted, compact).
    pub fn canonical_data(&self) -> String {
        Value::Object(self.data.clone()).to_string()
    }

    /// Recompute the transaction hash from its fields.
    pub fn compute_hash(&self) -> String {
        let preimage = format!(
            "{}{}{}{}{}{}{}",
            self.sender,
            self.recipient,
            self.amount,
            self.kind,
            self.fee,
            self.canonical_data(),
            self.timestamp,
        );
        sha256_hex(preimage.as_bytes())
    }

    /// The bytes covered by the ECDSA signature.
    pub fn signing_bytes(&self) -> &[u8] {
        self.hash.as_bytes()
    }

    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// The token this transaction moves (`data.token`, default BRAINERS).
    pub fn token_id(&self) -> TokenId {
        self.data
            .get("token")
            .and_then(Value::as_str)
            .unwrap_or(NATIVE_TOKEN)
            .to_string()
    }

    // ── Typed data accessors ─────────────────────────────────────────────────

    pub fn data_str(&self, key: &str) -> Result<&str, LedgerError> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| missing(self.kind, key))
    }

    pub fn data_amount(&self, key: &str) -> Result<Amount, LedgerError> {
        let s = self.data_str(key)?;
        Amount::from_str(s)
    }

    pub fn data_i64(&self, key: &str) -> Result<i64, LedgerError> {
        self.data
            .get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| missing(self.kind, key))
    }

    pub fn data_u32(&self, key: &str) -> Result<u32, LedgerError> {
        let n = self.data_i64(key)?;
        u32::try_from(n).map_err(|_| missing(self.kind, key))
    }

    pub fn data_bool_or(&self, key: &str, default: bool) -> bool {
        self.data.get(key).and_then(Value::as_bool).unwrap_or(default)
    }
}

fn missing(kind: TxKind, key: &str) -> LedgerError {
    LedgerError::InvalidTransaction(format!("{kind} transaction missing data field `{key}`"))
}

// ── Tests ────────────────────────────────────────────────────────────────────
