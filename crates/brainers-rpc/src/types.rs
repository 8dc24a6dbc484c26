use serde::Deserialize;
use serde_json::Value;

use brainers_core::constants::NATIVE_TOKEN;
use brainers_core::transaction::{Transaction, TxKind};
use brainers_core::types::{Address, Amount, Timestamp, TokenId};

/// Shared tail of every signed POST body: the hash preimage fields the
/// client signed, plus the signature and (optionally) the public key.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub fee: Amount,
    pub timestamp: Timestamp,
    pub signature: String,
    #[serde(default)]
    pub public_key: Option<String>,
}

fn assemble(
    sender: Address,
    recipient: Address,
    amount: Amount,
    kind: TxKind,
    data: serde_json::Map<String, Value>,
    envelope: Envelope,
) -> Transaction {
    let mut tx = Transaction::new(sender, recipient, amount, kind, envelope.fee, data, envelope.timestamp);
    tx.signature = envelope.signature;
    tx.public_key = envelope.public_key;
    tx
}

// ── POST bodies ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StakeRequest {
    pub sender: Address,
    pub amount: Amount,
    #[serde(flatten)]
    pub envelope: Envelope,
}

impl StakeRequest {
    pub fn into_transaction(self, kind: TxKind) -> Transaction {
        let mut data = serde_json::Map::new();
        data.insert("token".into(), Value::String(NATIVE_TOKEN.into()));
        assemble(
            self.sender.clone(),
            self.sender,
            self.amount,
            kind,
            data,
            self.envelope,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct BurnRequest {
    pub sender: Address,
    pub amount: Amount,
    #[serde(default)]
    pub token: Option<TokenId>,
    #[serde(flatten)]
    pub envelope: Envelope,
}

impl BurnRequest {
    pub fn into_transaction(self) -> Transaction {
        let mut data = serde_json::Map::new();
        data.insert(
            "token".into(),
            Value::String(self.token.unwrap_or_else(|| NATIVE_TOKEN.into())),
        );
        assemble(
            self.sender,
            Address::zero(),
            self.amount,
            TxKind::Burn,
            data,
            self.envelope,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub creator: Address,
    pub name: String,
    pub symbol: String,
    pub total_supply: Amount,
    #[serde(default)]
    pub is_minable: bool,
    #[serde(flatten)]
    pub envelope: Envelope,
}

impl CreateTokenRequest {
    pub fn into_transaction(self) -> Transaction {
        let mut data = serde_json::Map::new();
        data.insert("name".into(), Value::String(self.name));
        data.insert("symbol".into(), Value::String(self.symbol));
        data.insert("is_minable".into(), Value::Bool(self.is_minable));
        assemble(
            self.creator,
            Address::zero(),
            self.total_supply,
            TxKind::CreateToken,
            data,
            self.envelope,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateContractRequest {
    pub creator: Address,
    pub code: String,
    pub abi: Value,
    #[serde(flatten)]
    pub envelope: Envelope,
}

impl CreateContractRequest {
    pub fn into_transaction(self) -> Transaction {
        let mut data = serde_json::Map::new();
        data.insert("code".into(), Value::String(self.code));
        data.insert("abi".into(), self.abi);
        assemble(
            self.creator,
            Address::zero(),
            Amount::zero(),
            TxKind::CreateContract,
            data,
            self.envelope,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct ExecuteContractRequest {
    pub caller: Address,
    pub contract_address: Address,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(flatten)]
    pub envelope: Envelope,
}

impl ExecuteContractRequest {
    pub fn into_transaction(self) -> Transaction {
        let mut data = serde_json::Map::new();
        data.insert("method".into(), Value::String(self.method));
        if let Some(params) = self.params {
            data.insert("params".into(), params);
        }
        assemble(
            self.caller,
            self.contract_address,
            Amount::zero(),
            TxKind::ExecuteContract,
            data,
            self.envelope,
        )
    }
}

// ── Query strings ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: Option<TokenId>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

// ── Tests ────────────────────────────────────────────────────────────────────
