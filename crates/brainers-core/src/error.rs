use thiserror::Error;

use crate::types::Amount;

#[derive(Debug, Error)]
pub enum LedgerError {
    // ── Admission / validation ───────────────────────────────────────────────
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: Amount, have: Amount },

    #[error("duplicate transaction: {0}")]
    DuplicateTransaction(String),

    #[error("malformed transaction: {0}")]
    InvalidTransaction(String),

    // ── Lookups ──────────────────────────────────────────────────────────────
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("unknown validator: {0}")]
    UnknownValidator(String),

    #[error("unknown contract: {0}")]
    UnknownContract(String),

    #[error("unknown future: {0}")]
    UnknownFuture(String),

    // ── DEX ──────────────────────────────────────────────────────────────────
    #[error("trading has not started for token {0}")]
    TradingNotStarted(String),

    #[error("pool below minimum liquidity ({min} BRAINERS required)")]
    BelowMinimumLiquidity { min: Amount },

    // ── TTF ──────────────────────────────────────────────────────────────────
    #[error("position not found: {0}")]
    PositionNotFound(String),

    // ── TUV ──────────────────────────────────────────────────────────────────
    #[error("vault {0} is still locked")]
    VaultLocked(String),

    #[error("vault {0} is not owned by the caller")]
    VaultNotOwned(String),

    #[error("unknown vault: {0}")]
    UnknownVault(String),

    // ── Chain / producer ─────────────────────────────────────────────────────
    #[error("chain discontinuity: {0}")]
    ChainDiscontinuity(String),

    #[error("no eligible validator")]
    NoEligibleValidator,

    #[error("engine halted after a failed block application")]
    EngineHalted,

    // ── Genesis ──────────────────────────────────────────────────────────────
    #[error("genesis supply mismatch: expected {expected}, got {got}")]
    GenesisSupplyMismatch { expected: Amount, got: Amount },

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage failure: {0}")]
    StoreFailure(String),
}

impl LedgerError {
    /// Short machine-readable kind, used in API error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidSignature => "InvalidSignature",
            LedgerError::InvalidAddress(_) => "InvalidAddress",
            LedgerError::InvalidAmount(_) => "InvalidAmount",
            LedgerError::InsufficientBalance { .. } => "InsufficientBalance",
            LedgerError::DuplicateTransaction(_) => "DuplicateTransaction",
            LedgerError::InvalidTransaction(_) => "InvalidTransaction",
            LedgerError::UnknownAccount(_) => "UnknownAccount",
            LedgerError::UnknownToken(_) => "UnknownToken",
            LedgerError::UnknownValidator(_) => "UnknownValidator",
            LedgerError::UnknownContract(_) => "UnknownContract",
            LedgerError::UnknownFuture(_) => "UnknownFuture",
            LedgerError::TradingNotStarted(_) => "TradingNotStarted",
            LedgerError::BelowMinimumLiquidity { .. } => "BelowMinimumLiquidity",
            LedgerError::PositionNotFound(_) => "PositionNotFound",
            LedgerError::VaultLocked(_) => "VaultLocked",
            LedgerError::VaultNotOwned(_) => "VaultNotOwned",
            LedgerError::UnknownVault(_) => "UnknownVault",
            LedgerError::ChainDiscontinuity(_) => "ChainDiscontinuity",
            LedgerError::NoEligibleValidator => "NoEligibleValidator",
            LedgerError::EngineHalted => "EngineHalted",
            LedgerError::GenesisSupplyMismatch { .. } => "GenesisSupplyMismatch",
            LedgerError::Serialization(_) => "Serialization",
            LedgerError::StoreFailure(_) => "StoreFailure",
        }
    }

    /// True for errors that mean "the requested resource does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::UnknownAccount(_)
                | LedgerError::UnknownToken(_)
                | LedgerError::UnknownValidator(_)
                | LedgerError::UnknownContract(_)
                | LedgerError::UnknownFuture(_)
                | LedgerError::UnknownVault(_)
        )
    }
}
