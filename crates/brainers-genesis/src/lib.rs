//! brainers-genesis
//!
//! Builds block 0: six named treasury wallets receive fixed fractions of
//! INITIAL_SUPPLY as unsigned genesis transactions from the zero address,
//! in a fixed order. The block commits through the normal engine path, so a
//! syncing node reproduces the same state root from the block alone.

pub mod params;

pub use params::{distribution, GenesisParams};

use tracing::info;

use brainers_core::block::{genesis_previous_hash, Block};
use brainers_core::constants::INITIAL_SUPPLY;
use brainers_core::error::LedgerError;
use brainers_core::transaction::{Transaction, TxKind};
use brainers_core::types::{Address, Amount};
use brainers_state::{Engine, IngestOutcome};

/// Build the genesis block from the distribution table, in table order.
pub fn genesis_block(params: &GenesisParams) -> Result<Block, LedgerError> {
    let mut transactions = Vec::new();
    for (name, ratio) in distribution() {
        let address = params.wallets.get(name).ok_or_else(|| {
            LedgerError::InvalidTransaction(format!("genesis params missing wallet `{name}`"))
        })?;
        let amount = INITIAL_SUPPLY.clone() * ratio;
        info!(wallet = name, address = %address, amount = %amount, "genesis allocation");
        transactions.push(Transaction::new(
            Address::zero(),
            address.clone(),
            amount,
            TxKind::Genesis,
            Amount::zero(),
            serde_json::Map::new(),
            params.timestamp,
        ));
    }
    Ok(Block::new(
        0,
        transactions,
        params.timestamp,
        genesis_previous_hash(),
        Address::zero(),
    ))
}

/// Build and commit genesis on a fresh engine, then verify the issued
/// supply is exactly 9998/10000 of INITIAL_SUPPLY.
pub fn apply_genesis(engine: &Engine, params: &GenesisParams) -> Result<(), LedgerError> {
    let block = genesis_block(params)?;
    match engine.ingest_block(block)? {
        IngestOutcome::Committed => {}
        other => {
            return Err(LedgerError::ChainDiscontinuity(format!(
                "genesis block was not committed: {other:?}"
            )))
        }
    }
    verify_genesis_supply(engine)?;
    info!(state_root = %engine.state_root(), "genesis committed");
    Ok(())
}

/// The distribution sums to 99.98% of INITIAL_SUPPLY; the remainder is
/// deliberately never issued.
pub fn expected_genesis_issue() -> Amount {
    INITIAL_SUPPLY.clone() * Amount::ratio(9_998, 10_000)
}

fn verify_genesis_supply(engine: &Engine) -> Result<(), LedgerError> {
    let issued = engine.with_world(|w| w.genesis_issued.clone());
    let expected = expected_genesis_issue();
    if issued != expected {
        return Err(LedgerError::GenesisSupplyMismatch { expected, got: issued });
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use brainers_core::constants::NATIVE_TOKEN;
    use brainers_state::{NoopRuntime, Store};

    fn test_engine() -> (tempfile::TempDir, Engine) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (dir, Engine::open(store, Box::new(NoopRuntime)).unwrap())
    }

    #[test]
    fn six_wallets_receive_exact_fractions() {
        let (_dir, engine) = test_engine();
        let (params, _keys) = GenesisParams::generate_ephemeral(1_000);
        apply_genesis(&engine, &params).unwrap();

        let expected = [
            ("Reserve", Amount::from_int(371_000_000)),
            ("Liquidity", Amount::from_int(950_000_000)),
            ("Stablecoin-Reserve", Amount::from_int(950_000_000)),
            ("Investor", Amount::from_int(1_000_000_000)),
            ("Guarantee", Amount::from_int(950_000_000)),
            ("Farming", Amount::from_int(279_000_000)),
        ];
        for (name, amount) in expected {
            let address = params.wallets.get(name).unwrap();
            assert_eq!(engine.balance(address, NATIVE_TOKEN), amount, "{name}");
        }
    }

    #[test]
    fn genesis_issues_99_98_percent() {
        let (_dir, engine) = test_engine();
        let (params, _keys) = GenesisParams::generate_ephemeral(1_000);
        apply_genesis(&engine, &params).unwrap();

        let issued = engine.with_world(|w| w.genesis_issued.clone());
        assert_eq!(issued, Amount::from_int(4_999_000_000));
        assert_eq!(issued, expected_genesis_issue());
        assert!(issued < INITIAL_SUPPLY.clone());
    }

    #[test]
    fn genesis_block_links_to_zero_hash() {
        let (params, _keys) = GenesisParams::generate_ephemeral(1_000);
        let block = genesis_block(&params).unwrap();
        assert_eq!(block.index, 0);
        assert_eq!(block.previous_hash, "0".repeat(64));
        assert!(block.validator.is_zero());
        assert_eq!(block.transactions.len(), 6);
        assert!(block.verify_hash());
    }

    #[test]
    fn same_params_build_identical_blocks() {
        let (params, _keys) = GenesisParams::generate_ephemeral(1_000);
        let a = genesis_block(&params).unwrap();
        let b = genesis_block(&params).unwrap();
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.merkle_root, b.merkle_root);
    }

    #[test]
    fn missing_wallet_is_rejected() {
        let (mut params, _keys) = GenesisParams::generate_ephemeral(1_000);
        params.wallets.remove("Farming");
        assert!(genesis_block(&params).is_err());
    }

    #[test]
    fn reserve_fraction_value() {
        // 5·10⁹ × 742/10000 = 371,000,000 — the table's exact ratios survive
        // the rational arithmetic without rounding.
        let amount = INITIAL_SUPPLY.clone() * Amount::ratio(742, 10_000);
        assert_eq!(amount, Amount::from_int(371_000_000));
    }
}
