use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use brainers_core::block::{genesis_previous_hash, Block};
use brainers_core::constants::{
    BLOCK_REWARD, GIFT_VALIDATOR_BURN, MAX_TRANSACTIONS_PER_BLOCK, MICROS_PER_SEC, MIN_LIQUIDITY_DEX,
    MIN_LIQUIDITY_TTF, MIN_STAKE, NATIVE_TOKEN, TRADING_START_DELAY_SECS,
};
use brainers_core::contract::SmartContract;
use brainers_core::error::LedgerError;
use brainers_core::token::Token;
use brainers_core::transaction::{Transaction, TxKind};
use brainers_core::types::{Address, Amount, Timestamp, ADDRESS_DIGEST_LEN, ADDRESS_PREFIX};
use brainers_core::validator::Validator;
use brainers_crypto::{address_from_public_key_der, verify_signature};
use brainers_markets::dex::{match_orders, Order, OrderSide};
use brainers_markets::ttf::{future_id, pnl, should_liquidate, Position, PositionSide};
use brainers_markets::tuv::{vault_id, Vault};
use brainers_markets::{ChatMessage, LiquidityPool};

use crate::mempool::{suggested_fee, Mempool};
use crate::runtime::{ContractRuntime, ExecutionContext};
use crate::store::Store;
use crate::world::WorldState;

// ── Signature validation ─────────────────────────────────────────────────────

/// Verify a non-system transaction's signature against the key it carries or
/// the registry, and check the sender address derives from that key. On
/// success the registry learns the key.
fn verify_with_registry(
    registry: &mut BTreeMap<Address, String>,
    tx: &Transaction,
) -> Result<(), LedgerError> {
    let key_b58 = match &tx.public_key {
        Some(k) => k.clone(),
        None => registry
            .get(&tx.sender)
            .cloned()
            .ok_or(LedgerError::InvalidSignature)?,
    };
    let der = bs58::decode(&key_b58)
        .into_vec()
        .map_err(|_| LedgerError::InvalidSignature)?;
    if address_from_public_key_der(&der) != tx.sender {
        return Err(LedgerError::InvalidAddress(tx.sender.to_string()));
    }
    verify_signature(&der, tx.signing_bytes(), &tx.signature)?;
    registry.entry(tx.sender.clone()).or_insert(key_b58);
    Ok(())
}

// ── State transition ─────────────────────────────────────────────────────────

/// Apply one transaction to the world. `now` is the enclosing block's
/// timestamp so that time-gated rules replay identically on every node.
/// Returns transactions emitted by contract execution.
pub fn apply_transaction(
    world: &mut WorldState,
    tx: &Transaction,
    now: Timestamp,
    runtime: &dyn ContractRuntime,
) -> Result<Vec<Transaction>, LedgerError> {
    if tx.amount.is_negative() || tx.fee.is_negative() {
        return Err(LedgerError::InvalidTransaction(
            "negative amount or fee".into(),
        ));
    }
    if tx.kind.is_system() && !tx.sender.is_zero() {
        return Err(LedgerError::InvalidTransaction(format!(
            "{} transaction must originate from the zero address",
            tx.kind
        )));
    }
    if !tx.kind.is_system() {
        if let Some(key) = &tx.public_key {
            world
                .key_registry
                .entry(tx.sender.clone())
                .or_insert_with(|| key.clone());
        }
    }

    match tx.kind {
        // ── Native asset ─────────────────────────────────────────────────────
        TxKind::Genesis => {
            world.credit(&tx.recipient, NATIVE_TOKEN, &tx.amount);
            world.genesis_issued += tx.amount.clone();
            Ok(vec![])
        }

        TxKind::Transfer => {
            let token = tx.token_id();
            let need = tx.amount.clone() + tx.fee.clone();
            world.debit(&tx.sender, &token, &need)?;
            world.credit(&tx.recipient, &token, &tx.amount);
            world.record_burn(&token, &tx.fee);
            Ok(vec![])
        }

        TxKind::Reward => {
            world.credit(&tx.recipient, NATIVE_TOKEN, &tx.amount);
            world.rewards_issued += tx.amount.clone();
            if let Some(v) = world.validators.get_mut(&tx.recipient) {
                v.add_reward(&tx.amount);
            }
            Ok(vec![])
        }

        TxKind::Burn => {
            let token = tx.token_id();
            let destroyed = tx.amount.clone() + tx.fee.clone();
            world.debit(&tx.sender, &token, &destroyed)?;
            world.record_burn(&token, &destroyed);
            Ok(vec![])
        }

        // ── Tokens & validators ──────────────────────────────────────────────
        TxKind::CreateToken => {
            let name = tx.data_str("name")?.to_string();
            let symbol = tx.data_str("symbol")?.to_string();
            if name.is_empty() || symbol.is_empty() {
                return Err(LedgerError::InvalidTransaction(
                    "token name and symbol must be non-empty".into(),
                ));
            }
            charge_fee(world, tx)?;
            let mut token = Token::new(
                name,
                symbol,
                tx.amount.clone(),
                tx.sender.clone(),
                tx.data_bool_or("is_minable", false),
                tx.timestamp,
            );
            token.circulating_supply = tx.amount.clone();
            let id = token.address.clone();
            world.tokens.insert(id.clone(), token);
            world.credit(&tx.sender, &id, &tx.amount);
            Ok(vec![])
        }

        TxKind::Stake => {
            let need = tx.amount.clone() + tx.fee.clone();
            world.debit(&tx.sender, NATIVE_TOKEN, &need)?;
            world.record_burn(NATIVE_TOKEN, &tx.fee);
            world
                .validators
                .entry(tx.sender.clone())
                .and_modify(|v| v.stake += tx.amount.clone())
                .or_insert_with(|| Validator::new(tx.sender.clone(), tx.amount.clone(), false));
            Ok(vec![])
        }

        TxKind::Unstake => {
            let validator = world
                .validators
                .get_mut(&tx.sender)
                .ok_or_else(|| LedgerError::UnknownValidator(tx.sender.to_string()))?;
            if validator.stake < tx.amount {
                return Err(LedgerError::InsufficientBalance {
                    need: tx.amount.clone(),
                    have: validator.stake.clone(),
                });
            }
            validator.stake -= tx.amount.clone();
            if validator.stake < *MIN_STAKE {
                validator.is_active = false;
            }
            world.credit(
                &tx.sender,
                NATIVE_TOKEN,
                &(tx.amount.clone() - tx.fee.clone()),
            );
            world.record_burn(NATIVE_TOKEN, &tx.fee);
            Ok(vec![])
        }

        TxKind::GiftValidator => {
            let need = GIFT_VALIDATOR_BURN.clone() + tx.fee.clone();
            world.debit(&tx.sender, NATIVE_TOKEN, &need)?;
            world.record_burn(NATIVE_TOKEN, &tx.fee);
            world
                .validators
                .entry(tx.recipient.clone())
                .and_modify(|v| v.stake += GIFT_VALIDATOR_BURN.clone())
                .or_insert_with(|| {
                    Validator::new(tx.recipient.clone(), GIFT_VALIDATOR_BURN.clone(), true)
                });
            Ok(vec![])
        }

        // ── Contracts ────────────────────────────────────────────────────────
        TxKind::CreateContract => {
            let code = tx.data_str("code")?.to_string();
            let abi = parse_abi(tx)?;
            charge_fee(world, tx)?;
            let address = derive_contract_address(&tx.hash);
            let contract = SmartContract::new(address.clone(), tx.sender.clone(), code, abi);
            world.contracts.insert(address, contract);
            Ok(vec![])
        }

        TxKind::ExecuteContract => {
            let contract = world
                .contracts
                .get(&tx.recipient)
                .cloned()
                .ok_or_else(|| LedgerError::UnknownContract(tx.recipient.to_string()))?;
            let method = tx.data_str("method")?.to_string();
            let params = match tx.data.get("params") {
                Some(Value::Object(map)) => map.clone(),
                _ => serde_json::Map::new(),
            };
            charge_fee(world, tx)?;
            let mut ctx = ExecutionContext::new(&*world, tx.sender.clone());
            runtime.execute(&contract, &method, &params, &mut ctx)?;
            Ok(ctx.into_emitted())
        }

        // ── DEX ──────────────────────────────────────────────────────────────
        TxKind::AddLiquidity => {
            let token = tx.data_str("token_address")?.to_string();
            let token_amount = tx.data_amount("token_amount")?;
            if !world.tokens.contains_key(&token) {
                return Err(LedgerError::UnknownToken(token));
            }
            let pooled = world
                .dex
                .pools
                .get(&token)
                .map(|p| p.brainers.clone())
                .unwrap_or_else(Amount::zero);
            if pooled + tx.amount.clone() < *MIN_LIQUIDITY_DEX {
                return Err(LedgerError::BelowMinimumLiquidity {
                    min: MIN_LIQUIDITY_DEX.clone(),
                });
            }

            let need = tx.amount.clone() + tx.fee.clone();
            world.debit(&tx.sender, NATIVE_TOKEN, &need)?;
            world.record_burn(NATIVE_TOKEN, &tx.fee);
            world.credit(&brainers_core::types::DEX_ADDRESS, NATIVE_TOKEN, &tx.amount);
            world.debit(&tx.sender, &token, &token_amount)?;
            world.credit(&brainers_core::types::DEX_ADDRESS, &token, &token_amount);

            let pool = world
                .dex
                .pools
                .entry(token.clone())
                .or_insert_with(LiquidityPool::empty);
            pool.brainers += tx.amount.clone();
            pool.token += token_amount;
            world
                .dex
                .trading_start
                .entry(token)
                .or_insert(now + TRADING_START_DELAY_SECS * MICROS_PER_SEC);
            Ok(vec![])
        }

        TxKind::RemoveLiquidity => {
            let token = tx.data_str("token_address")?.to_string();
            let pool = world
                .dex
                .pools
                .get(&token)
                .cloned()
                .ok_or_else(|| LedgerError::UnknownToken(token.clone()))?;
            let total = pool.total_liquidity();
            if total.is_zero() {
                return Err(LedgerError::InvalidTransaction("pool is empty".into()));
            }
            charge_fee(world, tx)?;
            let share = tx.amount.clone() / total;
            let brainers_out = share.clone() * pool.brainers.clone();
            let tokens_out = share * pool.token.clone();

            world.debit(&brainers_core::types::DEX_ADDRESS, NATIVE_TOKEN, &brainers_out)?;
            world.credit(&tx.sender, NATIVE_TOKEN, &brainers_out);
            world.debit(&brainers_core::types::DEX_ADDRESS, &token, &tokens_out)?;
            world.credit(&tx.sender, &token, &tokens_out);

            let pool = world.dex.pools.get_mut(&token).expect("pool checked above");
            pool.brainers -= brainers_out;
            pool.token -= tokens_out;
            Ok(vec![])
        }

        TxKind::PlaceOrder => {
            let token = tx.data_str("token_address")?.to_string();
            if !world.dex.trading_open(&token, now) {
                return Err(LedgerError::TradingNotStarted(token));
            }
            let side = match tx.data_str("order_type")? {
                "buy" => OrderSide::Buy,
                "sell" => OrderSide::Sell,
                other => {
                    return Err(LedgerError::InvalidTransaction(format!(
                        "unknown order type `{other}`"
                    )))
                }
            };
            let amount = tx.data_amount("amount")?;
            let price = tx.data_amount("price")?;
            charge_fee(world, tx)?;

            let book = world.dex.orders.entry(token.clone()).or_default();
            book.push(Order {
                trader: tx.sender.clone(),
                side,
                amount,
                price,
                timestamp: tx.timestamp,
            });
            let trades = match_orders(book);
            for trade in trades {
                let half_fee = trade.fee.clone() / Amount::from_int(2);
                world.adjust(&trade.buyer, &token, &trade.token_amount);
                world.adjust(
                    &trade.buyer,
                    NATIVE_TOKEN,
                    &-(trade.brainers_amount.clone() + half_fee.clone()),
                );
                world.adjust(&trade.seller, &token, &-trade.token_amount.clone());
                world.adjust(
                    &trade.seller,
                    NATIVE_TOKEN,
                    &(trade.brainers_amount.clone() - half_fee),
                );
                world.record_burn(NATIVE_TOKEN, &trade.fee);
            }
            Ok(vec![])
        }

        TxKind::ChatMessage => {
            let token = tx.data_str("token_address")?.to_string();
            let message = tx.data_str("message")?.to_string();
            charge_fee(world, tx)?;
            world.dex.push_chat(
                &token,
                ChatMessage {
                    sender: tx.sender.clone(),
                    message,
                    timestamp: tx.timestamp,
                },
            );
            Ok(vec![])
        }

        // ── TTF ──────────────────────────────────────────────────────────────
        TxKind::CreateFuture => {
            let token = tx.data_str("token_address")?.to_string();
            let pooled = world
                .dex
                .pools
                .get(&token)
                .map(|p| p.brainers.clone())
                .unwrap_or_else(Amount::zero);
            if pooled < *MIN_LIQUIDITY_TTF {
                return Err(LedgerError::BelowMinimumLiquidity {
                    min: MIN_LIQUIDITY_TTF.clone(),
                });
            }
            charge_fee(world, tx)?;
            let id = future_id(&token, tx.timestamp);
            world.ttf.futures.insert(
                id.clone(),
                brainers_markets::Future {
                    id,
                    token,
                    creator: tx.sender.clone(),
                    created_at: tx.timestamp,
                },
            );
            Ok(vec![])
        }

        TxKind::OpenPosition => {
            let fid = tx.data_str("future_id")?.to_string();
            let future = world
                .ttf
                .futures
                .get(&fid)
                .cloned()
                .ok_or_else(|| LedgerError::UnknownFuture(fid.clone()))?;
            let side = match tx.data_str("position_type")? {
                "long" => PositionSide::Long,
                "short" => PositionSide::Short,
                other => {
                    return Err(LedgerError::InvalidTransaction(format!(
                        "unknown position type `{other}`"
                    )))
                }
            };
            let amount = tx.data_amount("amount")?;
            let leverage = tx.data_u32("leverage")?;
            if leverage == 0 {
                return Err(LedgerError::InvalidTransaction("zero leverage".into()));
            }
            let collateral = amount.clone() / Amount::from_int(leverage as i64);
            let need = collateral.clone() + tx.fee.clone();
            world.debit(&tx.sender, NATIVE_TOKEN, &need)?;
            world.record_burn(NATIVE_TOKEN, &tx.fee);
            world.credit(&brainers_core::types::TTF_ADDRESS, NATIVE_TOKEN, &collateral);

            let open_price = world.ttf.oracle_price(&future.token);
            let id = world.ttf.next_position_id(&fid);
            world.ttf.positions.insert(
                id.clone(),
                Position {
                    id,
                    future_id: fid,
                    trader: tx.sender.clone(),
                    side,
                    amount,
                    leverage,
                    collateral,
                    open_price,
                    opened_at: tx.timestamp,
                },
            );
            Ok(vec![])
        }

        TxKind::ClosePosition => {
            let pid = tx.data_str("position_id")?.to_string();
            let position = world
                .ttf
                .positions
                .get(&pid)
                .cloned()
                .ok_or_else(|| LedgerError::PositionNotFound(pid.clone()))?;
            if position.trader != tx.sender {
                return Err(LedgerError::PositionNotFound(pid));
            }
            charge_fee(world, tx)?;
            let token = world
                .ttf
                .futures
                .get(&position.future_id)
                .map(|f| f.token.clone())
                .ok_or_else(|| LedgerError::UnknownFuture(position.future_id.clone()))?;
            let close_price = world.ttf.oracle_price(&token);
            let payout = position.collateral.clone() + pnl(&position, &close_price);
            world.adjust(&brainers_core::types::TTF_ADDRESS, NATIVE_TOKEN, &-payout.clone());
            world.adjust(&tx.sender, NATIVE_TOKEN, &payout);
            world.ttf.positions.remove(&pid);
            Ok(vec![])
        }

        TxKind::UpdateOracle => {
            let token = tx.data_str("token_address")?.to_string();
            let price = tx.data_amount("price")?;
            charge_fee(world, tx)?;
            world.ttf.oracle_prices.insert(token.clone(), price.clone());

            // Liquidation sweep over every position referencing this token.
            // Seized collateral stays in the TTF sink; the position is gone.
            for pid in world.ttf.position_ids_for_token(&token) {
                let liquidate = world
                    .ttf
                    .positions
                    .get(&pid)
                    .map(|p| should_liquidate(p, &price))
                    .unwrap_or(false);
                if liquidate {
                    world.ttf.positions.remove(&pid);
                    debug!(position = %pid, token = %token, "position liquidated");
                }
            }
            Ok(vec![])
        }

        // ── TUV ──────────────────────────────────────────────────────────────
        TxKind::CreateVault => {
            let name = tx.data_str("name")?.to_string();
            let image_url = tx
                .data
                .get("image_url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let token = tx.data_str("token_address")?.to_string();
            let lock_period_secs = tx.data_i64("lock_period")?;
            if token != NATIVE_TOKEN && !world.tokens.contains_key(&token) {
                return Err(LedgerError::UnknownToken(token));
            }
            charge_fee(world, tx)?;
            world.debit(&tx.sender, &token, &tx.amount)?;
            world.credit(&brainers_core::types::TUV_ADDRESS, &token, &tx.amount);

            let id = vault_id(&tx.sender, &name, tx.timestamp);
            world.tuv.vaults.insert(
                id.clone(),
                Vault {
                    id,
                    creator: tx.sender.clone(),
                    owner: tx.sender.clone(),
                    name,
                    image_url,
                    token,
                    token_amount: tx.amount.clone(),
                    lock_period_secs,
                    created_at: tx.timestamp,
                },
            );
            Ok(vec![])
        }

        TxKind::TransferVault => {
            let id = tx.data_str("tuv_id")?.to_string();
            let vault = world
                .tuv
                .vaults
                .get_mut(&id)
                .ok_or_else(|| LedgerError::UnknownVault(id.clone()))?;
            if vault.owner != tx.sender {
                return Err(LedgerError::VaultNotOwned(id));
            }
            vault.owner = tx.recipient.clone();
            charge_fee(world, tx)?;
            Ok(vec![])
        }

        TxKind::ClaimVault => {
            let id = tx.data_str("tuv_id")?.to_string();
            let vault = world
                .tuv
                .vaults
                .get(&id)
                .cloned()
                .ok_or_else(|| LedgerError::UnknownVault(id.clone()))?;
            if vault.owner != tx.sender {
                return Err(LedgerError::VaultNotOwned(id));
            }
            if !vault.is_claimable(now) {
                return Err(LedgerError::VaultLocked(id));
            }
            charge_fee(world, tx)?;
            world.debit(
                &brainers_core::types::TUV_ADDRESS,
                &vault.token,
                &vault.token_amount,
            )?;
            world.credit(&tx.sender, &vault.token, &vault.token_amount);
            world.tuv.vaults.remove(&id);
            Ok(vec![])
        }
    }
}

/// Debit and burn the transaction fee, denominated in the transaction's
/// token.
fn charge_fee(world: &mut WorldState, tx: &Transaction) -> Result<(), LedgerError> {
    if tx.fee.is_zero() {
        return Ok(());
    }
    let token = tx.token_id();
    world.debit(&tx.sender, &token, &tx.fee)?;
    world.record_burn(&token, &tx.fee);
    Ok(())
}

fn parse_abi(tx: &Transaction) -> Result<BTreeMap<String, String>, LedgerError> {
    let raw = tx
        .data
        .get("abi")
        .and_then(Value::as_object)
        .ok_or_else(|| LedgerError::InvalidTransaction("contract abi must be an object".into()))?;
    let mut abi = BTreeMap::new();
    for (method, signature) in raw {
        let signature = signature.as_str().ok_or_else(|| {
            LedgerError::InvalidTransaction("abi signatures must be strings".into())
        })?;
        abi.insert(method.clone(), signature.to_string());
    }
    Ok(abi)
}

/// Contract address: `0xBrainers` + first 34 chars of
/// base58(SHA-256(creating tx hash)) — deterministic across nodes.
fn derive_contract_address(tx_hash: &str) -> Address {
    let digest = brainers_core::canonical::sha256_bytes(tx_hash.as_bytes());
    let encoded = bs58::encode(digest).into_string();
    Address::new_unchecked(format!("{ADDRESS_PREFIX}{}", &encoded[..ADDRESS_DIGEST_LEN]))
}

/// Apply a whole block: every transaction in order, then the deterministic
/// validator bookkeeping (reputation smoothing, last-validated index). Both
/// the producer and the replay path go through here, so state roots
/// reproduce.
pub fn apply_block_to_world(
    world: &mut WorldState,
    block: &Block,
    runtime: &dyn ContractRuntime,
) -> Result<Vec<Transaction>, LedgerError> {
    let mut emitted = Vec::new();
    for tx in &block.transactions {
        if tx.kind == TxKind::Genesis && block.index != 0 {
            return Err(LedgerError::InvalidTransaction(
                "genesis transaction outside block 0".into(),
            ));
        }
        emitted.extend(apply_transaction(world, tx, block.timestamp, runtime)?);
    }
    if let Some(v) = world.validators.get_mut(&block.validator) {
        v.update_reputation(Amount::from_int(1), block.timestamp);
        v.last_block_validated = block.index;
    }
    Ok(emitted)
}

// ── Engine ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct ChainTip {
    height: u64,
    hash: String,
}

struct Ledger {
    world: WorldState,
    /// `world` plus every admitted mempool transaction, used as the admission
    /// dry-run target so queued transactions cannot overspend.
    pending: WorldState,
    mempool: Mempool,
    tip: Option<ChainTip>,
    state_root: String,
    halted: bool,
}

/// Outcome of offering a peer block to the engine.
#[derive(Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    Committed,
    KnownBlock,
    /// The block skips ahead; the caller should sync the gap from the peer.
    AheadOfTip { local_tip: i64 },
}

/// Snapshot served by `/state` and the peer `get_blockchain_state` message.
#[derive(Clone, Debug, Serialize)]
pub struct ChainSummary {
    pub chain_length: u64,
    pub last_block_hash: Option<String>,
    pub state_root: String,
    pub pending_transactions: usize,
    pub active_validators: usize,
    pub total_supply: Amount,
    pub circulating_supply: Amount,
}

/// The ledger engine. One engine-wide critical section serializes every
/// mutation: mempool admission, block production, and peer-block ingestion
/// never interleave.
pub struct Engine {
    store: Store,
    runtime: Box<dyn ContractRuntime>,
    inner: Mutex<Ledger>,
}

impl Engine {
    /// Open the engine over a store. A non-empty store is replayed block by
    /// block to reconstruct the in-memory world.
    pub fn open(store: Store, runtime: Box<dyn ContractRuntime>) -> Result<Self, LedgerError> {
        let (world, tip, state_root) = Self::replay(&store, runtime.as_ref())?;
        if let Some(t) = &tip {
            info!(height = t.height, hash = %t.hash, "replayed chain from store");
        }
        let ledger = Ledger {
            pending: world.clone(),
            world,
            mempool: Mempool::new(),
            tip,
            state_root,
            halted: false,
        };
        Ok(Engine { store, runtime, inner: Mutex::new(ledger) })
    }

    fn replay(
        store: &Store,
        runtime: &dyn ContractRuntime,
    ) -> Result<(WorldState, Option<ChainTip>, String), LedgerError> {
        let mut world = WorldState::default();
        let mut tip = None;
        for block in store.blocks_after(-1)? {
            apply_block_to_world(&mut world, &block, runtime)?;
            tip = Some(ChainTip { height: block.index, hash: block.hash.clone() });
        }
        let state_root = if tip.is_some() { world.state_root()? } else { String::new() };
        Ok((world, tip, state_root))
    }

    /// Re-derive state from the block log alone and swap it in.
    pub fn reindex(&self) -> Result<(), LedgerError> {
        let mut ledger = self.inner.lock();
        let (world, tip, state_root) = Self::replay(&self.store, self.runtime.as_ref())?;
        ledger.world = world;
        ledger.tip = tip;
        ledger.state_root = state_root;
        self.revalidate_mempool(&mut ledger);
        info!("reindex complete");
        Ok(())
    }

    // ── Admission ────────────────────────────────────────────────────────────

    /// Validate and enqueue a client or peer transaction. Kind-specific
    /// preconditions are checked by dry-running the transaction against the
    /// pending world, so block application cannot fail on anything admitted
    /// here.
    pub fn admit_transaction(&self, tx: Transaction, now: Timestamp) -> Result<(), LedgerError> {
        let mut ledger = self.inner.lock();
        if ledger.halted {
            return Err(LedgerError::EngineHalted);
        }
        if tx.kind.is_system() {
            return Err(LedgerError::InvalidTransaction(
                "system transaction kinds cannot be submitted".into(),
            ));
        }
        if !tx.verify_hash() {
            return Err(LedgerError::InvalidTransaction("hash mismatch".into()));
        }
        Address::parse(tx.sender.as_str())?;
        Address::parse(tx.recipient.as_str())?;
        if ledger.mempool.contains(&tx.hash) || self.store.transaction(&tx.hash)?.is_some() {
            return Err(LedgerError::DuplicateTransaction(tx.hash));
        }
        let mut registry = ledger.pending.key_registry.clone();
        verify_with_registry(&mut registry, &tx)?;

        let mut probe = ledger.pending.clone();
        apply_transaction(&mut probe, &tx, now, self.runtime.as_ref())?;
        ledger.pending = probe;
        ledger.mempool.insert(tx)?;
        Ok(())
    }

    /// Fee the node would charge at the current mempool depth. Suggestion
    /// only — validation always uses the fee a transaction carries.
    pub fn current_fee(&self) -> Amount {
        suggested_fee(self.inner.lock().mempool.depth())
    }

    // ── Production ───────────────────────────────────────────────────────────

    /// Assemble, apply, and commit one block.
    ///
    /// `select` chooses the validator from the current world (weighted by
    /// stake × reputation in the consensus crate); returning `None` aborts
    /// production. `Ok(None)` also covers an empty mempool. An application
    /// failure halts the engine: preconditions were re-checked at admission,
    /// so a failure here is structural and needs an operator.
    pub fn produce_block<F>(&self, now: Timestamp, select: F) -> Result<Option<Block>, LedgerError>
    where
        F: FnOnce(&WorldState, &str, u64) -> Option<Address>,
    {
        let mut ledger = self.inner.lock();
        if ledger.halted {
            return Err(LedgerError::EngineHalted);
        }
        if ledger.mempool.is_empty() {
            return Ok(None);
        }
        let (previous_hash, index) = match &ledger.tip {
            Some(t) => (t.hash.clone(), t.height + 1),
            None => (genesis_previous_hash(), 0),
        };
        let Some(validator) = select(&ledger.world, &previous_hash, index) else {
            debug!("no eligible validator; production aborted");
            return Ok(None);
        };

        let mut transactions = ledger.mempool.drain(MAX_TRANSACTIONS_PER_BLOCK);
        transactions.push(Transaction::new(
            Address::zero(),
            validator.clone(),
            BLOCK_REWARD.clone(),
            TxKind::Reward,
            Amount::zero(),
            serde_json::Map::new(),
            now,
        ));
        let block = Block::new(index, transactions, now, previous_hash, validator);

        match self.commit_locked(&mut ledger, &block) {
            Ok(()) => Ok(Some(block)),
            Err(e) => {
                ledger.halted = true;
                error!(error = %e, height = block.index, "block application failed; engine halted");
                Err(e)
            }
        }
    }

    // ── Ingestion ────────────────────────────────────────────────────────────

    /// Validate and commit a block received from a peer (or built by the
    /// genesis crate). Follows the same commit path as production.
    pub fn ingest_block(&self, block: Block) -> Result<IngestOutcome, LedgerError> {
        let mut ledger = self.inner.lock();
        if ledger.halted {
            return Err(LedgerError::EngineHalted);
        }
        let local_tip = ledger.tip.as_ref().map(|t| t.height as i64).unwrap_or(-1);
        if (block.index as i64) <= local_tip {
            return Ok(IngestOutcome::KnownBlock);
        }
        if (block.index as i64) > local_tip + 1 {
            return Ok(IngestOutcome::AheadOfTip { local_tip });
        }

        let expected_prev = ledger
            .tip
            .as_ref()
            .map(|t| t.hash.clone())
            .unwrap_or_else(genesis_previous_hash);
        if block.previous_hash != expected_prev {
            return Err(LedgerError::ChainDiscontinuity(format!(
                "block {} links to {} but local tip is {}",
                block.index, block.previous_hash, expected_prev
            )));
        }
        if !block.verify_hash() {
            return Err(LedgerError::ChainDiscontinuity(format!(
                "block {} fails hash or merkle verification",
                block.index
            )));
        }

        let mut registry = ledger.world.key_registry.clone();
        for tx in &block.transactions {
            if !tx.verify_hash() {
                return Err(LedgerError::InvalidTransaction(format!(
                    "transaction {} hash mismatch",
                    tx.hash
                )));
            }
            if self.store.transaction(&tx.hash)?.is_some() {
                return Err(LedgerError::DuplicateTransaction(tx.hash.clone()));
            }
            if tx.kind.is_system() {
                if !tx.sender.is_zero() {
                    return Err(LedgerError::InvalidTransaction(
                        "system transaction from non-zero sender".into(),
                    ));
                }
            } else {
                verify_with_registry(&mut registry, tx)?;
            }
        }

        self.commit_locked(&mut ledger, &block)?;
        Ok(IngestOutcome::Committed)
    }

    /// Apply to a cloned world, persist, swap. Nothing is mutated until the
    /// whole block has applied and the store write succeeded.
    fn commit_locked(&self, ledger: &mut Ledger, block: &Block) -> Result<(), LedgerError> {
        let mut world = ledger.world.clone();
        let emitted = apply_block_to_world(&mut world, block, self.runtime.as_ref())?;
        let state_root = world.state_root()?;
        self.store.commit_block(block, &state_root)?;

        ledger.world = world;
        ledger.tip = Some(ChainTip { height: block.index, hash: block.hash.clone() });
        ledger.state_root = state_root;

        let committed: Vec<String> = block.transactions.iter().map(|tx| tx.hash.clone()).collect();
        ledger.mempool.remove_committed(&committed);
        self.revalidate_mempool(ledger);

        for tx in emitted {
            let now = tx.timestamp;
            let mut probe = ledger.pending.clone();
            match apply_transaction(&mut probe, &tx, now, self.runtime.as_ref()) {
                Ok(_) => {
                    ledger.pending = probe;
                    let _ = ledger.mempool.insert(tx);
                }
                Err(e) => debug!(error = %e, "dropped contract-emitted transaction"),
            }
        }

        info!(
            height = block.index,
            hash = %block.hash,
            txs = block.transactions.len(),
            "committed block"
        );
        Ok(())
    }

    /// Rebuild the pending world after a commit, dropping queued
    /// transactions the new state no longer supports.
    fn revalidate_mempool(&self, ledger: &mut Ledger) {
        let mut pending = ledger.world.clone();
        for tx in ledger.mempool.take_all() {
            let mut probe = pending.clone();
            match apply_transaction(&mut probe, &tx, tx.timestamp, self.runtime.as_ref()) {
                Ok(_) => {
                    pending = probe;
                    let _ = ledger.mempool.insert(tx);
                }
                Err(e) => warn!(hash = %tx.hash, error = %e, "dropped invalidated transaction"),
            }
        }
        ledger.pending = pending;
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub fn tip_index(&self) -> i64 {
        self.inner
            .lock()
            .tip
            .as_ref()
            .map(|t| t.height as i64)
            .unwrap_or(-1)
    }

    pub fn state_root(&self) -> String {
        self.inner.lock().state_root.clone()
    }

    pub fn is_halted(&self) -> bool {
        self.inner.lock().halted
    }

    pub fn mempool_depth(&self) -> usize {
        self.inner.lock().mempool.depth()
    }

    pub fn balance(&self, address: &Address, token: &str) -> Amount {
        self.inner.lock().world.balance(address, token)
    }

    pub fn token_info(&self, id: &str) -> Option<Token> {
        self.inner.lock().world.tokens.get(id).cloned()
    }

    pub fn validator_info(&self, address: &Address) -> Option<Validator> {
        self.inner.lock().world.validators.get(address).cloned()
    }

    pub fn contract_info(&self, address: &Address) -> Option<SmartContract> {
        self.inner.lock().world.contracts.get(address).cloned()
    }

    pub fn pool_info(&self, token: &str) -> Option<brainers_markets::dex::PoolInfo> {
        self.inner.lock().world.dex.pool_info(token)
    }

    pub fn order_book(&self, token: &str) -> brainers_markets::dex::OrderBookView {
        self.inner.lock().world.dex.order_book(token)
    }

    pub fn chat_tail(&self, token: &str, limit: usize) -> Vec<ChatMessage> {
        self.inner.lock().world.dex.chat_tail(token, limit)
    }

    pub fn vault_info(&self, id: &str, now: Timestamp) -> Option<brainers_markets::tuv::VaultInfo> {
        self.inner
            .lock()
            .world
            .tuv
            .vaults
            .get(id)
            .map(|v| v.info(now))
    }

    pub fn transaction(&self, hash: &str) -> Result<Option<(String, Transaction)>, LedgerError> {
        self.store.transaction(hash)
    }

    pub fn block_by_hash(&self, hash: &str) -> Result<Option<Block>, LedgerError> {
        self.store.block_by_hash(hash)
    }

    pub fn blocks_after(&self, after: i64) -> Result<Vec<Block>, LedgerError> {
        self.store.blocks_after(after)
    }

    pub fn history(&self, address: &Address) -> Result<Vec<Transaction>, LedgerError> {
        self.store.history(address)
    }

    pub fn state_root_at(&self, height: u64) -> Result<Option<String>, LedgerError> {
        self.store.state_root_at(height)
    }

    pub fn chain_summary(&self) -> ChainSummary {
        let ledger = self.inner.lock();
        ChainSummary {
            chain_length: ledger.tip.as_ref().map(|t| t.height + 1).unwrap_or(0),
            last_block_hash: ledger.tip.as_ref().map(|t| t.hash.clone()),
            state_root: ledger.state_root.clone(),
            pending_transactions: ledger.mempool.depth(),
            active_validators: ledger
                .world
                .validators
                .values()
                .filter(|v| v.is_active)
                .count(),
            total_supply: brainers_core::constants::INITIAL_SUPPLY.clone(),
            circulating_supply: ledger.world.circulating_native(),
        }
    }

    /// Run a read-only closure against the world state under the engine lock.
    pub fn with_world<R>(&self, f: impl FnOnce(&WorldState) -> R) -> R {
        f(&self.inner.lock().world)
    }

    /// Flush the store; called on graceful shutdown.
    pub fn flush(&self) -> Result<(), LedgerError> {
        self.store.flush()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
