//! ─── Brainers protocol constants ────────────────────────────────────────────
//!
//! Native asset: BRAINERS. All quantities are exact rationals; the rational
//! constants live behind `Lazy` because bigint construction is not const.

use once_cell::sync::Lazy;

use crate::types::Amount;

/// Token id of the native asset.
pub const NATIVE_TOKEN: &str = "BRAINERS";

/// Timestamps are integer microseconds since the Unix epoch.
pub const MICROS_PER_SEC: i64 = 1_000_000;

/// Hard cap on transactions drained into a single block.
pub const MAX_TRANSACTIONS_PER_BLOCK: usize = 10_000;

/// Validator performance history is a bounded ring of this many entries.
pub const PERFORMANCE_HISTORY_LIMIT: usize = 1_000;

/// Per-token chat log cap; oldest messages are dropped first.
pub const CHAT_LOG_LIMIT: usize = 10_000;

/// Trading in a freshly funded pool opens this many seconds after the first
/// liquidity add.
pub const TRADING_START_DELAY_SECS: i64 = 86_400;

/// Peer discovery reconnection interval (seconds).
pub const PEER_DISCOVERY_INTERVAL_SECS: u64 = 300;

/// Periodic active-validator refresh interval (seconds).
pub const VALIDATOR_REFRESH_INTERVAL_SECS: u64 = 60;

/// Total BRAINERS issued at genesis (of which 9998/10000 is distributed; the
/// remainder is never issued — see the genesis crate).
pub static INITIAL_SUPPLY: Lazy<Amount> = Lazy::new(|| Amount::from_int(5_000_000_000));

/// Floor of the deterministic fee curve: 0.001 BRAINERS.
pub static MIN_FEE: Lazy<Amount> = Lazy::new(|| Amount::ratio(1, 1000));

/// Ceiling of the deterministic fee curve: 0.01 BRAINERS.
pub static MAX_FEE: Lazy<Amount> = Lazy::new(|| Amount::ratio(1, 100));

/// Minimum stake for a validator to be eligible; below it a validator
/// deactivates.
pub static MIN_STAKE: Lazy<Amount> = Lazy::new(|| Amount::from_int(10_000));

/// BRAINERS burned to create a gift validator; the burned amount becomes the
/// gift validator's stake.
pub static GIFT_VALIDATOR_BURN: Lazy<Amount> = Lazy::new(|| Amount::from_int(6_000));

/// Reward issued to the validator of each committed block.
pub static BLOCK_REWARD: Lazy<Amount> = Lazy::new(|| Amount::from_int(1));

/// A pool must hold at least this many BRAINERS after an add_liquidity.
pub static MIN_LIQUIDITY_DEX: Lazy<Amount> = Lazy::new(|| Amount::from_int(1_000_000));

/// A pool must hold at least this many BRAINERS to anchor a future.
pub static MIN_LIQUIDITY_TTF: Lazy<Amount> = Lazy::new(|| Amount::from_int(500_000));

/// DEX matching fee: 0.3% of the BRAINERS leg, split equally between sides.
pub static DEX_FEE_RATE: Lazy<Amount> = Lazy::new(|| Amount::ratio(3, 1000));

/// A position liquidates when its loss reaches 80% of posted collateral.
pub static LIQUIDATION_THRESHOLD: Lazy<Amount> = Lazy::new(|| Amount::ratio(80, 100));
