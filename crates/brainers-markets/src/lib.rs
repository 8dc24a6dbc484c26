//! brainers-markets
//!
//! The three embedded sub-ledgers: DEX (liquidity pools + order book per
//! token), TTF (leveraged futures with oracle-driven liquidation), and TUV
//! (time-locked vaults). These modules hold sub-ledger state and the pure
//! domain logic; all mutation happens through the state-transition engine —
//! no mutating API is exposed to clients except via transactions.

pub mod dex;
pub mod ttf;
pub mod tuv;

pub use dex::{ChatMessage, DexState, LiquidityPool, Order, OrderSide, Trade};
pub use ttf::{Future, Position, PositionSide, TtfState};
pub use tuv::{TuvState, Vault};
