use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use brainers_core::constants::{LIQUIDATION_THRESHOLD, MICROS_PER_SEC};
use brainers_core::types::{Address, Amount, Timestamp, TokenId};

// ── Futures ──────────────────────────────────────────────────────────────────

/// A tradable future anchored to a token's liquidity pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Future {
    pub id: String,
    pub token: TokenId,
    pub creator: Address,
    pub created_at: Timestamp,
}

/// `TTF-<token>-<creation seconds>`.
pub fn future_id(token: &str, now: Timestamp) -> String {
    format!("TTF-{}-{}", token, now / MICROS_PER_SEC)
}

// ── Positions ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    Long,
    Short,
}

/// An open leveraged position. `collateral = amount / leverage` is locked in
/// the TTF sink at open.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub future_id: String,
    pub trader: Address,
    pub side: PositionSide,
    pub amount: Amount,
    pub leverage: u32,
    pub collateral: Amount,
    pub open_price: Amount,
    pub opened_at: Timestamp,
}

/// `pnl = amount × leverage × (close − open)`, negated for shorts.
pub fn pnl(position: &Position, close_price: &Amount) -> Amount {
    let diff = match position.side {
        PositionSide::Long => close_price.clone() - position.open_price.clone(),
        PositionSide::Short => position.open_price.clone() - close_price.clone(),
    };
    position.amount.clone() * Amount::from_int(position.leverage as i64) * diff
}

/// Liquidate once the loss reaches 80% of posted collateral.
pub fn should_liquidate(position: &Position, price: &Amount) -> bool {
    pnl(position, price) <= -(position.collateral.clone() * LIQUIDATION_THRESHOLD.clone())
}

// ── TtfState ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TtfState {
    pub futures: BTreeMap<String, Future>,
    pub positions: BTreeMap<String, Position>,
    pub oracle_prices: BTreeMap<TokenId, Amount>,
    /// Monotonic counter backing stable position ids.
    pub position_seq: u64,
}

impl TtfState {
    /// Oracle price for a token; 1 until a price is submitted.
    pub fn oracle_price(&self, token: &str) -> Amount {
        self.oracle_prices
            .get(token)
            .cloned()
            .unwrap_or_else(|| Amount::from_int(1))
    }

    /// Allocate the next stable position id for a future.
    pub fn next_position_id(&mut self, future_id: &str) -> String {
        self.position_seq += 1;
        format!("POS-{}-{}", future_id, self.position_seq)
    }

    /// Ids of every open position whose future references `token`.
    pub fn position_ids_for_token(&self, token: &str) -> Vec<String> {
        self.positions
            .values()
            .filter(|p| {
                self.futures
                    .get(&p.future_id)
                    .map_or(false, |f| f.token == token)
            })
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn positions_for_trader(&self, trader: &Address) -> Vec<&Position> {
        self.positions.values().filter(|p| &p.trader == trader).collect()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn position(side: PositionSide, amount: i64, leverage: u32, open: i64) -> Position {
        Position {
            id: "POS-TTF-x-1".into(),
            future_id: "TTF-x-0".into(),
            trader: Address::new_unchecked("0xBrainersTRADERXXXXXXXXXXXXXXXXXXXXXXXXXXXXX"),
            side,
            amount: Amount::from_int(amount),
            leverage,
            collateral: Amount::from_int(amount) / Amount::from_int(leverage as i64),
            open_price: Amount::from_int(open),
            opened_at: 0,
        }
    }

    #[test]
    fn long_pnl_follows_price() {
        let p = position(PositionSide::Long, 100, 5, 10);
        assert_eq!(pnl(&p, &Amount::from_int(12)), Amount::from_int(1000));
        assert_eq!(pnl(&p, &Amount::from_int(8)), Amount::from_int(-1000));
    }

    #[test]
    fn short_pnl_is_inverted() {
        let p = position(PositionSide::Short, 100, 5, 10);
        assert_eq!(pnl(&p, &Amount::from_int(8)), Amount::from_int(1000));
        assert_eq!(pnl(&p, &Amount::from_int(12)), Amount::from_int(-1000));
    }

    #[test]
    fn liquidation_at_eighty_percent_of_collateral() {
        // amount 100, leverage 5 → collateral 20; threshold loss = 16.
        // pnl = 500 × diff, so diff = -16/500 = -4/125 liquidates.
        let p = position(PositionSide::Long, 100, 5, 10);
        let breach = Amount::from_int(10) - Amount::ratio(4, 125);
        let safe = Amount::from_int(10) - Amount::ratio(3, 125);
        assert!(should_liquidate(&p, &breach));
        assert!(!should_liquidate(&p, &safe));
    }

    #[test]
    fn oracle_defaults_to_one() {
        let ttf = TtfState::default();
        assert_eq!(ttf.oracle_price("0xBrainersT"), Amount::from_int(1));
    }

    #[test]
    fn position_ids_are_stable_and_unique() {
        let mut ttf = TtfState::default();
        let a = ttf.next_position_id("TTF-t-1");
        let b = ttf.next_position_id("TTF-t-1");
        assert_ne!(a, b);
        assert!(a.starts_with("POS-TTF-t-1-"));
    }

    #[test]
    fn future_id_uses_seconds() {
        assert_eq!(future_id("0xBrainersT", 5 * MICROS_PER_SEC), "TTF-0xBrainersT-5");
    }
}
