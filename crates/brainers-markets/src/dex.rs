use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use brainers_core::constants::{CHAT_LOG_LIMIT, DEX_FEE_RATE};
use brainers_core::types::{Address, Amount, Timestamp, TokenId};

// ── Pools ────────────────────────────────────────────────────────────────────

/// The two sides of a token's liquidity pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LiquidityPool {
    pub brainers: Amount,
    pub token: Amount,
}

impl LiquidityPool {
    pub fn empty() -> Self {
        LiquidityPool { brainers: Amount::zero(), token: Amount::zero() }
    }

    pub fn total_liquidity(&self) -> Amount {
        self.brainers.clone() + self.token.clone()
    }
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// A resting limit order. `price` is BRAINERS per token unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub trader: Address,
    pub side: OrderSide,
    pub amount: Amount,
    pub price: Amount,
    pub timestamp: Timestamp,
}

/// One fill produced by matching. The fee is the full 3/1000 of the BRAINERS
/// leg; settlement splits it equally between the two sides.
#[derive(Clone, Debug)]
pub struct Trade {
    pub buyer: Address,
    pub seller: Address,
    pub token_amount: Amount,
    pub price: Amount,
    pub brainers_amount: Amount,
    pub fee: Amount,
}

/// Cross the book for one token.
///
/// Buys sort by price descending, sells ascending; the sort is stable, so
/// equal prices keep arrival order (earliest timestamp first). While the top
/// buy crosses the top sell, they trade at the price midpoint for the
/// smaller of the two amounts. Emptied orders drop; the canonical book is
/// rewritten as the surviving buys followed by the surviving sells.
pub fn match_orders(book: &mut Vec<Order>) -> Vec<Trade> {
    let (mut buys, mut sells): (Vec<Order>, Vec<Order>) =
        book.drain(..).partition(|o| o.side == OrderSide::Buy);
    buys.sort_by(|a, b| b.price.cmp(&a.price));
    sells.sort_by(|a, b| a.price.cmp(&b.price));

    let mut trades = Vec::new();
    while !buys.is_empty() && !sells.is_empty() && buys[0].price >= sells[0].price {
        let price = (buys[0].price.clone() + sells[0].price.clone()) / Amount::from_int(2);
        let amount = buys[0].amount.clone().min(sells[0].amount.clone());
        let brainers_amount = amount.clone() * price.clone();
        let fee = brainers_amount.clone() * DEX_FEE_RATE.clone();

        trades.push(Trade {
            buyer: buys[0].trader.clone(),
            seller: sells[0].trader.clone(),
            token_amount: amount.clone(),
            price,
            brainers_amount,
            fee,
        });

        buys[0].amount -= amount.clone();
        sells[0].amount -= amount;
        if buys[0].amount.is_zero() {
            buys.remove(0);
        }
        if sells[0].amount.is_zero() {
            sells.remove(0);
        }
    }

    book.extend(buys);
    book.extend(sells);
    trades
}

// ── Chat ─────────────────────────────────────────────────────────────────────

/// A token-room chat line. No economic weight.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Address,
    pub message: String,
    pub timestamp: Timestamp,
}

// ── DexState ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DexState {
    pub pools: BTreeMap<TokenId, LiquidityPool>,
    pub orders: BTreeMap<TokenId, Vec<Order>>,
    pub trading_start: BTreeMap<TokenId, Timestamp>,
    pub chat: BTreeMap<TokenId, VecDeque<ChatMessage>>,
}

impl DexState {
    pub fn pool(&self, token: &str) -> Option<&LiquidityPool> {
        self.pools.get(token)
    }

    /// Trading is open once `now` reaches the recorded start; tokens with no
    /// recorded start have never been gated.
    pub fn trading_open(&self, token: &str, now: Timestamp) -> bool {
        self.trading_start.get(token).map_or(true, |start| now >= *start)
    }

    pub fn push_chat(&mut self, token: &str, message: ChatMessage) {
        let room = self.chat.entry(token.to_string()).or_default();
        room.push_back(message);
        while room.len() > CHAT_LOG_LIMIT {
            room.pop_front();
        }
    }

    pub fn chat_tail(&self, token: &str, limit: usize) -> Vec<ChatMessage> {
        match self.chat.get(token) {
            Some(room) => room
                .iter()
                .skip(room.len().saturating_sub(limit))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn pool_info(&self, token: &str) -> Option<PoolInfo> {
        self.pools.get(token).map(|pool| PoolInfo {
            token: token.to_string(),
            brainers: pool.brainers.clone(),
            token_reserve: pool.token.clone(),
            total_liquidity: pool.total_liquidity(),
            trading_start: self.trading_start.get(token).copied(),
        })
    }

    pub fn order_book(&self, token: &str) -> OrderBookView {
        let orders = self.orders.get(token).map(Vec::as_slice).unwrap_or(&[]);
        OrderBookView {
            buy_orders: orders
                .iter()
                .filter(|o| o.side == OrderSide::Buy)
                .cloned()
                .collect(),
            sell_orders: orders
                .iter()
                .filter(|o| o.side == OrderSide::Sell)
                .cloned()
                .collect(),
        }
    }
}

// ── Query views ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize)]
pub struct PoolInfo {
    pub token: TokenId,
    pub brainers: Amount,
    pub token_reserve: Amount,
    pub total_liquidity: Amount,
    pub trading_start: Option<Timestamp>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderBookView {
    pub buy_orders: Vec<Order>,
    pub sell_orders: Vec<Order>,
}

// ── Tests ────────────────────────────────────────────────────────────────────
