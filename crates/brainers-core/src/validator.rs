use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::constants::{MIN_STAKE, PERFORMANCE_HISTORY_LIMIT};
use crate::types::{Address, Amount, Timestamp};

/// A staked block producer.
///
/// `reputation ∈ [0, 1]` weights validator selection together with stake.
/// `is_active` implies `stake ≥ MIN_STAKE`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Validator {
    pub address: Address,
    pub stake: Amount,
    pub is_gift: bool,
    pub last_block_validated: u64,
    pub reputation: Amount,
    pub is_active: bool,
    pub total_rewards: Amount,
    pub performance_history: VecDeque<(Timestamp, Amount)>,
}

impl Validator {
    pub fn new(address: Address, stake: Amount, is_gift: bool) -> Self {
        Validator {
            address,
            stake,
            is_gift,
            last_block_validated: 0,
            reputation: Amount::from_int(1),
            is_active: true,
            total_rewards: Amount::zero(),
            performance_history: VecDeque::new(),
        }
    }

    /// Exponential smoothing: `new = old × 9/10 + performance × 1/10`.
    /// The history ring keeps the most recent 1000 samples.
    pub fn update_reputation(&mut self, performance: Amount, now: Timestamp) {
        self.reputation = self.reputation.clone() * Amount::ratio(9, 10)
            + performance.clone() * Amount::ratio(1, 10);
        self.performance_history.push_back((now, performance));
        while self.performance_history.len() > PERFORMANCE_HISTORY_LIMIT {
            self.performance_history.pop_front();
        }
    }

    pub fn add_reward(&mut self, amount: &Amount) {
        self.total_rewards += amount.clone();
    }

    /// Selection weight: stake × reputation.
    pub fn weight(&self) -> Amount {
        self.stake.clone() * self.reputation.clone()
    }

    pub fn is_eligible(&self) -> bool {
        self.is_active && self.stake >= *MIN_STAKE
    }

    pub fn average_performance(&self) -> Amount {
        if self.performance_history.is_empty() {
            return Amount::zero();
        }
        let sum: Amount = self
            .performance_history
            .iter()
            .map(|(_, p)| p.clone())
            .sum();
        sum / Amount::from_int(self.performance_history.len() as i64)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(stake: i64) -> Validator {
        Validator::new(
            Address::new_unchecked("0xBrainersVVVVVVVVVVVVVVVVVVVVVVVVVVVVVVVVVVVV"),
            Amount::from_int(stake),
            false,
        )
    }

    #[test]
    fn reputation_is_exponentially_smoothed() {
        let mut v = validator(10_000);
        v.update_reputation(Amount::from_int(1), 1);
        // 1 × 9/10 + 1 × 1/10 = 1
        assert_eq!(v.reputation, Amount::from_int(1));

        v.update_reputation(Amount::zero(), 2);
        assert_eq!(v.reputation, Amount::ratio(9, 10));

        v.update_reputation(Amount::from_int(1), 3);
        assert_eq!(v.reputation, Amount::ratio(91, 100));
    }

    #[test]
    fn history_ring_is_bounded() {
        let mut v = validator(10_000);
        for i in 0..(PERFORMANCE_HISTORY_LIMIT as i64 + 50) {
            v.update_reputation(Amount::from_int(1), i);
        }
        assert_eq!(v.performance_history.len(), PERFORMANCE_HISTORY_LIMIT);
        // Oldest entries dropped first.
        assert_eq!(v.performance_history.front().unwrap().0, 50);
    }

    #[test]
    fn eligibility_tracks_stake_floor() {
        let mut v = validator(10_000);
        assert!(v.is_eligible());
        v.stake = Amount::from_int(9_999);
        assert!(!v.is_eligible());
        v.stake = Amount::from_int(10_000);
        v.is_active = false;
        assert!(!v.is_eligible());
    }

    #[test]
    fn weight_is_stake_times_reputation() {
        let mut v = validator(10_000);
        v.reputation = Amount::ratio(1, 2);
        assert_eq!(v.weight(), Amount::from_int(5_000));
    }
}
