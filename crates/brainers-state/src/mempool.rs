use std::collections::{HashSet, VecDeque};

use brainers_core::constants::{MAX_FEE, MIN_FEE};
use brainers_core::error::LedgerError;
use brainers_core::transaction::Transaction;
use brainers_core::types::Amount;

/// FIFO pool of admitted, not-yet-committed transactions, deduplicated by
/// hash. Admission validation happens in the engine; the pool only orders
/// and deduplicates.
#[derive(Debug, Default)]
pub struct Mempool {
    queue: VecDeque<Transaction>,
    seen: HashSet<String>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tx: Transaction) -> Result<(), LedgerError> {
        if !self.seen.insert(tx.hash.clone()) {
            return Err(LedgerError::DuplicateTransaction(tx.hash));
        }
        self.queue.push_back(tx);
        Ok(())
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.seen.contains(hash)
    }

    /// Pop up to `max` transactions from the head, FIFO.
    pub fn drain(&mut self, max: usize) -> Vec<Transaction> {
        let take = max.min(self.queue.len());
        let drained: Vec<Transaction> = self.queue.drain(..take).collect();
        for tx in &drained {
            self.seen.remove(&tx.hash);
        }
        drained
    }

    /// Remove everything; used when re-validating the pool after a commit.
    pub fn take_all(&mut self) -> Vec<Transaction> {
        self.seen.clear();
        self.queue.drain(..).collect()
    }

    /// Drop entries that were committed in a block received from elsewhere.
    pub fn remove_committed(&mut self, hashes: &[String]) {
        if hashes.is_empty() {
            return;
        }
        let committed: HashSet<&String> = hashes.iter().collect();
        self.queue.retain(|tx| !committed.contains(&tx.hash));
        for h in hashes {
            self.seen.remove(h);
        }
    }

    pub fn depth(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// The deterministic fee curve:
/// `clamp(MIN_FEE × (3/2)^⌊depth/1000⌋, MIN_FEE, MAX_FEE)`.
///
/// Every node runs the same formula, but mempool depths differ between
/// nodes — validation therefore always uses the fee carried by the
/// transaction, never a recomputation.
pub fn suggested_fee(depth: usize) -> Amount {
    let steps = (depth / 1000) as i32;
    let fee = MIN_FEE.clone() * Amount::ratio(3, 2).pow(steps);
    fee.clamp(MIN_FEE.clone(), MAX_FEE.clone())
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use brainers_core::transaction::TxKind;
    use brainers_core::types::{Address, ZERO_ADDRESS};

    fn tx(n: i64) -> Transaction {
        Transaction::new(
            ZERO_ADDRESS.clone(),
            Address::new_unchecked("0xBrainersRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRR"),
            Amount::from_int(n),
            TxKind::Transfer,
            Amount::zero(),
            serde_json::Map::new(),
            n,
        )
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut pool = Mempool::new();
        pool.insert(tx(1)).unwrap();
        assert!(matches!(
            pool.insert(tx(1)),
            Err(LedgerError::DuplicateTransaction(_))
        ));
        assert_eq!(pool.depth(), 1);
    }

    #[test]
    fn drain_is_fifo_and_bounded() {
        let mut pool = Mempool::new();
        for i in 0..5 {
            pool.insert(tx(i)).unwrap();
        }
        let first = pool.drain(3);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].amount, Amount::from_int(0));
        assert_eq!(first[2].amount, Amount::from_int(2));
        assert_eq!(pool.depth(), 2);
        assert!(!pool.contains(&first[0].hash));
    }

    #[test]
    fn remove_committed_clears_entries() {
        let mut pool = Mempool::new();
        let a = tx(1);
        let b = tx(2);
        pool.insert(a.clone()).unwrap();
        pool.insert(b.clone()).unwrap();
        pool.remove_committed(&[a.hash.clone()]);
        assert_eq!(pool.depth(), 1);
        assert!(!pool.contains(&a.hash));
        assert!(pool.contains(&b.hash));
    }

    #[test]
    fn fee_curve_floors_steps_and_clamps() {
        assert_eq!(suggested_fee(0), Amount::ratio(1, 1000));
        assert_eq!(suggested_fee(999), Amount::ratio(1, 1000));
        assert_eq!(suggested_fee(1000), Amount::ratio(3, 2000));
        assert_eq!(suggested_fee(2000), Amount::ratio(9, 4000));
        // (3/2)^6 × 1/1000 > 1/100 → clamped to MAX_FEE.
        assert_eq!(suggested_fee(6000), Amount::ratio(1, 100));
        assert_eq!(suggested_fee(1_000_000), Amount::ratio(1, 100));
    }
}
