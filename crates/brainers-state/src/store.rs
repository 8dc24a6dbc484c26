use std::path::Path;

use sled::transaction::ConflictableTransactionResult;
use sled::Transactional;

use brainers_core::block::Block;
use brainers_core::canonical::canonical_json;
use brainers_core::error::LedgerError;
use brainers_core::transaction::Transaction;
use brainers_core::types::Address;

/// Persistent block log backed by sled. Values are canonical JSON.
///
/// Named trees:
///   blocks       — block hash  → canonical block JSON
///   block_index  — height (BE) → block hash
///   transactions — tx hash     → {"block_hash": …, "transaction": …}
///   state_roots  — height (BE) → state root hex
///   meta         — "tip_height" / "tip_hash"
///
/// A block and all its transactions land in one multi-tree transaction; a
/// torn commit is impossible.
pub struct Store {
    db: sled::Db,
    blocks: sled::Tree,
    block_index: sled::Tree,
    transactions: sled::Tree,
    state_roots: sled::Tree,
    meta: sled::Tree,
}

fn store_err(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::StoreFailure(e.to_string())
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let db = sled::open(path).map_err(store_err)?;
        let blocks = db.open_tree("blocks").map_err(store_err)?;
        let block_index = db.open_tree("block_index").map_err(store_err)?;
        let transactions = db.open_tree("transactions").map_err(store_err)?;
        let state_roots = db.open_tree("state_roots").map_err(store_err)?;
        let meta = db.open_tree("meta").map_err(store_err)?;
        Ok(Store { db, blocks, block_index, transactions, state_roots, meta })
    }

    pub fn is_empty(&self) -> bool {
        self.block_index.is_empty()
    }

    // ── Commit ───────────────────────────────────────────────────────────────

    /// Atomically persist a block, its transactions, and the post-block
    /// state root, and advance the tip.
    pub fn commit_block(&self, block: &Block, state_root: &str) -> Result<(), LedgerError> {
        let block_json = canonical_json(block)?;
        let mut tx_entries = Vec::with_capacity(block.transactions.len());
        for tx in &block.transactions {
            let entry = canonical_json(&serde_json::json!({
                "block_hash": block.hash,
                "transaction": tx,
            }))?;
            tx_entries.push((tx.hash.clone(), entry));
        }
        let height = block.index.to_be_bytes();

        (
            &self.blocks,
            &self.block_index,
            &self.transactions,
            &self.state_roots,
            &self.meta,
        )
            .transaction(
                |(blocks, index, txs, roots, meta)| -> ConflictableTransactionResult<(), String> {
                    blocks.insert(block.hash.as_bytes(), block_json.as_bytes())?;
                    index.insert(&height[..], block.hash.as_bytes())?;
                    for (hash, entry) in &tx_entries {
                        txs.insert(hash.as_bytes(), entry.as_bytes())?;
                    }
                    roots.insert(&height[..], state_root.as_bytes())?;
                    meta.insert("tip_height".as_bytes(), &height[..])?;
                    meta.insert("tip_hash".as_bytes(), block.hash.as_bytes())?;
                    Ok(())
                },
            )
            .map_err(store_err)?;
        Ok(())
    }

    // ── Blocks ───────────────────────────────────────────────────────────────

    pub fn block_by_hash(&self, hash: &str) -> Result<Option<Block>, LedgerError> {
        match self.blocks.get(hash.as_bytes()).map_err(store_err)? {
            Some(bytes) => Ok(Some(parse_json(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn block_by_height(&self, height: u64) -> Result<Option<Block>, LedgerError> {
        match self
            .block_index
            .get(height.to_be_bytes())
            .map_err(store_err)?
        {
            Some(hash) => {
                let hash = String::from_utf8_lossy(&hash).to_string();
                self.block_by_hash(&hash)
            }
            None => Ok(None),
        }
    }

    /// Current tip as `(height, hash)`, if any block has been committed.
    pub fn tip(&self) -> Result<Option<(u64, String)>, LedgerError> {
        let height = match self.meta.get("tip_height").map_err(store_err)? {
            Some(bytes) => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(&bytes);
                u64::from_be_bytes(arr)
            }
            None => return Ok(None),
        };
        let hash = self
            .meta
            .get("tip_hash")
            .map_err(store_err)?
            .map(|b| String::from_utf8_lossy(&b).to_string())
            .ok_or_else(|| LedgerError::StoreFailure("tip hash missing".into()))?;
        Ok(Some((height, hash)))
    }

    /// All blocks with index strictly greater than `after`, in chain order.
    /// `after = -1` returns the whole chain.
    pub fn blocks_after(&self, after: i64) -> Result<Vec<Block>, LedgerError> {
        let Some((tip, _)) = self.tip()? else {
            return Ok(Vec::new());
        };
        let start = if after < 0 { 0 } else { after as u64 + 1 };
        let mut out = Vec::new();
        for height in start..=tip {
            match self.block_by_height(height)? {
                Some(block) => out.push(block),
                None => {
                    return Err(LedgerError::StoreFailure(format!(
                        "block index has a hole at height {height}"
                    )))
                }
            }
        }
        Ok(out)
    }

    // ── Transactions ─────────────────────────────────────────────────────────

    /// Look up a committed transaction; returns `(block_hash, transaction)`.
    pub fn transaction(&self, hash: &str) -> Result<Option<(String, Transaction)>, LedgerError> {
        match self.transactions.get(hash.as_bytes()).map_err(store_err)? {
            Some(bytes) => {
                let entry: serde_json::Value = parse_json(&bytes)?;
                let block_hash = entry["block_hash"]
                    .as_str()
                    .ok_or_else(|| LedgerError::StoreFailure("malformed tx entry".into()))?
                    .to_string();
                let tx: Transaction = serde_json::from_value(entry["transaction"].clone())
                    .map_err(|e| LedgerError::Serialization(e.to_string()))?;
                Ok(Some((block_hash, tx)))
            }
            None => Ok(None),
        }
    }

    /// Every committed transaction touching `address`, in chain order.
    pub fn history(&self, address: &Address) -> Result<Vec<Transaction>, LedgerError> {
        let mut out = Vec::new();
        for block in self.blocks_after(-1)? {
            for tx in block.transactions {
                if &tx.sender == address || &tx.recipient == address {
                    out.push(tx);
                }
            }
        }
        Ok(out)
    }

    // ── State roots ──────────────────────────────────────────────────────────

    pub fn state_root_at(&self, height: u64) -> Result<Option<String>, LedgerError> {
        Ok(self
            .state_roots
            .get(height.to_be_bytes())
            .map_err(store_err)?
            .map(|b| String::from_utf8_lossy(&b).to_string()))
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), LedgerError> {
        self.db.flush().map_err(store_err)?;
        Ok(())
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, LedgerError> {
    serde_json::from_slice(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
}

// ── Tests ────────────────────────────────────────────────────────────────────
