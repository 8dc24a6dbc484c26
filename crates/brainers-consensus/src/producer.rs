use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use brainers_core::block::Block;
use brainers_state::Engine;

use crate::selection::select_validator;

/// How long the producer sleeps when there is nothing to do. The protocol's
/// target block time is below wall-clock resolution, so production runs
/// back-to-back whenever the mempool is non-empty and only idles here.
const IDLE_TICK: Duration = Duration::from_millis(200);

/// The block production loop:
/// idle → selecting → assembling → committing → broadcasting → idle.
///
/// Selection and commit happen inside the engine's critical section
/// (`Engine::produce_block`); this task drives the cycle and hands committed
/// blocks to the gossip layer. Production aborts back to idle when the
/// mempool is empty or no validator is eligible.
pub struct BlockProducer {
    engine: Arc<Engine>,
    blocks_out: mpsc::Sender<Block>,
}

impl BlockProducer {
    pub fn new(engine: Arc<Engine>, blocks_out: mpsc::Sender<Block>) -> Self {
        BlockProducer { engine, blocks_out }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("block producer started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let now = chrono::Utc::now().timestamp_micros();
            match self.engine.produce_block(now, select_validator) {
                Ok(Some(block)) => {
                    debug!(height = block.index, txs = block.transactions.len(), "produced block");
                    if self.blocks_out.send(block).await.is_err() {
                        break;
                    }
                    // Fast drain: go straight back for the next block.
                }
                Ok(None) => {
                    tokio::select! {
                        _ = tokio::time::sleep(IDLE_TICK) => {}
                        _ = shutdown.changed() => {}
                    }
                }
                Err(e) => {
                    error!(error = %e, "block production failed; producer stopped");
                    break;
                }
            }
        }
        info!("block producer stopped");
    }
}
