//! Chain synchronization: a fresh node catches up to a peer at height N
//! through the sync_request / sync_response path and lands on the same
//! state root.
//!
//! Run with:
//!   cargo test -p brainers-node --test sync

use std::sync::Arc;

use brainers_core::constants::MICROS_PER_SEC;
use brainers_core::transaction::{Transaction, TxKind};
use brainers_core::types::{Amount, Timestamp};
use brainers_crypto::KeyPair;
use brainers_genesis::{apply_genesis, GenesisParams};
use brainers_p2p::PeerMessage;
use brainers_state::{Engine, IngestOutcome, NoopRuntime, Store};

const T0: Timestamp = 1_700_000_000 * MICROS_PER_SEC;

fn new_engine(dir: &std::path::Path) -> Arc<Engine> {
    let store = Store::open(dir).expect("open store");
    Arc::new(Engine::open(store, Box::new(NoopRuntime)).expect("open engine"))
}

/// Build a chain of `extra` transfer blocks on top of genesis.
fn build_chain(engine: &Engine, reserve: &KeyPair, extra: u64) {
    let producer = KeyPair::generate();
    for i in 0..extra {
        let ts = T0 + 1 + i as i64;
        let mut tx = Transaction::new(
            reserve.address.clone(),
            KeyPair::generate().address,
            Amount::from_int(1),
            TxKind::Transfer,
            Amount::ratio(1, 1000),
            serde_json::Map::new(),
            ts,
        );
        tx.signature = reserve.sign(tx.signing_bytes());
        tx.public_key = Some(reserve.public_key_b58());
        engine.admit_transaction(tx, ts).unwrap();
        engine
            .produce_block(ts, |_, _, _| Some(producer.address.clone()))
            .unwrap()
            .expect("block");
    }
}

#[test]
fn fresh_node_syncs_full_chain_to_identical_root() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let node_a = new_engine(dir_a.path());
    let node_b = new_engine(dir_b.path());

    let (params, keys) = GenesisParams::generate_ephemeral(T0);
    apply_genesis(&node_a, &params).unwrap();
    let reserve = &keys.iter().find(|(n, _)| n == "Reserve").unwrap().1;
    build_chain(&node_a, reserve, 5);
    assert_eq!(node_a.tip_index(), 5);

    // B hears about A's tip block first: too far ahead, so B must sync.
    let tip_block = node_a.blocks_after(4).unwrap().remove(0);
    assert_eq!(
        node_b.ingest_block(tip_block).unwrap(),
        IngestOutcome::AheadOfTip { local_tip: -1 }
    );

    // The gap travels as one sync_response frame over the wire format.
    let response = PeerMessage::SyncResponse {
        blocks: node_a.blocks_after(node_b.tip_index()).unwrap(),
    };
    let PeerMessage::SyncResponse { blocks } =
        PeerMessage::from_text(&response.to_text()).unwrap()
    else {
        panic!("wrong frame");
    };
    assert_eq!(blocks.len(), 6);

    for block in blocks {
        assert_eq!(node_b.ingest_block(block).unwrap(), IngestOutcome::Committed);
    }

    assert_eq!(node_b.tip_index(), node_a.tip_index());
    assert_eq!(node_b.state_root(), node_a.state_root());

    // Both nodes recorded identical per-height roots along the way.
    for height in 0..=5u64 {
        assert_eq!(
            node_a.state_root_at(height).unwrap(),
            node_b.state_root_at(height).unwrap(),
            "state root at height {height}"
        );
    }
}

#[test]
fn partial_sync_resumes_from_local_tip() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let node_a = new_engine(dir_a.path());
    let node_b = new_engine(dir_b.path());

    let (params, keys) = GenesisParams::generate_ephemeral(T0);
    apply_genesis(&node_a, &params).unwrap();
    let reserve = &keys.iter().find(|(n, _)| n == "Reserve").unwrap().1;
    build_chain(&node_a, reserve, 4);

    // B already holds the first three blocks.
    for block in node_a.blocks_after(-1).unwrap().into_iter().take(3) {
        node_b.ingest_block(block).unwrap();
    }
    assert_eq!(node_b.tip_index(), 2);

    // Syncing strictly after B's tip delivers exactly the missing suffix.
    let missing = node_a.blocks_after(node_b.tip_index()).unwrap();
    assert_eq!(missing.len(), 2);
    for block in missing {
        assert_eq!(node_b.ingest_block(block).unwrap(), IngestOutcome::Committed);
    }
    assert_eq!(node_b.state_root(), node_a.state_root());
}
