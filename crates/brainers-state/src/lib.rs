//! brainers-state
//!
//! The ledger engine: persistent store, in-memory world state, mempool, and
//! the state-transition function. All mutation funnels through a single
//! engine-wide critical section; block commits are atomic (the world is
//! cloned, transformed, persisted, then swapped).

pub mod engine;
pub mod mempool;
pub mod runtime;
pub mod store;
pub mod world;

pub use engine::{apply_transaction, ChainSummary, Engine, IngestOutcome};
pub use mempool::{suggested_fee, Mempool};
pub use runtime::{ContractRuntime, ExecutionContext, NoopRuntime};
pub use store::Store;
pub use world::WorldState;
