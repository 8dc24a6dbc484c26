use serde_json::Value;
use tracing::debug;

use brainers_core::contract::SmartContract;
use brainers_core::error::LedgerError;
use brainers_core::token::Token;
use brainers_core::transaction::Transaction;
use brainers_core::types::{Address, Amount};

use crate::world::WorldState;

/// The capability handed to a contract during execution: read-only world
/// queries plus a transaction-emit buffer. Emitted transactions go through
/// normal mempool admission after the enclosing block commits.
pub struct ExecutionContext<'a> {
    world: &'a WorldState,
    pub caller: Address,
    emitted: Vec<Transaction>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(world: &'a WorldState, caller: Address) -> Self {
        ExecutionContext { world, caller, emitted: Vec::new() }
    }

    pub fn balance(&self, address: &Address, token: &str) -> Amount {
        self.world.balance(address, token)
    }

    pub fn token(&self, id: &str) -> Option<&Token> {
        self.world.tokens.get(id)
    }

    pub fn emit(&mut self, tx: Transaction) {
        self.emitted.push(tx);
    }

    pub fn into_emitted(self) -> Vec<Transaction> {
        self.emitted
    }
}

/// The sandboxed contract execution environment, seen from the engine.
///
/// The core only reserves this hook; a real sandbox is an external
/// collaborator wired in at node startup.
pub trait ContractRuntime: Send + Sync {
    fn execute(
        &self,
        contract: &SmartContract,
        method: &str,
        params: &serde_json::Map<String, Value>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Value, LedgerError>;
}

/// Default runtime: accepts registrations, executes nothing.
pub struct NoopRuntime;

impl ContractRuntime for NoopRuntime {
    fn execute(
        &self,
        contract: &SmartContract,
        method: &str,
        _params: &serde_json::Map<String, Value>,
        _ctx: &mut ExecutionContext<'_>,
    ) -> Result<Value, LedgerError> {
        debug!(contract = %contract.address, method, "contract execution is a no-op");
        Ok(Value::Null)
    }
}
