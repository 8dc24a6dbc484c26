use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Address;

/// A registered user contract: code plus its declared ABI
/// (method name → signature). Execution happens through the engine's
/// `ContractRuntime` hook; the ledger core only stores the registration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SmartContract {
    pub address: Address,
    pub creator: Address,
    pub code: String,
    pub abi: BTreeMap<String, String>,
}

impl SmartContract {
    pub fn new(
        address: Address,
        creator: Address,
        code: String,
        abi: BTreeMap<String, String>,
    ) -> Self {
        SmartContract { address, creator, code, abi }
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.abi.contains_key(method)
    }
}
