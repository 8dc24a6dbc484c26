pub mod block;
pub mod canonical;
pub mod constants;
pub mod contract;
pub mod error;
pub mod token;
pub mod transaction;
pub mod types;
pub mod validator;

pub use block::Block;
pub use canonical::{canonical_json, sha256_hex};
pub use constants::*;
pub use contract::SmartContract;
pub use error::LedgerError;
pub use token::Token;
pub use transaction::{Transaction, TxKind};
pub use types::*;
pub use validator::Validator;
