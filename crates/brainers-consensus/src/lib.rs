//! brainers-consensus
//!
//! Validator selection and the block production loop. Selection is weighted
//! by stake × reputation and seeded from the previous block hash, so every
//! node that agrees on the chain agrees on the next validator.

pub mod producer;
pub mod selection;

pub use producer::BlockProducer;
pub use selection::select_validator;
