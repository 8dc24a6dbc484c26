//! brainers-crypto
//!
//! ECDSA over NIST P-256 with SHA-256, plus the canonical address
//! derivation. Signatures are DER-encoded and carried base58; public keys
//! travel as base58 of their DER SubjectPublicKeyInfo encoding.

pub mod hash;
pub mod keypair;

pub use hash::{address_from_public_key_der, address_from_public_key_b58};
pub use keypair::{verify_signature, KeyPair};
