use brainers_core::canonical::sha256_bytes;
use brainers_core::error::LedgerError;
use brainers_core::types::{Address, ADDRESS_DIGEST_LEN, ADDRESS_PREFIX};

/// Derive an account address from a public key's DER SubjectPublicKeyInfo
/// encoding: `0xBrainers` + the first 34 characters of
/// base58(SHA-256(der)).
pub fn address_from_public_key_der(der: &[u8]) -> Address {
    let digest = sha256_bytes(der);
    let encoded = bs58::encode(digest).into_string();
    Address::new_unchecked(format!("{ADDRESS_PREFIX}{}", &encoded[..ADDRESS_DIGEST_LEN]))
}

/// Same derivation starting from the base58 form carried in transactions.
pub fn address_from_public_key_b58(b58: &str) -> Result<Address, LedgerError> {
    let der = bs58::decode(b58)
        .into_vec()
        .map_err(|_| LedgerError::InvalidSignature)?;
    Ok(address_from_public_key_der(&der))
}
