use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;

use brainers_core::error::LedgerError;
use brainers_core::types::Address;

use crate::hash::address_from_public_key_der;

/// A P-256 keypair with its derived Brainers address.
pub struct KeyPair {
    signing_key: SigningKey,
    public_key_der: Vec<u8>,
    pub address: Address,
}

impl KeyPair {
    /// Generate a fresh keypair from the OS entropy source.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    /// Restore a keypair from a PKCS#8 PEM private key (wallet files).
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, LedgerError> {
        let signing_key = SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| LedgerError::Serialization(format!("private key: {e}")))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        let public_key_der = verifying_key
            .to_public_key_der()
            .expect("P-256 SPKI encoding is infallible")
            .as_bytes()
            .to_vec();
        let address = address_from_public_key_der(&public_key_der);
        KeyPair { signing_key, public_key_der, address }
    }

    /// DER SubjectPublicKeyInfo bytes of the public key.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Base58 form of the DER public key, as carried in transactions.
    pub fn public_key_b58(&self) -> String {
        bs58::encode(&self.public_key_der).into_string()
    }

    /// PKCS#8 PEM export of the private key.
    pub fn to_pkcs8_pem(&self) -> Result<String, LedgerError> {
        self.signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map(|z| z.to_string())
            .map_err(|e| LedgerError::Serialization(format!("private key: {e}")))
    }

    /// Sign `message`, returning the base58 of the DER-encoded signature.
    pub fn sign(&self, message: &[u8]) -> String {
        let signature: Signature = self.signing_key.sign(message);
        bs58::encode(signature.to_der().as_bytes()).into_string()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ address: {} }}", self.address)
    }
}

/// Verify a base58 DER signature over `message` under a DER-encoded public
/// key. Fails with `InvalidSignature` on any decode or verification error.
pub fn verify_signature(
    public_key_der: &[u8],
    message: &[u8],
    signature_b58: &str,
) -> Result<(), LedgerError> {
    let verifying_key = VerifyingKey::from_public_key_der(public_key_der)
        .map_err(|_| LedgerError::InvalidSignature)?;
    let der = bs58::decode(signature_b58)
        .into_vec()
        .map_err(|_| LedgerError::InvalidSignature)?;
    let signature = Signature::from_der(&der).map_err(|_| LedgerError::InvalidSignature)?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| LedgerError::InvalidSignature)
}

// ── Tests ────────────────────────────────────────────────────────────────────
