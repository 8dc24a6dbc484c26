//! keygen — generate a Brainers wallet keypair.
//!
//! Prints the derived address, the base58 public key carried in signed
//! transactions, and the PKCS#8 PEM private key. Keep the PEM safe; it is
//! shown exactly once.

use brainers_crypto::KeyPair;

fn main() -> anyhow::Result<()> {
    let kp = KeyPair::generate();
    println!("address:    {}", kp.address);
    println!("public key: {}", kp.public_key_b58());
    println!();
    print!("{}", kp.to_pkcs8_pem()?);
    Ok(())
}
