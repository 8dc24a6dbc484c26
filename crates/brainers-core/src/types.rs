use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::LedgerError;

/// Microseconds since the Unix epoch (UTC). Canonicalized identically across
/// all nodes; protocol constants given in seconds convert through
/// [`crate::constants::MICROS_PER_SEC`].
pub type Timestamp = i64;

/// Identifier of a fungible asset: the literal `"BRAINERS"` for the native
/// token, a derived `0xBrainers…` address for everything else.
pub type TokenId = String;

// ── Amount ───────────────────────────────────────────────────────────────────

/// An exact rational quantity. All balances, fees, stakes, and prices are
/// `Amount`s — no binary floating point ever touches value.
///
/// The canonical serialized form is the string `"num/den"`, or `"num"` when
/// the denominator is 1. Construction always reduces.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(BigRational);

impl Amount {
    pub fn zero() -> Self {
        Amount(BigRational::zero())
    }

    pub fn from_int(n: i64) -> Self {
        Amount(BigRational::from_integer(BigInt::from(n)))
    }

    /// `num/den`, reduced. Panics on a zero denominator (a programming error).
    pub fn ratio(num: i64, den: i64) -> Self {
        Amount(BigRational::new(BigInt::from(num), BigInt::from(den)))
    }

    pub fn from_rational(r: BigRational) -> Self {
        Amount(r)
    }

    pub fn inner(&self) -> &BigRational {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    /// Integer exponentiation; negative exponents invert.
    pub fn pow(&self, expo: i32) -> Self {
        Amount(self.0.pow(expo))
    }

    pub fn abs(&self) -> Self {
        Amount(self.0.abs())
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Ratio renders "num/den", or just "num" when den == 1.
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

impl FromStr for Amount {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigRational::from_str(s)
            .map(Amount)
            .map_err(|_| LedgerError::InvalidAmount(s.to_string()))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;
    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl Mul for Amount {
    type Output = Amount;
    fn mul(self, rhs: Amount) -> Amount {
        Amount(self.0 * rhs.0)
    }
}

impl Div for Amount {
    type Output = Amount;
    fn div(self, rhs: Amount) -> Amount {
        Amount(self.0 / rhs.0)
    }
}

impl Neg for Amount {
    type Output = Amount;
    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Amount) {
        self.0 -= rhs.0;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::zero(), |acc, x| acc + x)
    }
}

// ── Address ──────────────────────────────────────────────────────────────────

/// Prefix shared by every derived Brainers address.
pub const ADDRESS_PREFIX: &str = "0xBrainers";

/// Characters of the base58 (or hex, for tokens) digest kept after the prefix.
pub const ADDRESS_DIGEST_LEN: usize = 34;

/// The zero address: sender of genesis and reward transactions, recipient of
/// burns.
pub static ZERO_ADDRESS: Lazy<Address> = Lazy::new(|| Address("0".repeat(40)));

/// Sink account holding DEX pool liquidity.
pub static DEX_ADDRESS: Lazy<Address> = Lazy::new(|| Address("0xBrainersDEX".into()));

/// Sink account holding TTF collateral and seized liquidations.
pub static TTF_ADDRESS: Lazy<Address> = Lazy::new(|| Address("0xBrainersTTF".into()));

/// Sink account holding TUV escrowed tokens.
pub static TUV_ADDRESS: Lazy<Address> = Lazy::new(|| Address("0xBrainersTUV".into()));

/// A Brainers account address.
///
/// Derived addresses are `0xBrainers` followed by the first 34 characters of
/// the base58 encoding of SHA-256 over the subject public-key DER encoding.
/// The zero address and the three sub-ledger sinks are reserved.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Wrap a string known to be a valid address (derivation, constants,
    /// trusted storage). External input goes through [`Address::parse`].
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Address(s.into())
    }

    /// Validate the shape of an externally supplied address.
    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        let candidate = Address(s.to_string());
        if candidate.is_zero() || candidate.is_reserved() {
            return Ok(candidate);
        }
        let derived_len = ADDRESS_PREFIX.len() + ADDRESS_DIGEST_LEN;
        if s.len() == derived_len
            && s.starts_with(ADDRESS_PREFIX)
            && s[ADDRESS_PREFIX.len()..].chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Ok(candidate);
        }
        Err(LedgerError::InvalidAddress(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn zero() -> Self {
        ZERO_ADDRESS.clone()
    }

    pub fn is_zero(&self) -> bool {
        self.0.len() == 40 && self.0.bytes().all(|b| b == b'0')
    }

    pub fn is_reserved(&self) -> bool {
        self == &*DEX_ADDRESS || self == &*TTF_ADDRESS || self == &*TUV_ADDRESS
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = if self.0.len() > 18 { &self.0[..18] } else { &self.0 };
        write!(f, "Address({}…)", shown)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_canonical_strings() {
        assert_eq!(Amount::ratio(1, 1000).to_string(), "1/1000");
        assert_eq!(Amount::from_int(5).to_string(), "5");
        assert_eq!(Amount::ratio(2, 4).to_string(), "1/2");
        assert_eq!(Amount::ratio(-3, 6).to_string(), "-1/2");
        assert_eq!(Amount::ratio(10, 1).to_string(), "10");
    }

    #[test]
    fn amount_parse_round_trip() {
        for s in ["1/1000", "5000000000", "-7/3", "0"] {
            let a: Amount = s.parse().unwrap();
            assert_eq!(a.to_string(), s);
        }
        assert!("abc".parse::<Amount>().is_err());
    }

    #[test]
    fn amount_arithmetic_is_exact() {
        let tenth = Amount::ratio(1, 10);
        let sum: Amount = (0..10).map(|_| tenth.clone()).sum();
        assert_eq!(sum, Amount::from_int(1));

        let fee = Amount::from_int(15) * Amount::ratio(3, 1000);
        assert_eq!(fee.to_string(), "9/200");
    }

    #[test]
    fn amount_pow() {
        let m = Amount::ratio(3, 2);
        assert_eq!(m.pow(0), Amount::from_int(1));
        assert_eq!(m.pow(2), Amount::ratio(9, 4));
    }

    #[test]
    fn amount_serde_as_string() {
        let a = Amount::ratio(9, 400);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"9/400\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn zero_address_shape() {
        assert!(ZERO_ADDRESS.is_zero());
        assert_eq!(ZERO_ADDRESS.as_str().len(), 40);
        assert!(Address::parse(ZERO_ADDRESS.as_str()).is_ok());
    }

    #[test]
    fn reserved_addresses_parse() {
        for a in ["0xBrainersDEX", "0xBrainersTTF", "0xBrainersTUV"] {
            assert!(Address::parse(a).unwrap().is_reserved());
        }
    }

    #[test]
    fn malformed_address_rejected() {
        assert!(Address::parse("0xSomethingElse").is_err());
        assert!(Address::parse("").is_err());
        assert!(Address::parse("0xBrainers").is_err());
    }
}
