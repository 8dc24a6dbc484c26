use num_bigint::BigInt;
use num_rational::BigRational;

use brainers_core::canonical::sha256_bytes;
use brainers_core::types::{Address, Amount};
use brainers_core::validator::Validator;
use brainers_state::WorldState;

/// Pick the validator for block `height`.
///
/// Eligible validators (active, stake ≥ MIN_STAKE) are walked in address
/// order; each occupies a span of the cumulative weight line proportional to
/// `stake × reputation`. The selection point is a 128-bit fraction of the
/// total weight derived from SHA-256(previous_hash ∥ height) — deterministic
/// and reproducible from chain state alone. Returns `None` when no validator
/// is eligible.
pub fn select_validator(world: &WorldState, previous_hash: &str, height: u64) -> Option<Address> {
    let eligible: Vec<&Validator> = world
        .validators
        .values()
        .filter(|v| v.is_eligible())
        .collect();
    if eligible.is_empty() {
        return None;
    }
    let total: Amount = eligible.iter().map(|v| v.weight()).sum();
    if !total.is_positive() {
        return None;
    }

    let point = selection_point(previous_hash, height, &total);
    let mut cumulative = Amount::zero();
    for validator in &eligible {
        cumulative += validator.weight();
        if cumulative > point {
            return Some(validator.address.clone());
        }
    }
    // point < total, so the scan always lands inside a span; this is only
    // reachable if every weight is zero, excluded above.
    eligible.last().map(|v| v.address.clone())
}

/// Map the seed hash onto `[0, total)`.
fn selection_point(previous_hash: &str, height: u64, total: &Amount) -> Amount {
    let mut input = previous_hash.as_bytes().to_vec();
    input.extend_from_slice(&height.to_be_bytes());
    let digest = sha256_bytes(&input);

    let mut head = [0u8; 16];
    head.copy_from_slice(&digest[..16]);
    let r = u128::from_be_bytes(head);
    let fraction = BigRational::new(BigInt::from(r), BigInt::from(1u8) << 128usize);
    total.clone() * Amount::from_rational(fraction)
}

// ── Tests ────────────────────────────────────────────────────────────────────
