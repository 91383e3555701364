//! Threshold math (C1, spec.md §4.1).
//!
//! `2^512` matches the bit length of a 64-byte VRF signature so eligibility
//! is a uniform Bernoulli trial over the signature space.

use crate::error::{BeaconError, Result};
use num_bigint::{BigInt, BigUint};
use num_traits::identities::Zero;

const VRF_SIGNATURE_BITS: u32 = 512;

/// `f(W) = 1 - 2^(-κ/((1-q)·W))`.
///
/// Evaluated in `f64` rather than arbitrary-precision rationals — see
/// `DESIGN.md` for why bit-exact cross-implementation agreement is out of
/// scope here. Determinism across nodes running *this* implementation
/// still holds because every node evaluates the same deterministic `f64`
/// formula.
pub fn eligibility_fraction(epoch_weight: u64, kappa: u32, q: (u64, u64)) -> Result<f64> {
    if epoch_weight == 0 {
        return Err(BeaconError::ZeroEpochWeight);
    }
    let (q_num, q_den) = q;
    let q = q_num as f64 / q_den as f64;
    let denom = (1.0 - q) * epoch_weight as f64;
    let exponent = -(kappa as f64) / denom;
    Ok(1.0 - 2f64.powf(exponent))
}

/// `T(W) = floor(f(W) · 2^512)`, as an exact integer.
///
/// `f64` carries 53 bits of mantissa precision; we scale the fraction
/// through a `2^53`-denominator fixed-point representation before
/// shifting up to the full 512-bit width, so the floor is exact given the
/// `f64` input.
pub fn atx_threshold(epoch_weight: u64, kappa: u32, q: (u64, u64)) -> Result<BigUint> {
    const MANTISSA_BITS: u32 = 53;
    let f = eligibility_fraction(epoch_weight, kappa, q)?;
    let f = f.clamp(0.0, 1.0);
    let numerator = (f * (1u64 << MANTISSA_BITS) as f64).floor() as u64;
    Ok(BigUint::from(numerator) << (VRF_SIGNATURE_BITS - MANTISSA_BITS))
}

/// A 64-byte VRF signature is eligible iff its big-endian integer value is
/// below the threshold.
pub fn is_eligible(signature_as_uint: &BigUint, threshold: &BigUint) -> bool {
    signature_as_uint < threshold
}

/// `V(W) = floor(θ · W)`, the margin a proposal's vote tally must cross to
/// be decided one way or the other (spec.md §4.1, §4.3).
pub fn voting_threshold(epoch_weight: u64, theta: (u64, u64)) -> BigInt {
    let (num, den) = theta;
    if den == 0 {
        return BigInt::zero();
    }
    let scaled = BigUint::from(epoch_weight) * BigUint::from(num) / BigUint::from(den);
    BigInt::from(scaled)
}
