//! Arbitrary-precision amount helpers
//!
//! Interest rates are real-valued `f64` factors. They are multiplied into
//! big-integer amounts exactly (mantissa times a power of two) and the product
//! is truncated toward zero, so the only rounding is the one already present
//! in the `f64` rate itself. Ratios between two amounts never pass through a
//! float: [`mul_div`] scales in integers.

use num_bigint::BigUint;
use num_traits::{Float, Zero};

/// Parts-per-million denominator for fees and interest rates
pub const PPM: u64 = 1_000_000;

/// Seconds per day, the compounding period for lending interest
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Multiply `amount` by every factor in turn and truncate toward zero.
///
/// A non-finite or non-positive factor yields zero.
pub fn mul_trunc(amount: &BigUint, factors: &[f64]) -> BigUint {
    let mut product = amount.clone();
    let mut shift: i64 = 0;
    for &factor in factors {
        if !factor.is_finite() || factor <= 0.0 {
            return BigUint::zero();
        }
        let (mantissa, exponent, _) = Float::integer_decode(factor);
        product *= mantissa;
        shift += i64::from(exponent);
    }
    if shift >= 0 {
        product << (shift as usize)
    } else {
        product >> ((-shift) as usize)
    }
}

/// `amount * numerator / denominator`, truncated toward zero.
///
/// A zero denominator yields zero.
pub fn mul_div(amount: &BigUint, numerator: &BigUint, denominator: &BigUint) -> BigUint {
    if denominator.is_zero() {
        return BigUint::zero();
    }
    amount * numerator / denominator
}

/// `amount * ppm / 1_000_000`, truncated
pub fn ppm_of(amount: &BigUint, ppm: u32) -> BigUint {
    amount * BigUint::from(ppm) / BigUint::from(PPM)
}

/// Growth factor of `interest_ppm` per day compounded over `seconds`
pub fn compound_rate(interest_ppm: u32, seconds: u64) -> f64 {
    let daily = 1.0 + f64::from(interest_ppm) / PPM as f64;
    daily.powf(seconds as f64 / SECONDS_PER_DAY as f64)
}
