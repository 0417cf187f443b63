//! Logarithm approximated by linear interpolation between successive powers of two.

use crate::math::frexp;

/// The slope of the approximation, relative to `ln`, never drops below 1.
pub(super) const MULTIPLIER_SCALE: f64 = 1.0;

pub(super) fn log2(value: f64) -> f64 {
    let (mantissa, exponent) = frexp(value);
    let significand = 2.0 * mantissa - 1.0;
    significand + f64::from(exponent - 1)
}

/// Inverts [`log2`], returning a `(mantissa, exponent)` pair with the mantissa in `[0.5, 1)`.
pub(super) fn exp2(exponent: f64) -> (f64, i32) {
    let whole = exponent.floor() + 1.0;
    let mantissa = (exponent - whole + 2.0) / 2.0;
    (mantissa, whole as i32)
}
