//! Exact logarithm.

use std::f64::consts::LN_2;

/// Scales the base multiplier so that `log2(v) * multiplier == ln(v) / ln(gamma)`.
pub(super) const MULTIPLIER_SCALE: f64 = LN_2;

pub(super) fn log2(value: f64) -> f64 {
    value.log2()
}

/// Computes `2^exponent` as a `(fraction, exponent)` pair, with the fraction in `[1, 2)`.
pub(super) fn exp2(exponent: f64) -> (f64, i32) {
    let whole = exponent.floor();
    ((exponent - whole).exp2(), whole as i32)
}
