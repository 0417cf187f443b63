//! Logarithm approximated by cubic interpolation between successive powers of two.
//!
//! Within an octave, `log2(v)` is approximated by `P(s) = A*s^3 + B*s^2 + C*s` where `s = 2m - 1` and `m` is the
//! `frexp` mantissa of `v`. The coefficients make `P` exact at powers of two and keep `(s + 1) * P'(s) >= C` over the
//! whole octave, so the mapping only needs its multiplier divided by `C` to honor the relative accuracy.

use crate::math::frexp;

const A: f64 = 6.0 / 35.0;
const B: f64 = -3.0 / 5.0;
const C: f64 = 10.0 / 7.0;

pub(super) const MULTIPLIER_SCALE: f64 = 1.0 / C;

pub(super) fn log2(value: f64) -> f64 {
    let (mantissa, exponent) = frexp(value);
    let significand = 2.0 * mantissa - 1.0;
    ((A * significand + B) * significand + C) * significand + f64::from(exponent - 1)
}

/// Inverts [`log2`] with Cardano's formula, returning a `(mantissa, exponent)` pair with the mantissa in `[0.5, 1)`.
pub(super) fn exp2(exponent: f64) -> (f64, i32) {
    let whole = exponent.floor();
    let delta_0 = B * B - 3.0 * A * C;
    let delta_1 = 2.0 * B * B * B - 9.0 * A * B * C - 27.0 * A * A * (exponent - whole);
    let cardano = ((delta_1 - (delta_1 * delta_1 - 4.0 * delta_0 * delta_0 * delta_0).sqrt()) / 2.0).cbrt();
    let significand_plus_one = -(B + cardano + delta_0 / cardano) / (3.0 * A) + 1.0;
    (significand_plus_one / 2.0, (whole as i32).saturating_add(1))
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::math::ldexp;

    #[test]
    fn exact_at_powers_of_two() {
        assert_eq!(log2(1.0), 0.0);
        assert_eq!(log2(2.0), 1.0);
        assert_eq!(log2(0.125), -3.0);
        assert_eq!(log2(4096.0), 12.0);
    }

    #[test]
    fn closer_to_log2_than_linear_interpolation() {
        for value in [1.1, 1.5, 3.0, 5.0, 7.9] {
            let cubic_error = (log2(value) - value.log2()).abs();
            let linear_error = (crate::mapping::linear::log2(value) - value.log2()).abs();
            assert!(cubic_error < linear_error, "value {}", value);
        }
    }

    #[test]
    fn exp2_inverts_log2() {
        for value in [1e-300, 0.001, 0.75, 1.0, 3.0, 1234.5678, 1e300] {
            let (mantissa, exponent) = exp2(log2(value));
            assert_approx_eq!(f64, ldexp(mantissa, exponent), value, epsilon = 1e-12 * value, ulps = 64);
        }
    }

    #[test]
    fn slope_never_drops_below_c() {
        let steps = 10_000;
        for step in 0..steps {
            let s = f64::from(step) / f64::from(steps);
            let slope = (s + 1.0) * ((3.0 * A * s + 2.0 * B) * s + C);
            assert!(slope >= C - 1e-9, "s = {}: slope {}", s, slope);
        }
    }
}
