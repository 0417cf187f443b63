//! Binary decomposition of floating-point values.
//!
//! The interpolated index mappings approximate the logarithm from the exponent and significand of a value instead of
//! calling a transcendental function, so they need exact `frexp`/`ldexp` primitives, which the standard library does
//! not provide.

const EXPONENT_MASK: u64 = 0x7ff << 52;
const EXPONENT_BIAS: i32 = 1022;

// 2^54, used to normalize subnormal inputs.
const SUBNORMAL_SCALE: f64 = 18_014_398_509_481_984.0;

/// Splits a value into a normalized fraction and an integral power of two.
///
/// Returns `(mantissa, exponent)` such that `value == mantissa * 2^exponent`, with `|mantissa|` in `[0.5, 1)`. Zero,
/// infinities, and NaN are returned unchanged with an exponent of zero.
pub fn frexp(value: f64) -> (f64, i32) {
    if value == 0.0 || !value.is_finite() {
        return (value, 0);
    }

    let bits = value.to_bits();
    let raw_exponent = ((bits & EXPONENT_MASK) >> 52) as i32;
    if raw_exponent == 0 {
        let (mantissa, exponent) = frexp(value * SUBNORMAL_SCALE);
        return (mantissa, exponent - 54);
    }

    let mantissa = f64::from_bits((bits & !EXPONENT_MASK) | ((EXPONENT_BIAS as u64) << 52));
    (mantissa, raw_exponent - EXPONENT_BIAS)
}

/// Multiplies a value by an integral power of two.
///
/// Overflow yields an infinity and underflow yields a (possibly signed) zero, with a single rounding step for results in
/// the subnormal range.
pub fn ldexp(mantissa: f64, exponent: i32) -> f64 {
    let two_pow_1023 = f64::from_bits(0x7fe << 52);
    // 2^-1022 * 2^53, so that the intermediate product stays normal.
    let two_pow_neg_969 = f64::from_bits(0x036 << 52);

    let mut y = mantissa;
    let mut n = exponent;
    if n > 1023 {
        y *= two_pow_1023;
        n -= 1023;
        if n > 1023 {
            y *= two_pow_1023;
            n -= 1023;
            n = n.min(1023);
        }
    } else if n < -1022 {
        y *= two_pow_neg_969;
        n += 1022 - 53;
        if n < -1022 {
            y *= two_pow_neg_969;
            n += 1022 - 53;
            n = n.max(-1022);
        }
    }

    y * f64::from_bits(((0x3ff + n) as u64) << 52)
}
