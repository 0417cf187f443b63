//! Index mapping.
//!
//! An index mapping assigns every positive value to the integer key of the bin it falls into, such that the value
//! reconstructed for a key is within the configured relative accuracy of every value mapped to that key. Bins are
//! logarithmically sized: bin `k` covers roughly `(gamma^(k-1), gamma^k]`.
//!
//! Computing the exact logarithm is comparatively expensive, so two of the three available strategies approximate it
//! from the binary representation of the value and interpolate between successive powers of two. The approximations
//! need slightly more bins to cover the same range, but are significantly faster to compute.

use ddsketch_protos::sketches::{index_mapping::Interpolation, IndexMapping as ProtoIndexMapping};
use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt as _};

use crate::error::{
    InvalidAccuracySnafu, InvalidGammaSnafu, InvalidIndexOffsetSnafu, MalformedMessageSnafu, SketchError,
};
use crate::math::ldexp;

mod cubic;
mod linear;
mod logarithmic;

/// How an index mapping computes the logarithm of a value.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    /// The exact logarithm.
    ///
    /// Uses the fewest bins for a given relative accuracy, but is the slowest to compute.
    Logarithmic,

    /// Linear interpolation between successive powers of two.
    ///
    /// The fastest to compute, but needs about 44% more bins than the exact logarithm.
    LinearlyInterpolated,

    /// Cubic interpolation between successive powers of two.
    ///
    /// Needs about 1% more bins than the exact logarithm, while being nearly as fast to compute as linear
    /// interpolation.
    #[default]
    CubicallyInterpolated,
}

impl MappingKind {
    fn log2(self, value: f64) -> f64 {
        match self {
            Self::Logarithmic => logarithmic::log2(value),
            Self::LinearlyInterpolated => linear::log2(value),
            Self::CubicallyInterpolated => cubic::log2(value),
        }
    }

    fn exp2(self, exponent: f64) -> (f64, i32) {
        match self {
            Self::Logarithmic => logarithmic::exp2(exponent),
            Self::LinearlyInterpolated => linear::exp2(exponent),
            Self::CubicallyInterpolated => cubic::exp2(exponent),
        }
    }

    fn multiplier_scale(self) -> f64 {
        match self {
            Self::Logarithmic => logarithmic::MULTIPLIER_SCALE,
            Self::LinearlyInterpolated => linear::MULTIPLIER_SCALE,
            Self::CubicallyInterpolated => cubic::MULTIPLIER_SCALE,
        }
    }

    fn interpolation(self) -> Interpolation {
        match self {
            Self::Logarithmic => Interpolation::None,
            Self::LinearlyInterpolated => Interpolation::Linear,
            Self::CubicallyInterpolated => Interpolation::Cubic,
        }
    }

    fn from_interpolation(raw: i32) -> Result<Self, SketchError> {
        match Interpolation::try_from(raw) {
            Ok(Interpolation::None) => Ok(Self::Logarithmic),
            Ok(Interpolation::Linear) => Ok(Self::LinearlyInterpolated),
            Ok(Interpolation::Cubic) => Ok(Self::CubicallyInterpolated),
            Ok(Interpolation::Quadratic) => MalformedMessageSnafu {
                reason: "quadratic interpolation is not supported",
            }
            .fail(),
            Err(_) => MalformedMessageSnafu {
                reason: format!("unknown interpolation {}", raw),
            }
            .fail(),
        }
    }
}

/// Maps positive values to bin keys, and bin keys back to values.
///
/// Every value `v` in `[min_possible, max_possible]` satisfies `|value(key(v)) - v| <= relative_accuracy * v`, up to
/// floating-point rounding. Keys are non-decreasing in the value.
///
/// Mappings compare equal when they produce the same keys: same kind, gamma, and offset.
#[derive(Clone, Debug)]
pub struct IndexMapping {
    kind: MappingKind,
    relative_accuracy: f64,
    gamma: f64,
    multiplier: f64,
    offset: f64,
    min_possible: f64,
    max_possible: f64,
}

impl PartialEq for IndexMapping {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.gamma == other.gamma && self.offset == other.offset
    }
}

impl IndexMapping {
    /// Creates a new `IndexMapping` of the given kind with the given relative accuracy.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not in the open interval `(0, 1)`, an error is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use ddsketch::{IndexMapping, MappingKind};
    ///
    /// let mapping = IndexMapping::new(MappingKind::Logarithmic, 0.01).unwrap();
    /// let value = mapping.value(mapping.key(42.0));
    /// assert!((value - 42.0).abs() <= 0.01 * 42.0);
    /// ```
    pub fn new(kind: MappingKind, relative_accuracy: f64) -> Result<Self, SketchError> {
        ensure!(
            relative_accuracy > 0.0 && relative_accuracy < 1.0,
            InvalidAccuracySnafu { relative_accuracy }
        );

        let gamma = 1.0 + 2.0 * relative_accuracy / (1.0 - relative_accuracy);
        Ok(Self::from_parts(kind, relative_accuracy, gamma, 0.0))
    }

    /// Creates a new `IndexMapping` that uses the exact logarithm.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not in the open interval `(0, 1)`, an error is returned.
    pub fn logarithmic(relative_accuracy: f64) -> Result<Self, SketchError> {
        Self::new(MappingKind::Logarithmic, relative_accuracy)
    }

    /// Creates a new `IndexMapping` that interpolates linearly between powers of two.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not in the open interval `(0, 1)`, an error is returned.
    pub fn linearly_interpolated(relative_accuracy: f64) -> Result<Self, SketchError> {
        Self::new(MappingKind::LinearlyInterpolated, relative_accuracy)
    }

    /// Creates a new `IndexMapping` that interpolates cubically between powers of two.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not in the open interval `(0, 1)`, an error is returned.
    pub fn cubically_interpolated(relative_accuracy: f64) -> Result<Self, SketchError> {
        Self::new(MappingKind::CubicallyInterpolated, relative_accuracy)
    }

    /// Creates a new `IndexMapping` from its raw parameters.
    ///
    /// This is the form in which mappings are exchanged with other implementations: the relative accuracy is derived
    /// from `gamma` as `(gamma - 1) / (gamma + 1)`.
    ///
    /// # Errors
    ///
    /// If `gamma` is not a finite value greater than 1, or if `offset` is not finite, an error is returned.
    pub fn with_gamma(kind: MappingKind, gamma: f64, offset: f64) -> Result<Self, SketchError> {
        ensure!(gamma.is_finite() && gamma > 1.0, InvalidGammaSnafu { gamma });
        ensure!(offset.is_finite(), InvalidIndexOffsetSnafu { offset });

        let relative_accuracy = (gamma - 1.0) / (gamma + 1.0);
        Ok(Self::from_parts(kind, relative_accuracy, gamma, offset))
    }

    fn from_parts(kind: MappingKind, relative_accuracy: f64, gamma: f64, offset: f64) -> Self {
        let mut mapping = Self {
            kind,
            relative_accuracy,
            gamma,
            multiplier: kind.multiplier_scale() / (gamma - 1.0).ln_1p(),
            offset,
            min_possible: 0.0,
            max_possible: 0.0,
        };

        // Keys must fit in an `i32`, and reconstructed values must stay normal and finite.
        mapping.min_possible =
            (f64::MIN_POSITIVE * gamma).max(mapping.pow_gamma(f64::from(i32::MIN) + 1.0 - offset));
        mapping.max_possible = (f64::MAX / gamma).min(mapping.pow_gamma(f64::from(i32::MAX) - 1.0 - offset));
        mapping
    }

    /// Returns the kind of this mapping.
    pub fn kind(&self) -> MappingKind {
        self.kind
    }

    /// Returns the relative accuracy of this mapping.
    pub fn relative_accuracy(&self) -> f64 {
        self.relative_accuracy
    }

    /// Returns the gamma of this mapping.
    ///
    /// Two mappings with the same gamma produce compatible bins, and sketches built with them can be merged.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Returns the offset added to every key computed by this mapping.
    pub fn index_offset(&self) -> f64 {
        self.offset
    }

    /// Returns the smallest positive value that this mapping can index.
    ///
    /// Smaller values are tracked as zero by sketches.
    pub fn min_possible(&self) -> f64 {
        self.min_possible
    }

    /// Returns the largest positive value that this mapping can index.
    pub fn max_possible(&self) -> f64 {
        self.max_possible
    }

    /// Returns the key of the bin that the given positive value belongs to.
    ///
    /// Values outside of `[min_possible, max_possible]` saturate to the smallest or largest key.
    pub fn key(&self, value: f64) -> i32 {
        (self.log_gamma(value).ceil() + self.offset) as i32
    }

    /// Returns the representative value of the bin with the given key.
    ///
    /// The representative value is within the relative accuracy of both bounds of the bin.
    pub fn value(&self, key: i32) -> f64 {
        let (fraction, exponent) = self.pow_gamma_parts(f64::from(key) - self.offset);
        ldexp(fraction * (2.0 / (1.0 + self.gamma)), exponent)
    }

    /// Returns the lower bound of the bin with the given key.
    pub fn lower_bound(&self, key: i32) -> f64 {
        self.pow_gamma(f64::from(key) - 1.0 - self.offset)
    }

    /// Returns the upper bound of the bin with the given key.
    pub fn upper_bound(&self, key: i32) -> f64 {
        self.pow_gamma(f64::from(key) - self.offset)
    }

    fn log_gamma(&self, value: f64) -> f64 {
        self.kind.log2(value) * self.multiplier
    }

    fn pow_gamma_parts(&self, exponent: f64) -> (f64, i32) {
        self.kind.exp2(exponent / self.multiplier)
    }

    fn pow_gamma(&self, exponent: f64) -> f64 {
        let (fraction, exponent) = self.pow_gamma_parts(exponent);
        ldexp(fraction, exponent)
    }

    /// Converts this mapping to its protobuf representation.
    pub fn to_proto(&self) -> ProtoIndexMapping {
        ProtoIndexMapping {
            gamma: Some(self.gamma),
            index_offset: Some(self.offset),
            interpolation: self.kind.interpolation() as i32,
        }
    }

    /// Creates a mapping from its protobuf representation.
    ///
    /// # Errors
    ///
    /// If the gamma or the index offset is missing or invalid, or if the interpolation is unknown or unsupported, an
    /// error is returned.
    pub fn from_proto(proto: &ProtoIndexMapping) -> Result<Self, SketchError> {
        let gamma = proto.gamma.context(MalformedMessageSnafu {
            reason: "index mapping is missing gamma",
        })?;
        let offset = proto.index_offset.context(MalformedMessageSnafu {
            reason: "index mapping is missing index offset",
        })?;
        let kind = MappingKind::from_interpolation(proto.interpolation)?;

        Self::with_gamma(kind, gamma, offset)
    }
}
