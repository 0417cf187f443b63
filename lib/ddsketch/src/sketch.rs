//! DDSketch implementation.

use ddsketch_protos::sketches::DDSketch as ProtoDDSketch;
use prost::Message as _;
use snafu::{ensure, OptionExt as _, ResultExt as _};
use tracing::debug;

use crate::error::{
    InvalidEncodingSnafu, InvalidWeightSnafu, MalformedMessageSnafu, NotMergeableSnafu, SketchError,
    ValueOutOfRangeSnafu,
};
use crate::mapping::IndexMapping;
use crate::store::{CollapsingHighestDenseStore, CollapsingLowestDenseStore, Store, DEFAULT_BIN_LIMIT};

/// A fast and fully-mergeable quantile sketch with relative-error guarantees.
///
/// Positive values are tracked in a store that collapses its lowest bins once it reaches its bin limit, and the
/// magnitudes of negative values in a store that collapses its highest bins. Either way, collapsing only degrades the
/// accuracy of the lowest quantiles, which works well for tracking values like time durations/latencies where the tail
/// latencies (higher percentiles) matter most. Values too close to zero to be indexed are counted separately.
///
/// The sketch also tracks the exact count, sum, minimum and maximum of the values it was given. The protobuf
/// representation does not carry the sum, minimum and maximum, so sketches decoded from it do not report them.
///
/// # Example
///
/// ```
/// use ddsketch::DDSketch;
///
/// let mut sketch = DDSketch::new(0.01).unwrap();
/// sketch.accept(1.0).unwrap();
/// sketch.accept(2.0).unwrap();
/// sketch.accept(3.0).unwrap();
///
/// let median = sketch.get_value_at_quantile(0.5);
/// assert!((median - 2.0).abs() <= 0.01 * 2.0);
/// ```
#[derive(Clone, Debug)]
pub struct DDSketch {
    mapping: IndexMapping,
    positive_store: CollapsingLowestDenseStore,
    negative_store: CollapsingHighestDenseStore,
    zero_count: f64,
    sum: f64,
    min: f64,
    max: f64,

    /// Whether `sum`, `min`, and `max` cover every value counted by the sketch.
    exact_summary: bool,
}

impl DDSketch {
    /// Creates a new `DDSketch` with the given relative accuracy.
    ///
    /// Defaults to the cubically-interpolated mapping, with a maximum of 2048 bins per store.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between `0` and `1`, an error is returned.
    pub fn new(relative_accuracy: f64) -> Result<Self, SketchError> {
        let mapping = IndexMapping::cubically_interpolated(relative_accuracy)?;
        Self::with_mapping(mapping, DEFAULT_BIN_LIMIT)
    }

    /// Creates a new `DDSketch` with the given mapping, and stores holding at most `bin_limit` bins each.
    ///
    /// # Errors
    ///
    /// If `bin_limit` is zero, an error is returned.
    pub fn with_mapping(mapping: IndexMapping, bin_limit: usize) -> Result<Self, SketchError> {
        Ok(Self::from_parts(
            mapping,
            CollapsingLowestDenseStore::new(bin_limit)?,
            CollapsingHighestDenseStore::new(bin_limit)?,
        ))
    }

    pub(crate) fn from_parts(
        mapping: IndexMapping, mut positive_store: CollapsingLowestDenseStore,
        mut negative_store: CollapsingHighestDenseStore,
    ) -> Self {
        positive_store.clear();
        negative_store.clear();

        Self {
            mapping,
            positive_store,
            negative_store,
            zero_count: 0.0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            exact_summary: true,
        }
    }

    /// Adds a single value to the sketch.
    ///
    /// # Errors
    ///
    /// If the value is NaN or its magnitude is too large to be tracked, an error is returned and the sketch is left
    /// unchanged.
    pub fn accept(&mut self, value: f64) -> Result<(), SketchError> {
        self.accept_weighted(value, 1.0)
    }

    /// Adds a value to the sketch with the given weight.
    ///
    /// This is useful for weighted values or pre-aggregated data: it is equivalent to adding the value `weight` times.
    ///
    /// # Errors
    ///
    /// If the weight is not a finite value greater than zero, or if the value is NaN or its magnitude is too large to
    /// be tracked, an error is returned and the sketch is left unchanged.
    pub fn accept_weighted(&mut self, value: f64, weight: f64) -> Result<(), SketchError> {
        ensure!(weight > 0.0 && weight.is_finite(), InvalidWeightSnafu { weight });

        let max_possible = self.mapping.max_possible();
        ensure!(
            value.abs() <= max_possible,
            ValueOutOfRangeSnafu {
                value,
                max: max_possible
            }
        );

        let min_possible = self.mapping.min_possible();
        if value > min_possible {
            self.positive_store.add(self.mapping.key(value), weight);
        } else if value < -min_possible {
            self.negative_store.add(self.mapping.key(-value), weight);
        } else {
            self.zero_count += weight;
        }

        self.sum += value * weight;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        Ok(())
    }

    /// Returns the approximate value at the given quantile, or NaN if the sketch is empty or the quantile is not in
    /// `[0, 1]`.
    pub fn get_value_at_quantile(&self, q: f64) -> f64 {
        self.quantile(q).unwrap_or(f64::NAN)
    }

    /// Returns the approximate values at each of the given quantiles.
    ///
    /// See [`get_value_at_quantile`][Self::get_value_at_quantile].
    pub fn get_values_at_quantiles(&self, quantiles: &[f64]) -> Vec<f64> {
        quantiles.iter().map(|&q| self.get_value_at_quantile(q)).collect()
    }

    /// Returns the approximate value at the given quantile.
    ///
    /// The quantile must be in the range of [0, 1].
    ///
    /// Returns `None` if the sketch is empty, or if the quantile is out of bounds. Otherwise, returns the approximate
    /// value, which is within the relative accuracy of the value of rank `q * (count - 1)`, unless the bin holding it
    /// was collapsed.
    ///
    /// While the exact minimum and maximum are known, quantiles 0 and 1 return them, and every other quantile is
    /// clamped to lie between them.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        if self.is_empty() || !(0.0..=1.0).contains(&q) {
            return None;
        }

        let estimate = self.estimate_at_rank(q * (self.count() - 1.0))?;
        if !self.has_summary() {
            return Some(estimate);
        }

        Some(if q == 0.0 {
            self.min
        } else if q == 1.0 {
            self.max
        } else {
            estimate.clamp(self.min, self.max)
        })
    }

    fn estimate_at_rank(&self, rank: f64) -> Option<f64> {
        let negative_count = self.negative_store.count();
        if rank < negative_count {
            // Negative values are stored by magnitude, so the rank is counted from the other end of the store.
            let key = self.negative_store.key_at_rank(negative_count - rank - 1.0, false)?;
            Some(-self.mapping.value(key))
        } else if rank < negative_count + self.zero_count {
            Some(0.0)
        } else {
            let key = self
                .positive_store
                .key_at_rank(rank - self.zero_count - negative_count, true)?;
            Some(self.mapping.value(key))
        }
    }

    /// Returns `true` if the other sketch can be merged into this one.
    ///
    /// Sketches are mergeable when their mappings share the same gamma.
    pub fn mergeable(&self, other: &Self) -> bool {
        self.mapping.gamma() == other.mapping.gamma()
    }

    /// Merges another sketch into this one.
    ///
    /// The other sketch is left unchanged. If its mapping has the same gamma but a different interpolation or index
    /// offset, each of its bins is re-indexed through this sketch's mapping.
    ///
    /// # Errors
    ///
    /// If the sketches are not [mergeable][Self::mergeable], an error is returned and neither sketch is modified.
    pub fn merge(&mut self, other: &Self) -> Result<(), SketchError> {
        ensure!(
            self.mergeable(other),
            NotMergeableSnafu {
                gamma: self.mapping.gamma(),
                other_gamma: other.mapping.gamma(),
            }
        );

        if other.is_empty() {
            return Ok(());
        }

        let was_empty = self.is_empty();
        if self.mapping == other.mapping {
            self.positive_store.merge(&other.positive_store);
            self.negative_store.merge(&other.negative_store);
            self.zero_count += other.zero_count;
        } else {
            debug!(
                kind = ?self.mapping.kind(),
                other_kind = ?other.mapping.kind(),
                offset = self.mapping.index_offset(),
                other_offset = other.mapping.index_offset(),
                "Re-indexing bins of sketch with a different mapping."
            );

            for (key, count) in other.positive_store.bins() {
                self.add_rekeyed(other.mapping.value(key), count, false);
            }
            for (key, count) in other.negative_store.bins() {
                self.add_rekeyed(other.mapping.value(key), count, true);
            }
            self.zero_count += other.zero_count;
        }

        if was_empty {
            self.sum = other.sum;
            self.min = other.min;
            self.max = other.max;
            self.exact_summary = other.exact_summary;
        } else {
            self.sum += other.sum;
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
            self.exact_summary &= other.exact_summary;
        }
        Ok(())
    }

    fn add_rekeyed(&mut self, magnitude: f64, count: f64, negative: bool) {
        if magnitude <= self.mapping.min_possible() {
            self.zero_count += count;
            return;
        }

        let key = self.mapping.key(magnitude.min(self.mapping.max_possible()));
        if negative {
            self.negative_store.add(key, count);
        } else {
            self.positive_store.add(key, count);
        }
    }

    /// Returns `true` if the sketch is empty.
    pub fn is_empty(&self) -> bool {
        self.count() == 0.0
    }

    /// Returns the total weight of the values added to the sketch.
    pub fn count(&self) -> f64 {
        self.negative_store.count() + self.zero_count + self.positive_store.count()
    }

    /// Returns the sum of the values added to the sketch.
    ///
    /// Returns `None` if the sketch is empty, or if it holds values decoded from its protobuf representation.
    pub fn sum(&self) -> Option<f64> {
        self.has_summary().then_some(self.sum)
    }

    /// Returns the minimum of the values added to the sketch.
    ///
    /// Returns `None` if the sketch is empty, or if it holds values decoded from its protobuf representation.
    pub fn min(&self) -> Option<f64> {
        self.has_summary().then_some(self.min)
    }

    /// Returns the maximum of the values added to the sketch.
    ///
    /// Returns `None` if the sketch is empty, or if it holds values decoded from its protobuf representation.
    pub fn max(&self) -> Option<f64> {
        self.has_summary().then_some(self.max)
    }

    /// Returns the average of the values added to the sketch.
    ///
    /// Returns `None` if the sketch is empty, or if it holds values decoded from its protobuf representation.
    pub fn avg(&self) -> Option<f64> {
        self.has_summary().then(|| self.sum / self.count())
    }

    fn has_summary(&self) -> bool {
        self.exact_summary && !self.is_empty()
    }

    /// Returns the total weight of the values mapped to zero.
    pub fn zero_count(&self) -> f64 {
        self.zero_count
    }

    /// Returns the relative accuracy of this sketch.
    pub fn relative_accuracy(&self) -> f64 {
        self.mapping.relative_accuracy()
    }

    /// Returns a reference to the index mapping.
    pub fn mapping(&self) -> &IndexMapping {
        &self.mapping
    }

    /// Returns a reference to the positive value store.
    pub fn positive_store(&self) -> &CollapsingLowestDenseStore {
        &self.positive_store
    }

    /// Returns a reference to the negative value store.
    ///
    /// Negative values are tracked by the keys of their magnitudes.
    pub fn negative_store(&self) -> &CollapsingHighestDenseStore {
        &self.negative_store
    }

    /// Clears the sketch, removing all values.
    pub fn clear(&mut self) {
        self.positive_store.clear();
        self.negative_store.clear();
        self.zero_count = 0.0;
        self.sum = 0.0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
        self.exact_summary = true;
    }

    /// Converts this `DDSketch` to a protobuf `DDSketch` message.
    ///
    /// # Note
    ///
    /// The protobuf `DDSketch` does not include `sum`, `min`, or `max` fields. This information is lost in the
    /// conversion.
    pub fn to_proto(&self) -> ProtoDDSketch {
        ProtoDDSketch {
            mapping: Some(self.mapping.to_proto()),
            positive_values: Some(self.positive_store.to_proto()),
            negative_values: Some(self.negative_store.to_proto()),
            zero_count: self.zero_count,
        }
    }

    /// Creates a `DDSketch` from a protobuf `DDSketch` message.
    ///
    /// The stores of the decoded sketch hold at most 2048 bins each.
    ///
    /// # Errors
    ///
    /// If the message is missing its mapping or either store, if the mapping is invalid, or if any count is negative
    /// or not finite, an error is returned.
    pub fn from_proto(proto: &ProtoDDSketch) -> Result<Self, SketchError> {
        Self::from_proto_with_bin_limit(proto, DEFAULT_BIN_LIMIT)
    }

    /// Creates a `DDSketch` from a protobuf `DDSketch` message, with stores holding at most `bin_limit` bins each.
    ///
    /// # Errors
    ///
    /// If the message is missing its mapping or either store, if the mapping is invalid, if any count is negative or
    /// not finite, or if `bin_limit` is zero, an error is returned.
    pub fn from_proto_with_bin_limit(proto: &ProtoDDSketch, bin_limit: usize) -> Result<Self, SketchError> {
        let mapping = proto.mapping.as_ref().context(MalformedMessageSnafu {
            reason: "sketch is missing its index mapping",
        })?;
        let positive_values = proto.positive_values.as_ref().context(MalformedMessageSnafu {
            reason: "sketch is missing its positive value store",
        })?;
        let negative_values = proto.negative_values.as_ref().context(MalformedMessageSnafu {
            reason: "sketch is missing its negative value store",
        })?;
        ensure!(
            proto.zero_count.is_finite() && proto.zero_count >= 0.0,
            MalformedMessageSnafu {
                reason: format!("invalid zero count {}", proto.zero_count),
            }
        );

        let mut sketch = Self::with_mapping(IndexMapping::from_proto(mapping)?, bin_limit)?;
        sketch.positive_store.merge_from_proto(positive_values)?;
        sketch.negative_store.merge_from_proto(negative_values)?;
        sketch.zero_count = proto.zero_count;
        // Nothing is known about the values behind a non-empty message.
        sketch.exact_summary = sketch.is_empty();

        debug!(
            kind = ?sketch.mapping.kind(),
            gamma = sketch.mapping.gamma(),
            count = sketch.count(),
            "Decoded sketch."
        );

        Ok(sketch)
    }

    /// Encodes this `DDSketch` as a protobuf `DDSketch` message.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        self.to_proto().encode_to_vec()
    }

    /// Decodes a `DDSketch` from an encoded protobuf `DDSketch` message.
    ///
    /// # Errors
    ///
    /// If the bytes are not a valid protobuf message, or if the message is not a valid sketch, an error is returned.
    pub fn decode(bytes: &[u8]) -> Result<Self, SketchError> {
        let proto = ProtoDDSketch::decode(bytes).context(InvalidEncodingSnafu)?;
        Self::from_proto(&proto)
    }
}
