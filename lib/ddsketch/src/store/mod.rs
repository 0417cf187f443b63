//! Store implementations for DDSketch bins.
//!
//! A store tracks the counts of the bins of either the positive or the negative values of a sketch. All stores keep
//! their bins in a contiguous array that grows in chunks; they differ in what happens once the range of keys gets too
//! wide.

use ddsketch_protos::sketches::Store as ProtoStore;
use snafu::ensure;

use crate::error::{MalformedMessageSnafu, SketchError};

/// Implements [`Store`] for a type by forwarding every operation to its `bins` field.
macro_rules! impl_store_for_bins {
    ($store:ty) => {
        impl $crate::store::Store for $store {
            fn add(&mut self, key: i32, weight: f64) {
                self.bins.add(key, weight);
            }

            fn count(&self) -> f64 {
                self.bins.count()
            }

            fn is_empty(&self) -> bool {
                self.bins.is_empty()
            }

            fn min_key(&self) -> Option<i32> {
                self.bins.min_key()
            }

            fn max_key(&self) -> Option<i32> {
                self.bins.max_key()
            }

            fn key_at_rank(&self, rank: f64, lower: bool) -> Option<i32> {
                self.bins.key_at_rank(rank, lower)
            }

            fn merge(&mut self, other: &Self) {
                self.bins.merge(&other.bins);
            }

            fn copy_from(&mut self, other: &Self) {
                self.bins.copy_from(&other.bins);
            }

            fn clear(&mut self) {
                self.bins.clear();
            }

            fn bins(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
                self.bins.bins()
            }

            fn to_proto(&self) -> ::ddsketch_protos::sketches::Store {
                self.bins.to_proto()
            }

            fn merge_from_proto(
                &mut self, proto: &::ddsketch_protos::sketches::Store,
            ) -> Result<(), $crate::error::SketchError> {
                self.bins.merge_from_proto(proto)
            }
        }
    };
}

mod bins;

mod collapsing_highest;
pub use self::collapsing_highest::CollapsingHighestDenseStore;

mod collapsing_lowest;
pub use self::collapsing_lowest::CollapsingLowestDenseStore;

mod dense;
pub use self::dense::DenseStore;

/// Default number of bins a store grows by.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Default maximum number of bins of a collapsing store.
pub const DEFAULT_BIN_LIMIT: usize = 2048;

/// A store for DDSketch bins.
///
/// Different implementations provide different memory/accuracy trade-offs:
///
/// - [`DenseStore`]: grows without bound. Best for data with a bounded range of values.
/// - [`CollapsingLowestDenseStore`]: never holds more than a fixed number of bins. Once the limit is reached, the
///   lowest keys are collapsed into a single bin. Best when higher quantiles (e.g., p99) are more important.
/// - [`CollapsingHighestDenseStore`]: never holds more than a fixed number of bins. Once the limit is reached, the
///   highest keys are collapsed into a single bin. Best when lower quantiles (e.g., p1) are more important.
pub trait Store: Clone + std::fmt::Debug + Send + Sync {
    /// Adds the given weight to the bin with the given key.
    ///
    /// Weights that are not strictly positive are ignored.
    fn add(&mut self, key: i32, weight: f64);

    /// Returns the total weight across all bins.
    fn count(&self) -> f64;

    /// Returns `true` if no weight has been added to the store.
    fn is_empty(&self) -> bool;

    /// Returns the smallest key of the store, or `None` if empty.
    ///
    /// Once a store has collapsed, this is the key of the bin that the collapsed keys were folded into.
    fn min_key(&self) -> Option<i32>;

    /// Returns the largest key of the store, or `None` if empty.
    fn max_key(&self) -> Option<i32>;

    /// Returns the key of the bin holding the given rank, or `None` if the store is empty.
    ///
    /// Ranks are zero-indexed. With `lower` set, this is the first key whose cumulative count exceeds `rank`;
    /// otherwise, the first key whose cumulative count is at least `rank + 1`. Ranks beyond the total count resolve to
    /// the largest key.
    fn key_at_rank(&self, rank: f64, lower: bool) -> Option<i32>;

    /// Merges another store into this one.
    ///
    /// The other store is left unchanged.
    fn merge(&mut self, other: &Self);

    /// Replaces the content of this store with a copy of the other store.
    fn copy_from(&mut self, other: &Self);

    /// Clears all bins from the store.
    fn clear(&mut self);

    /// Returns an iterator over the `(key, count)` pairs of the non-empty bins, in increasing key order.
    fn bins(&self) -> impl Iterator<Item = (i32, f64)> + '_;

    /// Converts this store to its protobuf representation.
    ///
    /// Bins are encoded contiguously, from the smallest to the largest key.
    fn to_proto(&self) -> ProtoStore;

    /// Adds the bins of a protobuf store to this store.
    ///
    /// # Errors
    ///
    /// If the message carries a negative or non-finite count, or contiguous counts without their index offset, an
    /// error is returned and the store is left unchanged.
    fn merge_from_proto(&mut self, proto: &ProtoStore) -> Result<(), SketchError>;
}

/// Validates that a count read from a protobuf store can be added to a store.
fn validate_count(key: i32, count: f64) -> Result<(), SketchError> {
    ensure!(
        count.is_finite() && count >= 0.0,
        MalformedMessageSnafu {
            reason: format!("bin {} has invalid count {}", key, count),
        }
    );
    Ok(())
}
