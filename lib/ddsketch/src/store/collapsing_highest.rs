use snafu::ensure;

use super::bins::{BinArray, Growth};
use super::{DEFAULT_BIN_LIMIT, DEFAULT_CHUNK_SIZE};
use crate::error::{InvalidBinLimitSnafu, InvalidChunkSizeSnafu, SketchError};

/// A dense store that collapses highest-keyed bins when capacity is exceeded.
///
/// This is the mirror image of [`CollapsingLowestDenseStore`][super::CollapsingLowestDenseStore]: once the bin limit
/// is reached, the highest keys are folded into the highest remaining bin. Sketches use it for the magnitudes of
/// negative values, where the highest keys hold the values closest to negative infinity, so that collapsing affects
/// the lowest quantiles of the sketch on both sides of zero.
#[derive(Clone, Debug)]
pub struct CollapsingHighestDenseStore {
    bins: BinArray,
}

impl CollapsingHighestDenseStore {
    /// Creates an empty `CollapsingHighestDenseStore` with the given maximum number of bins.
    ///
    /// # Errors
    ///
    /// If `bin_limit` is zero, an error is returned.
    pub fn new(bin_limit: usize) -> Result<Self, SketchError> {
        Self::with_chunk_size(bin_limit, DEFAULT_CHUNK_SIZE)
    }

    /// Creates an empty `CollapsingHighestDenseStore` with the given maximum number of bins, growing by `chunk_size`
    /// bins at a time.
    ///
    /// # Errors
    ///
    /// If `bin_limit` or `chunk_size` is zero, an error is returned.
    pub fn with_chunk_size(bin_limit: usize, chunk_size: usize) -> Result<Self, SketchError> {
        ensure!(bin_limit > 0, InvalidBinLimitSnafu { bin_limit });
        ensure!(chunk_size > 0, InvalidChunkSizeSnafu { chunk_size });

        Ok(Self {
            bins: BinArray::new(Growth::CollapseHighest { bin_limit }, chunk_size),
        })
    }

    /// Returns the maximum number of bins of this store.
    pub fn bin_limit(&self) -> usize {
        self.bins.growth().bin_limit().unwrap_or(DEFAULT_BIN_LIMIT)
    }

    /// Returns the number of bins the store grows by.
    pub fn chunk_size(&self) -> usize {
        self.bins.chunk_size()
    }

    /// Returns the number of bins currently allocated.
    pub fn allocated_bins(&self) -> usize {
        self.bins.len()
    }

    /// Returns `true` if this store has collapsed bins.
    ///
    /// If true, accuracy guarantees may not hold for the highest keys.
    pub fn is_collapsed(&self) -> bool {
        self.bins.is_collapsed()
    }
}

impl Default for CollapsingHighestDenseStore {
    /// Creates a collapsing highest dense store with a default of 2048 bins.
    fn default() -> Self {
        Self {
            bins: BinArray::new(
                Growth::CollapseHighest {
                    bin_limit: DEFAULT_BIN_LIMIT,
                },
                DEFAULT_CHUNK_SIZE,
            ),
        }
    }
}

impl_store_for_bins!(CollapsingHighestDenseStore);
