use snafu::ensure;

use super::bins::{BinArray, Growth};
use super::{DEFAULT_BIN_LIMIT, DEFAULT_CHUNK_SIZE};
use crate::error::{InvalidBinLimitSnafu, InvalidChunkSizeSnafu, SketchError};

/// A dense store that collapses lowest-keyed bins when capacity is exceeded.
///
/// This store maintains a maximum number of bins. When adding a new key would exceed this limit, the lowest-keyed bins
/// are collapsed (merged into the lowest remaining bin), sacrificing accuracy for lower quantiles to preserve accuracy
/// for higher quantiles. Collapsing is irreversible.
///
/// Use this store when:
/// - You need bounded memory usage
/// - Higher quantiles (e.g., p95, p99) are more important than lower quantiles
/// - You're tracking latencies or other metrics where the tail matters most
#[derive(Clone, Debug)]
pub struct CollapsingLowestDenseStore {
    bins: BinArray,
}

impl CollapsingLowestDenseStore {
    /// Creates an empty `CollapsingLowestDenseStore` with the given maximum number of bins.
    ///
    /// # Errors
    ///
    /// If `bin_limit` is zero, an error is returned.
    pub fn new(bin_limit: usize) -> Result<Self, SketchError> {
        Self::with_chunk_size(bin_limit, DEFAULT_CHUNK_SIZE)
    }

    /// Creates an empty `CollapsingLowestDenseStore` with the given maximum number of bins, growing by `chunk_size`
    /// bins at a time.
    ///
    /// # Errors
    ///
    /// If `bin_limit` or `chunk_size` is zero, an error is returned.
    pub fn with_chunk_size(bin_limit: usize, chunk_size: usize) -> Result<Self, SketchError> {
        ensure!(bin_limit > 0, InvalidBinLimitSnafu { bin_limit });
        ensure!(chunk_size > 0, InvalidChunkSizeSnafu { chunk_size });

        Ok(Self {
            bins: BinArray::new(Growth::CollapseLowest { bin_limit }, chunk_size),
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
    /// If true, accuracy guarantees may not hold for lower quantiles.
    pub fn is_collapsed(&self) -> bool {
        self.bins.is_collapsed()
    }
}

impl Default for CollapsingLowestDenseStore {
    /// Creates a collapsing lowest dense store with a default of 2048 bins.
    fn default() -> Self {
        Self {
            bins: BinArray::new(
                Growth::CollapseLowest {
                    bin_limit: DEFAULT_BIN_LIMIT,
                },
                DEFAULT_CHUNK_SIZE,
            ),
        }
    }
}

impl_store_for_bins!(CollapsingLowestDenseStore);
