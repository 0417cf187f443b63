use snafu::ensure;

use super::bins::{BinArray, Growth};
use super::DEFAULT_CHUNK_SIZE;
use crate::error::{InvalidChunkSizeSnafu, SketchError};

/// A dense store using contiguous array storage.
///
/// This store grows unbounded to accommodate any range of keys. It's memory-efficient when the keys are clustered
/// together, but can use significant memory if keys are widely scattered.
///
/// Use this store when:
/// - You have a bounded range of input values
/// - Memory usage is not a concern
#[derive(Clone, Debug)]
pub struct DenseStore {
    bins: BinArray,
}

impl DenseStore {
    /// Creates an empty `DenseStore` that grows by the default chunk size.
    pub fn new() -> Self {
        Self {
            bins: BinArray::new(Growth::Unbounded, DEFAULT_CHUNK_SIZE),
        }
    }

    /// Creates an empty `DenseStore` that grows by `chunk_size` bins at a time.
    ///
    /// # Errors
    ///
    /// If `chunk_size` is zero, an error is returned.
    pub fn with_chunk_size(chunk_size: usize) -> Result<Self, SketchError> {
        ensure!(chunk_size > 0, InvalidChunkSizeSnafu { chunk_size });

        Ok(Self {
            bins: BinArray::new(Growth::Unbounded, chunk_size),
        })
    }

    /// Returns the number of bins the store grows by.
    pub fn chunk_size(&self) -> usize {
        self.bins.chunk_size()
    }

    /// Returns the number of bins currently allocated.
    pub fn allocated_bins(&self) -> usize {
        self.bins.len()
    }
}

impl Default for DenseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl_store_for_bins!(DenseStore);
