//! Sketch configuration.

use serde::{Deserialize, Serialize};

use crate::error::SketchError;
use crate::mapping::{IndexMapping, MappingKind};
use crate::store::{CollapsingHighestDenseStore, CollapsingLowestDenseStore, DEFAULT_BIN_LIMIT, DEFAULT_CHUNK_SIZE};
use crate::DDSketch;

const fn default_relative_accuracy() -> f64 {
    0.01
}

const fn default_bin_limit() -> usize {
    DEFAULT_BIN_LIMIT
}

const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Configuration for building a [`DDSketch`].
///
/// Every field is optional. Unknown fields are rejected.
///
/// # Example
///
/// ```
/// use ddsketch::SketchConfig;
///
/// let config: SketchConfig = serde_json::from_str(r#"{ "relative_accuracy": 0.02, "mapping": "logarithmic" }"#).unwrap();
/// let sketch = config.build().unwrap();
/// assert_eq!(sketch.relative_accuracy(), 0.02);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SketchConfig {
    /// The relative accuracy guaranteed for the values returned by quantile queries.
    ///
    /// Must be between 0 and 1, exclusive. Lower values need more bins to cover the same range of values.
    ///
    /// Defaults to 0.01.
    #[serde(default = "default_relative_accuracy")]
    pub relative_accuracy: f64,

    /// The maximum number of bins held by each of the positive and negative stores.
    ///
    /// Once reached, the bins furthest from the tail of the distribution are collapsed.
    ///
    /// Defaults to 2048.
    #[serde(default = "default_bin_limit")]
    pub bin_limit: usize,

    /// How values are mapped to bins.
    ///
    /// Defaults to `cubically_interpolated`.
    #[serde(default)]
    pub mapping: MappingKind,

    /// The number of bins the stores grow by at a time.
    ///
    /// Defaults to 128.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl SketchConfig {
    /// Checks that the configuration can be used to build a sketch.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1, or if the bin limit or chunk size is zero, an error is
    /// returned.
    pub fn validate(&self) -> Result<(), SketchError> {
        self.build().map(|_| ())
    }

    /// Builds an empty sketch from this configuration.
    ///
    /// # Errors
    ///
    /// If the configuration is invalid, an error is returned.
    pub fn build(&self) -> Result<DDSketch, SketchError> {
        let mapping = IndexMapping::new(self.mapping, self.relative_accuracy)?;
        let positive_store = CollapsingLowestDenseStore::with_chunk_size(self.bin_limit, self.chunk_size)?;
        let negative_store = CollapsingHighestDenseStore::with_chunk_size(self.bin_limit, self.chunk_size)?;

        Ok(DDSketch::from_parts(mapping, positive_store, negative_store))
    }
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            relative_accuracy: default_relative_accuracy(),
            bin_limit: default_bin_limit(),
            mapping: MappingKind::default(),
            chunk_size: default_chunk_size(),
        }
    }
}
