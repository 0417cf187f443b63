//! Protocol Buffers definitions for the portable DDSketch format.
//!
//! This crate contains the message types used to exchange DDSketch instances with other DDSketch implementations. The
//! definitions mirror `proto/ddsketch.proto`, and are written by hand with `prost` derives rather than generated at build
//! time, so building the crate does not require `protoc`.
//!
//! Fields whose absence must be detected when decoding (`gamma`, `indexOffset`, and `contiguousBinIndexOffset`) use
//! explicit field presence, which is wire-compatible with the plain `proto3` declarations used by other
//! implementations.
#![deny(warnings)]
#![deny(missing_docs)]

/// Sketch-related definitions.
pub mod sketches {
    use std::collections::BTreeMap;

    /// A DDSketch: an index mapping, a store for positive values, a store for negative values, and a zero count.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct DDSketch {
        /// The mapping between positive values and the bin indexes they belong to.
        #[prost(message, optional, tag = "1")]
        pub mapping: Option<IndexMapping>,

        /// The store for keeping track of positive values.
        #[prost(message, optional, tag = "2")]
        pub positive_values: Option<Store>,

        /// The store for keeping track of negative values.
        ///
        /// A negative value `v` is mapped using its positive opposite `-v`.
        #[prost(message, optional, tag = "3")]
        pub negative_values: Option<Store>,

        /// The count for the value zero and its close neighborhood.
        #[prost(double, tag = "4")]
        pub zero_count: f64,
    }

    /// How to map positive values to the bins they belong to.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct IndexMapping {
        /// The gamma parameter of the mapping.
        #[prost(double, optional, tag = "1")]
        pub gamma: Option<f64>,

        /// An offset that shifts all bin indexes.
        #[prost(double, optional, tag = "2")]
        pub index_offset: Option<f64>,

        /// The interpolation used to approximate the logarithm, as a raw [`index_mapping::Interpolation`] value.
        #[prost(enumeration = "index_mapping::Interpolation", tag = "3")]
        pub interpolation: i32,
    }

    /// Nested types for [`IndexMapping`].
    pub mod index_mapping {
        /// How the logarithm is approximated between successive powers of two.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum Interpolation {
            /// The exact logarithm.
            None = 0,

            /// Linear interpolation.
            Linear = 1,

            /// Quadratic interpolation.
            Quadratic = 2,

            /// Cubic interpolation.
            Cubic = 3,
        }
    }

    /// Bin indexes mapped to their respective counts.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Store {
        /// The bin counts, encoded sparsely.
        #[prost(btree_map = "sint32, double", tag = "1")]
        pub bin_counts: BTreeMap<i32, f64>,

        /// The bin counts, encoded contiguously, starting at `contiguous_bin_index_offset`.
        #[prost(double, repeated, tag = "2")]
        pub contiguous_bin_counts: Vec<f64>,

        /// The index of the first bin in `contiguous_bin_counts`.
        #[prost(sint32, optional, tag = "3")]
        pub contiguous_bin_index_offset: Option<i32>,
    }
}
