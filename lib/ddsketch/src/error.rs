//! Error types.

use snafu::Snafu;

/// Errors that can occur when building, updating, merging, or decoding a sketch.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SketchError {
    /// The relative accuracy is not in the open interval `(0, 1)`.
    #[snafu(display("relative accuracy must be between 0 and 1 (exclusive), got {}", relative_accuracy))]
    InvalidAccuracy {
        /// The rejected relative accuracy.
        relative_accuracy: f64,
    },

    /// The gamma of an index mapping is not a finite value greater than 1.
    #[snafu(display("gamma must be a finite value greater than 1, got {}", gamma))]
    InvalidGamma {
        /// The rejected gamma.
        gamma: f64,
    },

    /// The index offset of an index mapping is not finite.
    #[snafu(display("index offset must be finite, got {}", offset))]
    InvalidIndexOffset {
        /// The rejected index offset.
        offset: f64,
    },

    /// The bin limit of a collapsing store is zero.
    #[snafu(display("bin limit must be greater than 0, got {}", bin_limit))]
    InvalidBinLimit {
        /// The rejected bin limit.
        bin_limit: usize,
    },

    /// The chunk size of a store is zero.
    #[snafu(display("chunk size must be greater than 0, got {}", chunk_size))]
    InvalidChunkSize {
        /// The rejected chunk size.
        chunk_size: usize,
    },

    /// The weight of an observation is not strictly positive.
    #[snafu(display("weight must be greater than 0, got {}", weight))]
    InvalidWeight {
        /// The rejected weight.
        weight: f64,
    },

    /// The value of an observation cannot be tracked by the sketch's index mapping.
    #[snafu(display("value {} is outside the range tracked by the sketch (+/-{})", value, max))]
    ValueOutOfRange {
        /// The rejected value.
        value: f64,

        /// The largest magnitude the index mapping can track.
        max: f64,
    },

    /// The sketches use index mappings with different gammas.
    #[snafu(display("cannot merge sketches with different gammas ({} vs {})", gamma, other_gamma))]
    NotMergeable {
        /// The gamma of the receiving sketch.
        gamma: f64,

        /// The gamma of the sketch being merged in.
        other_gamma: f64,
    },

    /// A protobuf message is missing a required field or carries an invalid value.
    #[snafu(display("malformed sketch message: {}", reason))]
    MalformedMessage {
        /// What is wrong with the message.
        reason: String,
    },

    /// The bytes could not be decoded as a protobuf sketch message.
    #[snafu(display("failed to decode sketch message: {}", source))]
    InvalidEncoding {
        /// The underlying decode error.
        source: prost::DecodeError,
    },
}
