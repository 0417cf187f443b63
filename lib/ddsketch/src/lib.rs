//! A DDSketch implementation.
//!
//! DDSketch is a fast and fully-mergeable quantile sketch with relative-error guarantees: the values returned for any
//! quantile are within a configurable relative accuracy of the exact value, using memory that is bounded independently
//! of the number of values added.
//!
//! # Quick Start
//!
//! ```
//! use ddsketch::DDSketch;
//!
//! // Create a sketch with 1% relative accuracy
//! let mut sketch = DDSketch::new(0.01).unwrap();
//!
//! // Add some values
//! sketch.accept(1.5).unwrap();
//! sketch.accept(2.5).unwrap();
//! sketch.accept_weighted(3.5, 10.0).unwrap();
//!
//! // Query quantiles
//! let p50 = sketch.get_value_at_quantile(0.5);
//! let p99 = sketch.get_value_at_quantile(0.99);
//! assert!(p50 <= p99);
//!
//! // Exchange with other implementations
//! let bytes = sketch.encode_to_vec();
//! let decoded = DDSketch::decode(&bytes).unwrap();
//! assert_eq!(decoded.count(), sketch.count());
//! ```
//!
//! # Index Mappings
//!
//! - [`MappingKind::Logarithmic`]: the exact logarithm. Fewest bins, slowest.
//! - [`MappingKind::LinearlyInterpolated`]: linear interpolation between powers of two. Fastest, most bins.
//! - [`MappingKind::CubicallyInterpolated`]: cubic interpolation between powers of two. The default.
//!
//! # Store Types
//!
//! - [`CollapsingLowestDenseStore`]: Collapses lowest bins when limit is reached. Holds the positive values of a
//!   sketch.
//! - [`CollapsingHighestDenseStore`]: Collapses highest bins when limit is reached. Holds the negative values of a
//!   sketch.
//! - [`DenseStore`]: Unbounded dense storage. Best when memory is not a concern.
#![deny(warnings)]
#![deny(missing_docs)]

mod config;
pub use self::config::SketchConfig;

mod error;
pub use self::error::SketchError;

pub mod mapping;
pub use self::mapping::{IndexMapping, MappingKind};

mod math;

pub mod store;
pub use self::store::{CollapsingHighestDenseStore, CollapsingLowestDenseStore, DenseStore, Store};

mod sketch;
pub use self::sketch::DDSketch;
