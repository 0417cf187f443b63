#![allow(dead_code)]

use ddsketch::DDSketch;
use rand::{Rng as _, SeedableRng as _};
use rand_distr::{Distribution, Pareto};

pub const SEED: u64 = 0xC0FFEE;

/// Sizes every dataset is generated at.
pub const SIZES: [usize; 6] = [1, 2, 10, 100, 1_000, 10_000];

/// Quantiles every dataset is checked at.
pub const QUANTILES: [f64; 11] = [0.0, 0.01, 0.1, 0.25, 0.33, 0.5, 0.75, 0.9, 0.95, 0.99, 1.0];

/// A named generator of test values.
pub struct Dataset {
    pub name: &'static str,
    generate: fn(usize, &mut rand::rngs::SmallRng) -> Vec<f64>,
}

impl Dataset {
    /// Generates `size` values, reproducibly.
    pub fn generate(&self, size: usize) -> Vec<f64> {
        let mut rng = rand::rngs::SmallRng::seed_from_u64(SEED);
        (self.generate)(size, &mut rng)
    }
}

pub fn datasets() -> Vec<Dataset> {
    vec![
        Dataset {
            name: "increasing",
            generate: |size, _| (0..size).map(|i| i as f64).collect(),
        },
        Dataset {
            name: "decreasing",
            generate: |size, _| (0..size).rev().map(|i| i as f64).collect(),
        },
        Dataset {
            name: "random",
            generate: |size, rng| (0..size).map(|_| rng.random_range(-1e6..1e6)).collect(),
        },
        Dataset {
            name: "random integers",
            generate: |size, rng| (0..size).map(|_| f64::from(rng.random_range(-1000i32..1000))).collect(),
        },
        Dataset {
            name: "constant",
            generate: |size, _| vec![42.0; size],
        },
        Dataset {
            name: "constant negative",
            generate: |size, _| vec![-42.0; size],
        },
        Dataset {
            name: "positive and negative",
            generate: |size, _| {
                (0..size)
                    .map(|i| if i % 2 == 0 { i as f64 } else { -(i as f64) })
                    .collect()
            },
        },
        Dataset {
            name: "latency",
            generate: |size, rng| make_points(size, rng),
        },
    ]
}

/// Generates a set of samples that roughly correspond to the latency of a typical web service, in microseconds.
///
/// Big hump at the beginning with a long tail: latencies bottom out at 15 milliseconds and tail off all the way up to
/// 10 seconds.
fn make_points(size: usize, rng: &mut rand::rngs::SmallRng) -> Vec<f64> {
    let distribution = Pareto::new(1.0, 1.0).expect("pareto distribution should be valid");
    distribution
        .sample_iter(rng)
        // Scale by 10,000 to get microseconds.
        .map(|n| n * 10_000.0)
        .filter(|n| *n > 15_000.0 && *n < 10_000_000.0)
        .take(size)
        .collect()
}

/// Returns the exact value at the given quantile, using the lower rank.
pub fn exact_quantile(sorted: &[f64], q: f64) -> f64 {
    let rank = (q * (sorted.len() - 1) as f64).floor() as usize;
    sorted[rank]
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

pub fn sketch_of(relative_accuracy: f64, values: &[f64]) -> DDSketch {
    let mut sketch = DDSketch::new(relative_accuracy).expect("relative accuracy should be valid");
    for &value in values {
        sketch.accept(value).expect("value should be accepted");
    }
    sketch
}

/// Asserts that every checked quantile of the sketch is within the relative accuracy of the exact quantile.
pub fn assert_accurate(sketch: &DDSketch, values: &[f64], relative_accuracy: f64, context: &str) {
    let sorted = sorted(values);
    for q in QUANTILES {
        let expected = exact_quantile(&sorted, q);
        let actual = sketch.get_value_at_quantile(q);
        let max_error = relative_accuracy * expected.abs() + 1e-15;
        assert!(
            (actual - expected).abs() <= max_error,
            "{}: quantile {} expected {} (+/-{}), got {}",
            context,
            q,
            expected,
            max_error,
            actual
        );
    }
}
