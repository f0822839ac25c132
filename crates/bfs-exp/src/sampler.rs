use bfs_core::errors::{ErrorInfo, SweepError};
use bfs_core::RngHandle;
use rand::{seq::SliceRandom, Rng};

/// Number of decimal digits kept on every sample value.
pub const SAMPLE_DECIMALS: i32 = 3;

/// Upper bound of the scaling range used when the nominal value is zero.
pub const ZERO_NOMINAL_UPPER: f64 = 1.0;

/// Returns the `[lower, upper]` range samples are scaled into.
///
/// A zero nominal falls back to `[0, 1]` so the sweep never collapses to a
/// single point. Negative nominals produce an inverted range; callers are
/// expected to supply non-negative defaults.
pub fn sample_range(nominal: f64, variation_fraction: f64) -> (f64, f64) {
    if nominal == 0.0 {
        (0.0, ZERO_NOMINAL_UPPER)
    } else {
        (
            nominal * (1.0 - variation_fraction),
            nominal * (1.0 + variation_fraction),
        )
    }
}

/// Deterministically draws `count` Latin hypercube samples around `nominal`.
///
/// The unit interval is cut into `count` equal strata, one uniform point is
/// drawn inside each, and the points are shuffled before scaling. Values are
/// rounded to [`SAMPLE_DECIMALS`] digits because artifact paths encode the
/// rounded value.
pub fn generate(
    nominal: f64,
    variation_fraction: f64,
    count: usize,
    seed: u64,
) -> Result<Vec<f64>, SweepError> {
    if count == 0 {
        return Err(SweepError::InvalidArgument(
            ErrorInfo::new("sampler-count", "sample count must be positive")
                .with_context("count", count.to_string()),
        ));
    }
    if !variation_fraction.is_finite() || variation_fraction < 0.0 {
        return Err(SweepError::InvalidArgument(
            ErrorInfo::new(
                "sampler-variation",
                "variation fraction must be finite and non-negative",
            )
            .with_context("variation_fraction", variation_fraction.to_string()),
        ));
    }
    if !nominal.is_finite() {
        return Err(SweepError::InvalidArgument(
            ErrorInfo::new("sampler-nominal", "nominal value must be finite")
                .with_context("nominal", nominal.to_string()),
        ));
    }

    let mut rng = RngHandle::from_seed(seed);
    let width = 1.0 / count as f64;
    let mut points: Vec<f64> = (0..count)
        .map(|stratum| (stratum as f64 + rng.gen::<f64>()) * width)
        .collect();
    points.shuffle(rng.inner_mut());

    let (lower, upper) = sample_range(nominal, variation_fraction);
    Ok(points
        .into_iter()
        .map(|unit| round_sample(lower + unit * (upper - lower)))
        .collect())
}

/// Rounds half away from zero to [`SAMPLE_DECIMALS`] digits.
pub fn round_sample(value: f64) -> f64 {
    let scale = 10f64.powi(SAMPLE_DECIMALS);
    (value * scale).round() / scale
}

/// Shortest round-trip decimal rendering with at least one fractional digit.
pub fn format_value(value: f64) -> String {
    let rendered = value.to_string();
    if value.is_finite() && !rendered.contains('.') {
        format!("{rendered}.0")
    } else {
        rendered
    }
}
