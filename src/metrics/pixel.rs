//! Pixel-domain error metrics.
//!
//! All three ignore positions where either image is missing, so swapping
//! which image carries the NaN does not change the result.

use super::{mean_over_pairs, MetricInput, MetricOptions, Score};
use crate::error::ProcessingError;
use crate::image::ImageF64;

pub(crate) fn mean_squared_error(a: &ImageF64, b: &ImageF64) -> f64 {
    mean_over_pairs(a, b, |x, y| (x - y) * (x - y))
}

/// `sqrt(mse) / sqrt(mean(cleaned * reference))`.
///
/// The denominator is the mean of the elementwise product, not the usual
/// range normaliser; existing benchmark results depend on this form.
pub(crate) fn normalized_rmse(cleaned: &ImageF64, reference: &ImageF64) -> f64 {
    let mse = mean_squared_error(cleaned, reference);
    let cross = mean_over_pairs(cleaned, reference, |x, y| x * y);
    mse.sqrt() / cross.sqrt()
}

/// Min-max normalise the finite pixels into `[0, 1]`. A constant image maps
/// to zeros. Missing pixels stay missing.
pub(crate) fn min_max_normalized(image: &ImageF64) -> ImageF64 {
    match image.finite_min_max() {
        Some((lo, hi)) if hi > lo => image.map(|v| (v - lo) / (hi - lo)),
        _ => image.map(|v| if v.is_finite() { 0.0 } else { v }),
    }
}

pub(super) fn mse(
    input: &MetricInput<'_>,
    _: &MetricOptions,
) -> Result<Vec<Score>, ProcessingError> {
    Ok(vec![Score::new(
        "mse",
        mean_squared_error(input.cleaned, input.reference),
    )])
}

pub(super) fn nrmse(
    input: &MetricInput<'_>,
    _: &MetricOptions,
) -> Result<Vec<Score>, ProcessingError> {
    Ok(vec![Score::new(
        "nrmse",
        normalized_rmse(input.cleaned, input.reference),
    )])
}

pub(super) fn unrmse(
    input: &MetricInput<'_>,
    _: &MetricOptions,
) -> Result<Vec<Score>, ProcessingError> {
    let cleaned = min_max_normalized(input.cleaned);
    let reference = min_max_normalized(input.reference);
    Ok(vec![Score::new(
        "unrmse",
        mean_squared_error(&cleaned, &reference).sqrt(),
    )])
}
