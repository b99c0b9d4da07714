//! Connected-component ("island") analysis on thresholded images.
//!
//! An island is a maximal 4-connected set of non-zero, finite pixels in a
//! copy of the image where every pixel below the threshold has been zeroed.
//! The analysis backs two things:
//! - the isolated-pixel post-filter ([`keep_largest_island`]) available to
//!   every cleaning algorithm, and
//! - the `kill_isolated_pixels` / `num_islands` metrics.
//!
//! Missing (NaN) pixels never belong to an island. They are zeroed for the
//! labeling pass only and restored in every returned image.

mod labeling;

use crate::image::ImageF64;
use labeling::IslandLabeler;
use serde::{Deserialize, Serialize};

/// Threshold used when none is configured.
pub const DEFAULT_ISLAND_THRESHOLD: f64 = 0.2;

/// Result of [`label_islands`].
#[derive(Clone, Debug)]
pub struct IslandLabels {
    /// Thresholded copy of the input, missing pixels restored.
    pub filtered: ImageF64,
    /// Row-major label grid, 0 = no island, `1..=count` otherwise.
    pub labels: Vec<u32>,
    /// Summed thresholded value per island, `sums[k]` for label `k + 1`.
    pub sums: Vec<f64>,
    pub count: usize,
}

impl IslandLabels {
    /// Label of the island with the largest summed value. Ties go to the
    /// lowest label id.
    pub fn largest(&self) -> Option<u32> {
        largest_label(&self.sums)
    }
}

fn largest_label(sums: &[f64]) -> Option<u32> {
    let mut best: Option<(usize, f64)> = None;
    for (k, &sum) in sums.iter().enumerate() {
        match best {
            Some((_, best_sum)) if sum <= best_sum => {}
            _ => best = Some((k, sum)),
        }
    }
    best.map(|(k, _)| k as u32 + 1)
}

/// What the isolated-pixel filter removed from an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IslandSuppressionStats {
    /// Signed sum of removed intensity.
    pub delta_sum: f64,
    /// Sum of absolute removed intensity.
    pub delta_abs_sum: f64,
    /// Signal pixels before minus signal pixels after.
    pub delta_pixel_count: i64,
}

/// Zero pixels below `threshold` and label the remaining islands.
pub fn label_islands(image: &ImageF64, threshold: f64) -> IslandLabels {
    let missing = image.missing_mask();
    let mut filtered = image.map(|v| if v.is_nan() || v < threshold { 0.0 } else { v });
    let (labels, sums) = IslandLabeler::new(&filtered).run();
    filtered.restore_missing(&missing);
    let count = sums.len();
    IslandLabels {
        filtered,
        labels,
        sums,
        count,
    }
}

pub fn count_islands(image: &ImageF64, threshold: f64) -> usize {
    label_islands(image, threshold).count
}

/// Keep only the island with the largest summed value.
///
/// Every pixel outside that island is zeroed (pixels below `threshold` are
/// zeroed anyway). With no island at all the thresholded image, all zeros,
/// is returned. Missing pixels stay missing.
pub fn keep_largest_island(image: &ImageF64, threshold: f64) -> ImageF64 {
    let IslandLabels {
        mut filtered,
        labels,
        sums,
        count,
    } = label_islands(image, threshold);
    if count == 0 {
        return filtered;
    }
    let keep = largest_label(&sums);
    for (v, &label) in filtered.data.iter_mut().zip(&labels) {
        if Some(label) != keep && !v.is_nan() {
            *v = 0.0;
        }
    }
    filtered
}

/// Compare `image` with `keep_largest_island(image, threshold)`.
pub fn island_suppression_stats(image: &ImageF64, threshold: f64) -> IslandSuppressionStats {
    let kept = keep_largest_island(image, threshold);
    suppression_delta(image, &kept)
}

/// Statistics of the change from `before` to `after` (same shape).
pub fn suppression_delta(before: &ImageF64, after: &ImageF64) -> IslandSuppressionStats {
    debug_assert!(before.same_shape(after));
    let is_signal = |v: f64| v != 0.0 && v.is_finite();
    let mut stats = IslandSuppressionStats::default();
    for (&b, &a) in before.data.iter().zip(&after.data) {
        let d = b - a;
        if d.is_finite() {
            stats.delta_sum += d;
            stats.delta_abs_sum += d.abs();
        }
        match (is_signal(b), is_signal(a)) {
            (true, false) => stats.delta_pixel_count += 1,
            (false, true) => stats.delta_pixel_count -= 1,
            _ => {}
        }
    }
    stats
}
