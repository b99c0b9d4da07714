//! Dual-threshold ("tailcut") cleaning.
//!
//! A pixel is *core* when its value is at least the high threshold. A pixel
//! is *boundary* when it is at least the low threshold and 4-adjacent to a
//! core pixel. Core and boundary pixels keep their value, every other finite
//! pixel is zeroed, missing pixels stay missing.

use super::{options_value, Cleaned, CleaningAlgorithm, IslandFilter};
use crate::diagnostics::{elapsed_ms, CleaningDiagnostics};
use crate::error::ProcessingError;
use crate::image::{ImageF64, ImageView};
use crate::islands::DEFAULT_ISLAND_THRESHOLD;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

pub(super) const NAME: &str = "threshold";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdOptions {
    /// Core pixel threshold.
    pub high_threshold: f64,
    /// Boundary pixel threshold.
    pub low_threshold: f64,
    pub kill_isolated_pixels: bool,
    pub island_threshold: f64,
}

impl Default for ThresholdOptions {
    fn default() -> Self {
        Self {
            high_threshold: 10.0,
            low_threshold: 5.0,
            kill_isolated_pixels: false,
            island_threshold: DEFAULT_ISLAND_THRESHOLD,
        }
    }
}

/// Output of [`tailcut`].
#[derive(Clone, Debug)]
pub struct TailcutResult {
    pub image: ImageF64,
    pub core_pixels: usize,
    pub boundary_pixels: usize,
}

pub fn tailcut(image: &ImageF64, high: f64, low: f64) -> TailcutResult {
    let core: Vec<bool> = image.data.iter().map(|&v| v >= high).collect();
    let mut out = image.clone();
    let (mut core_pixels, mut boundary_pixels) = (0usize, 0usize);
    for y in 0..image.h {
        for x in 0..image.w {
            let i = image.idx(x, y);
            let v = image.data[i];
            if v.is_nan() {
                continue;
            }
            if core[i] {
                core_pixels += 1;
                continue;
            }
            let boundary =
                v >= low && image.neighbors4(x, y).any(|(nx, ny)| core[image.idx(nx, ny)]);
            if boundary {
                boundary_pixels += 1;
            } else {
                out.data[i] = 0.0;
            }
        }
    }
    TailcutResult {
        image: out,
        core_pixels,
        boundary_pixels,
    }
}

#[derive(Clone, Debug)]
pub struct ThresholdFilter {
    options: ThresholdOptions,
    islands: IslandFilter,
}

impl ThresholdFilter {
    pub fn new(options: ThresholdOptions) -> Self {
        let islands = IslandFilter::new(options.kill_isolated_pixels, options.island_threshold);
        Self { options, islands }
    }
}

impl CleaningAlgorithm for ThresholdFilter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn options(&self) -> Value {
        options_value(&self.options)
    }

    fn clean(&self, image: &ImageF64) -> Result<Cleaned, ProcessingError> {
        let start = Instant::now();
        let mut diagnostics = CleaningDiagnostics::default();
        let result = diagnostics.timings.time("tailcut", || {
            tailcut(
                image,
                self.options.high_threshold,
                self.options.low_threshold,
            )
        });
        diagnostics.count("core_pixels", result.core_pixels as f64);
        diagnostics.count("boundary_pixels", result.boundary_pixels as f64);
        let image = self.islands.apply(result.image, &mut diagnostics);
        diagnostics.timings.total_ms = elapsed_ms(start);
        debug!(
            "tailcut kept {} core and {} boundary pixels in {:.3} ms",
            result.core_pixels, result.boundary_pixels, diagnostics.timings.total_ms
        );
        Ok(Cleaned { image, diagnostics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_rows(rows: &[[f64; 6]]) -> ImageF64 {
        let rows: Vec<Vec<f64>> = rows.iter().map(|r| r.to_vec()).collect();
        ImageF64::from_rows(&rows).unwrap()
    }

    /// 2×2 peak surrounded by a one-pixel skirt.
    fn peak_with_ring() -> ImageF64 {
        from_rows(&[
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 1.0, 1.0, 1.0, 0.0],
            [0.0, 1.0, 5.0, 5.0, 1.0, 0.0],
            [0.0, 1.0, 5.0, 5.0, 1.0, 0.0],
            [0.0, 1.0, 1.0, 1.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ])
    }

    #[test]
    fn ring_pixels_touching_the_peak_survive() {
        let out = tailcut(&peak_with_ring(), 3.0, 0.5);
        let expected = from_rows(&[
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
            [0.0, 1.0, 5.0, 5.0, 1.0, 0.0],
            [0.0, 1.0, 5.0, 5.0, 1.0, 0.0],
            [0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ]);
        assert_eq!(out.image, expected);
        assert_eq!(out.core_pixels, 4);
        assert_eq!(out.boundary_pixels, 8);
    }

    #[test]
    fn two_lobes_around_a_gap_are_both_kept() {
        let img = from_rows(&[
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.8, 0.8, 0.0, 0.0, 0.8, 0.8],
            [0.8, 4.0, 0.0, 0.0, 4.0, 0.8],
            [0.8, 4.0, 0.0, 0.0, 4.0, 0.8],
            [0.8, 0.8, 0.0, 0.0, 0.8, 0.8],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ]);
        let out = tailcut(&img, 3.0, 0.5);
        let expected = from_rows(&[
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.8, 0.0, 0.0, 0.8, 0.0],
            [0.8, 4.0, 0.0, 0.0, 4.0, 0.8],
            [0.8, 4.0, 0.0, 0.0, 4.0, 0.8],
            [0.0, 0.8, 0.0, 0.0, 0.8, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ]);
        assert_eq!(out.image, expected);
    }

    #[test]
    fn lobe_without_core_is_removed() {
        let img = from_rows(&[
            [0.8, 0.8, 0.0, 0.0, 0.0, 0.0],
            [0.8, 0.8, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.8, 0.0],
            [0.0, 0.0, 0.0, 0.8, 4.0, 0.8],
            [0.0, 0.0, 0.0, 0.0, 0.8, 0.0],
        ]);
        let out = tailcut(&img, 3.0, 0.5);
        assert!((out.image.finite_sum() - 7.2).abs() < 1e-12);
        assert_eq!(out.image.get(0, 0), 0.0);
    }

    #[test]
    fn zero_thresholds_keep_non_negative_images() {
        let mut img = peak_with_ring();
        img.set(0, 5, 0.3);
        let out = tailcut(&img, 0.0, 0.0);
        assert_eq!(out.image, img);
    }

    #[test]
    fn missing_pixels_stay_missing() {
        let mut img = peak_with_ring();
        img.set(1, 2, f64::NAN);
        img.set(5, 5, f64::NAN);
        let out = tailcut(&img, 3.0, 0.5);
        assert!(out.image.get(1, 2).is_nan());
        assert!(out.image.get(5, 5).is_nan());
        assert_eq!(out.image.get(2, 1), 1.0);
    }

    #[test]
    fn filter_reports_counts_and_island_stats() {
        let mut img = peak_with_ring();
        img.set(5, 0, 9.0);
        let filter = ThresholdFilter::new(ThresholdOptions {
            high_threshold: 3.0,
            low_threshold: 0.5,
            kill_isolated_pixels: true,
            ..ThresholdOptions::default()
        });
        let out = filter.clean(&img).unwrap();
        assert_eq!(out.diagnostics.counter("core_pixels"), Some(5.0));
        assert_eq!(out.image.get(5, 0), 0.0);
        let stats = out.diagnostics.island_stats.unwrap();
        assert_eq!(stats.delta_sum, 9.0);
        assert_eq!(stats.delta_pixel_count, 1);
        assert_eq!(img.get(5, 0), 9.0);
    }
}
