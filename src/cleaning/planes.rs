//! Multi-scale cleaning on the starlet ("à trous", B3-spline) transform.
//!
//! The gap-filled image is split into `scales - 1` detail planes and one
//! coarse plane that sum back to the image. Detail plane `j` is thresholded
//! at `k_j · σ · e_j`, where σ is the image noise estimated from the finest
//! plane and `e_j` the noise response of the transform at scale `j`.

use super::filters::{convolve_a_trous, B3_TAPS};
use super::noise::{MissingFill, MissingFiller};
use super::{ensure_non_degenerate, options_value, Cleaned, CleaningAlgorithm, IslandFilter};
use crate::diagnostics::{elapsed_ms, CleaningDiagnostics};
use crate::error::ProcessingError;
use crate::image::ImageF64;
use crate::islands::DEFAULT_ISLAND_THRESHOLD;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

pub(super) const NAME: &str = "planes";

/// Standard deviation of each starlet detail plane for unit Gaussian noise.
/// Scales past the table reuse the last entry.
pub const STARLET_NOISE_RATIOS: [f64; 6] = [0.889, 0.200, 0.086, 0.041, 0.020, 0.010];

/// Largest accepted plane count. The coarsest kernel then spans `2^(MAX_SCALES - 2)`
/// pixels between taps.
pub const MAX_SCALES: usize = 16;

/// Median absolute deviation to Gaussian sigma.
const MAD_TO_SIGMA: f64 = 0.6745;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Thresholding {
    /// Zero coefficients below the threshold.
    #[default]
    Hard,
    /// Also shrink the surviving coefficients towards zero by the threshold.
    Soft,
}

/// What happens to the coarse (residual) plane on recombination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoarsePlane {
    #[default]
    Keep,
    Drop,
    /// Keep it only where some detail coefficient survived.
    Mask,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneOptions {
    /// Number of planes, the coarse plane included.
    pub scales: usize,
    /// Per-plane significance in units of the plane noise; the last value is
    /// reused for the remaining planes.
    pub k_sigma: Vec<f64>,
    pub thresholding: Thresholding,
    pub coarse_plane: CoarsePlane,
    pub fill: MissingFill,
    pub kill_isolated_pixels: bool,
    pub island_threshold: f64,
}

impl Default for PlaneOptions {
    fn default() -> Self {
        Self {
            scales: 4,
            k_sigma: vec![3.0],
            thresholding: Thresholding::Hard,
            coarse_plane: CoarsePlane::Keep,
            fill: MissingFill::default(),
            kill_isolated_pixels: false,
            island_threshold: DEFAULT_ISLAND_THRESHOLD,
        }
    }
}

impl PlaneOptions {
    fn k_for(&self, plane: usize) -> f64 {
        self.k_sigma
            .get(plane)
            .or_else(|| self.k_sigma.last())
            .copied()
            .unwrap_or(0.0)
    }
}

/// Starlet decomposition into `scales` planes: `scales - 1` detail planes,
/// finest first, then the coarse plane. The planes sum to `image`. `scales` is
/// capped at [`MAX_SCALES`].
pub fn starlet_transform(image: &ImageF64, scales: usize) -> Vec<ImageF64> {
    let scales = scales.min(MAX_SCALES);
    let mut planes = Vec::with_capacity(scales);
    let mut current = image.clone();
    for j in 0..scales.saturating_sub(1) {
        let smooth = convolve_a_trous(&current, &B3_TAPS, 1 << j);
        let detail = ImageF64 {
            data: current
                .data
                .iter()
                .zip(&smooth.data)
                .map(|(c, s)| c - s)
                .collect(),
            ..current
        };
        planes.push(detail);
        current = smooth;
    }
    planes.push(current);
    planes
}

/// Robust noise sigma of a plane: `MAD / 0.6745`.
pub fn mad_sigma(plane: &ImageF64) -> f64 {
    let mut values: Vec<f64> = plane.data.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return 0.0;
    }
    let median = median_in_place(&mut values);
    values.iter_mut().for_each(|v| *v = (*v - median).abs());
    median_in_place(&mut values) / MAD_TO_SIGMA
}

fn median_in_place(values: &mut [f64]) -> f64 {
    let mid = values.len() / 2;
    let (_, upper, _) = values.select_nth_unstable_by(mid, f64::total_cmp);
    let upper = *upper;
    if values.len() % 2 == 1 {
        return upper;
    }
    let lower = values[..mid]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    0.5 * (lower + upper)
}

#[derive(Clone, Debug)]
pub struct TransformPlaneFilter {
    options: PlaneOptions,
    filler: MissingFiller,
    islands: IslandFilter,
}

impl TransformPlaneFilter {
    pub fn new(options: PlaneOptions) -> Result<Self, ProcessingError> {
        if !(2..=MAX_SCALES).contains(&options.scales) {
            return Err(ProcessingError::Other(format!(
                "plane filter needs 2 to {MAX_SCALES} scales, got {}",
                options.scales
            )));
        }
        let valid_k = |k: &f64| k.is_finite() && *k >= 0.0;
        if options.k_sigma.is_empty() || !options.k_sigma.iter().all(valid_k) {
            return Err(ProcessingError::Other(format!(
                "k_sigma must be a non-empty list of non-negative values, got {:?}",
                options.k_sigma
            )));
        }
        let filler = options.fill.filler()?;
        let islands = IslandFilter::new(options.kill_isolated_pixels, options.island_threshold);
        Ok(Self {
            options,
            filler,
            islands,
        })
    }

    pub fn with_filler(mut self, filler: MissingFiller) -> Self {
        self.options.fill = filler.reported();
        self.filler = filler;
        self
    }

    /// Threshold the detail planes in place. Returns the per-pixel mask of
    /// significant coefficients and their count.
    fn threshold_planes(&self, details: &mut [ImageF64], sigma: f64) -> (Vec<bool>, usize) {
        let len = details.first().map_or(0, |p| p.data.len());
        let mut significant = vec![false; len];
        let mut count = 0usize;
        for (j, plane) in details.iter_mut().enumerate() {
            let ratio = STARLET_NOISE_RATIOS[j.min(STARLET_NOISE_RATIOS.len() - 1)];
            let t = self.options.k_for(j) * sigma * ratio;
            for (v, sig) in plane.data.iter_mut().zip(significant.iter_mut()) {
                if v.abs() >= t {
                    *sig = true;
                    count += 1;
                    if self.options.thresholding == Thresholding::Soft {
                        *v = v.signum() * (v.abs() - t);
                    }
                } else {
                    *v = 0.0;
                }
            }
        }
        (significant, count)
    }
}

impl CleaningAlgorithm for TransformPlaneFilter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn options(&self) -> Value {
        options_value(&self.options)
    }

    fn clean(&self, image: &ImageF64) -> Result<Cleaned, ProcessingError> {
        ensure_non_degenerate(image)?;
        let start = Instant::now();
        let mut diagnostics = CleaningDiagnostics::default();

        let (filled, missing) = diagnostics.timings.time("fill", || self.filler.fill(image));
        let mut planes = diagnostics
            .timings
            .time("transform", || starlet_transform(&filled, self.options.scales));
        let coarse = planes.pop().unwrap_or_else(|| ImageF64::new(image.w, image.h));

        let sigma = mad_sigma(&planes[0]) / STARLET_NOISE_RATIOS[0];
        let (significant, count) = diagnostics
            .timings
            .time("threshold", || self.threshold_planes(&mut planes, sigma));
        diagnostics.count("noise_sigma", sigma);
        diagnostics.count("significant_coefficients", count as f64);

        let mut cleaned = diagnostics.timings.time("recombine", || {
            let mut out = match self.options.coarse_plane {
                CoarsePlane::Keep => coarse,
                CoarsePlane::Drop => ImageF64::new(image.w, image.h),
                CoarsePlane::Mask => {
                    let mut masked = coarse;
                    for (v, &sig) in masked.data.iter_mut().zip(&significant) {
                        if !sig {
                            *v = 0.0;
                        }
                    }
                    masked
                }
            };
            for plane in &planes {
                for (o, d) in out.data.iter_mut().zip(&plane.data) {
                    *o += d;
                }
            }
            out
        });
        cleaned.restore_missing(&missing);

        let image = self.islands.apply(cleaned, &mut diagnostics);
        diagnostics.timings.total_ms = elapsed_ms(start);
        debug!(
            "plane filter: sigma={sigma:.4}, {count} significant coefficients, {:.3} ms",
            diagnostics.timings.total_ms
        );
        Ok(Cleaned { image, diagnostics })
    }
}
