//! Image cleaning algorithms under benchmark.
//!
//! Every algorithm implements [`CleaningAlgorithm`] and is built from a
//! [`CleaningOptions`] value, which binds its parameters once. A `clean` call
//! only sees the image and returns the cleaned copy together with
//! [`CleaningDiagnostics`].
//!
//! Available algorithms:
//! - `identity`: returns the input unchanged, the baseline of a benchmark;
//! - `threshold`: dual-threshold ("tailcut") pixel selection;
//! - `spectral`: hard thresholding of 2D Fourier coefficients;
//! - `planes`: per-scale thresholding of the starlet (à trous) transform.
//!
//! The last three accept an optional isolated-pixel post-filter
//! ([`IslandFilter`]) that keeps only the brightest island of the result.

pub mod filters;
mod identity;
pub mod noise;
mod planes;
mod spectral;
mod threshold;

pub use identity::Identity;
pub use noise::{
    EmpiricalDistribution, MissingFill, MissingFiller, NoiseDistribution, NoiseModel,
    UniformNoise,
};
pub use planes::{
    mad_sigma, starlet_transform, CoarsePlane, PlaneOptions, Thresholding,
    TransformPlaneFilter, MAX_SCALES, STARLET_NOISE_RATIOS,
};
pub use spectral::{SpectralFilter, SpectralOptions};
pub use threshold::{tailcut, TailcutResult, ThresholdFilter, ThresholdOptions};

use crate::diagnostics::CleaningDiagnostics;
use crate::error::ProcessingError;
use crate::image::ImageF64;
use crate::islands::{keep_largest_island, suppression_delta, DEFAULT_ISLAND_THRESHOLD};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output of a cleaning call.
#[derive(Clone, Debug)]
pub struct Cleaned {
    pub image: ImageF64,
    pub diagnostics: CleaningDiagnostics,
}

pub trait CleaningAlgorithm: Send + Sync {
    /// Short identifier written to the report.
    fn name(&self) -> &'static str;

    /// Bound options as JSON, for the report.
    fn options(&self) -> Value;

    /// Clean one image. The input is never modified.
    fn clean(&self, image: &ImageF64) -> Result<Cleaned, ProcessingError>;
}

/// Optional isolated-pixel post-filter shared by the non-identity algorithms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IslandFilter {
    pub enabled: bool,
    pub threshold: f64,
}

impl Default for IslandFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: DEFAULT_ISLAND_THRESHOLD,
        }
    }
}

impl IslandFilter {
    pub fn new(enabled: bool, threshold: f64) -> Self {
        Self { enabled, threshold }
    }

    /// Keep the brightest island of `image` when enabled and record what was
    /// removed.
    pub fn apply(&self, image: ImageF64, diagnostics: &mut CleaningDiagnostics) -> ImageF64 {
        if !self.enabled {
            return image;
        }
        let kept = diagnostics
            .timings
            .time("kill_isolated_pixels", || keep_largest_island(&image, self.threshold));
        diagnostics.island_stats = Some(suppression_delta(&image, &kept));
        kept
    }
}

/// Algorithm selection plus its parameters, tagged by `"algorithm"`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum CleaningOptions {
    #[default]
    Identity,
    Threshold(ThresholdOptions),
    Spectral(SpectralOptions),
    Planes(PlaneOptions),
}

impl CleaningOptions {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identity => identity::NAME,
            Self::Threshold(_) => threshold::NAME,
            Self::Spectral(_) => spectral::NAME,
            Self::Planes(_) => planes::NAME,
        }
    }

    /// Validate the options and bind them into an algorithm.
    pub fn build(&self) -> Result<Box<dyn CleaningAlgorithm>, ProcessingError> {
        Ok(match self {
            Self::Identity => Box::new(Identity),
            Self::Threshold(opts) => Box::new(ThresholdFilter::new(opts.clone())),
            Self::Spectral(opts) => Box::new(SpectralFilter::new(opts.clone())?),
            Self::Planes(opts) => Box::new(TransformPlaneFilter::new(opts.clone())?),
        })
    }
}

/// Options as a JSON value; serialization of plain option structs cannot
/// fail, so an error degrades to `null`.
pub(crate) fn options_value<T: Serialize>(options: &T) -> Value {
    serde_json::to_value(options).unwrap_or_default()
}

/// Frequency- and scale-domain filters need at least one pixel.
pub(crate) fn ensure_non_degenerate(image: &ImageF64) -> Result<(), ProcessingError> {
    if image.is_empty() {
        return Err(ProcessingError::wrong_dimension(&image.shape()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_parse_from_tagged_json() {
        let opts: CleaningOptions = serde_json::from_str(
            r#"{"algorithm": "threshold", "high_threshold": 8.0, "low_threshold": 4.0,
                "kill_isolated_pixels": true}"#,
        )
        .unwrap();
        let CleaningOptions::Threshold(t) = &opts else {
            panic!("expected threshold options, got {opts:?}");
        };
        assert_eq!(t.high_threshold, 8.0);
        assert_eq!(t.low_threshold, 4.0);
        assert!(t.kill_isolated_pixels);
        assert_eq!(t.island_threshold, DEFAULT_ISLAND_THRESHOLD);

        let algo = opts.build().unwrap();
        assert_eq!(algo.name(), "threshold");
        assert_eq!(algo.options()["high_threshold"], 8.0);
    }

    #[test]
    fn default_options_build_identity() {
        let algo = CleaningOptions::default().build().unwrap();
        assert_eq!(algo.name(), "identity");
        let img = ImageF64::from_vec(2, 1, vec![1.0, f64::NAN]).unwrap();
        let out = algo.clean(&img).unwrap();
        assert_eq!(out.image.data[0], 1.0);
        assert!(out.image.data[1].is_nan());
    }

    #[test]
    fn every_variant_builds_with_defaults() {
        for json in [
            r#"{"algorithm": "identity"}"#,
            r#"{"algorithm": "threshold"}"#,
            r#"{"algorithm": "spectral"}"#,
            r#"{"algorithm": "planes"}"#,
        ] {
            let opts: CleaningOptions = serde_json::from_str(json).unwrap();
            let algo = opts.build().unwrap();
            assert_eq!(algo.name(), opts.name());
        }
        assert!(serde_json::from_str::<CleaningOptions>(r#"{"algorithm": "nope"}"#).is_err());
    }

    #[test]
    fn island_filter_records_removed_pixels() {
        let img = ImageF64::from_vec(4, 1, vec![5.0, 5.0, 0.0, 1.0]).unwrap();
        let mut diagnostics = CleaningDiagnostics::default();
        let out = IslandFilter::new(true, 0.5).apply(img, &mut diagnostics);
        assert_eq!(out.data, vec![5.0, 5.0, 0.0, 0.0]);
        let stats = diagnostics.island_stats.unwrap();
        assert_eq!(stats.delta_sum, 1.0);
        assert_eq!(stats.delta_pixel_count, 1);
        assert_eq!(diagnostics.timings.stages[0].label, "kill_isolated_pixels");
    }

    #[test]
    fn disabled_island_filter_is_a_no_op() {
        let img = ImageF64::from_vec(3, 1, vec![5.0, 0.0, 1.0]).unwrap();
        let mut diagnostics = CleaningDiagnostics::default();
        let out = IslandFilter::default().apply(img.clone(), &mut diagnostics);
        assert_eq!(out, img);
        assert!(diagnostics.island_stats.is_none());
    }
}
