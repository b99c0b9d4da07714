//! Scoring of a cleaned image against its reference.
//!
//! Every metric is a plain function
//! `fn(&MetricInput, &MetricOptions) -> Result<Vec<Score>, ProcessingError>`.
//! [`METRIC_TABLE`] maps a metric name to the ordered list of functions it
//! runs; the `"all"` group is just a longer list. Adding a metric means adding
//! a function and a table row.
//!
//! [`assess`] runs a resolved [`MetricSelection`] and flattens all outputs,
//! in table order and then field order, into a [`ScoreRecord`] of parallel
//! `values` / `names` vectors.

mod energy;
mod islands;
mod pixel;
mod shape;
mod similarity;

pub use similarity::{psnr_filled, ssim_filled, PSNR_DATA_RANGE, SSIM_SIGMA};

use crate::error::ProcessingError;
use crate::geometry::PixelCoordinates;
use crate::image::ImageF64;
use crate::islands::DEFAULT_ISLAND_THRESHOLD;
use crate::shape::HillasImplementation;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Images handed to every metric for one corpus entry.
#[derive(Clone, Copy, Debug)]
pub struct MetricInput<'a> {
    /// Image before cleaning.
    pub raw: &'a ImageF64,
    pub cleaned: &'a ImageF64,
    pub reference: &'a ImageF64,
    pub coords: &'a PixelCoordinates,
}

/// Knobs shared by the metrics that need them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricOptions {
    /// Shape-parameter implementation used by the orientation metrics.
    pub hillas_implementation: HillasImplementation,
    /// Suppress isolated pixels on the reference before `delta_psi` and
    /// `hillas_delta`.
    pub kill_isolated_pixels_on_reference: bool,
    /// Island threshold for reference suppression and the island metrics.
    pub kill_threshold: f64,
}

impl Default for MetricOptions {
    fn default() -> Self {
        Self {
            hillas_implementation: HillasImplementation::default(),
            kill_isolated_pixels_on_reference: false,
            kill_threshold: DEFAULT_ISLAND_THRESHOLD,
        }
    }
}

/// One named value produced by a metric.
#[derive(Clone, Debug, PartialEq)]
pub struct Score {
    pub name: String,
    pub value: f64,
}

impl Score {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Ordered scores for one image, as parallel vectors.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub values: Vec<f64>,
    pub names: Vec<String>,
}

impl ScoreRecord {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    fn extend(&mut self, scores: Vec<Score>) {
        for score in scores {
            self.values.push(score.value);
            self.names.push(score.name);
        }
    }

    /// Parallel vectors of equal length with unique names.
    fn check(&self) -> Result<(), ProcessingError> {
        if self.values.len() != self.names.len() {
            return Err(ProcessingError::Other(format!(
                "score record out of sync: {} values for {} names",
                self.values.len(),
                self.names.len()
            )));
        }
        let mut seen = HashSet::with_capacity(self.names.len());
        if let Some(dup) = self.names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(ProcessingError::Other(format!(
                "duplicate score name `{dup}`"
            )));
        }
        Ok(())
    }
}

pub type MetricFn = fn(&MetricInput<'_>, &MetricOptions) -> Result<Vec<Score>, ProcessingError>;

const ALL: &[MetricFn] = &[
    pixel::mse,
    pixel::nrmse,
    pixel::unrmse,
    energy::e_shape,
    energy::e_energy,
    energy::sspd,
    similarity::ssim,
    similarity::psnr,
    shape::delta_psi,
    shape::hillas_delta,
    shape::hillas_delta2,
    islands::kill_isolated_pixels,
    islands::num_islands,
];

/// Metric name → functions it runs, in output order.
pub static METRIC_TABLE: &[(&str, &[MetricFn])] = &[
    ("all", ALL),
    ("mse", &[pixel::mse]),
    ("nrmse", &[pixel::nrmse]),
    ("unrmse", &[pixel::unrmse]),
    ("e_shape", &[energy::e_shape]),
    ("e_energy", &[energy::e_energy]),
    ("sspd", &[energy::sspd]),
    ("ssim", &[similarity::ssim]),
    ("psnr", &[similarity::psnr]),
    ("delta_psi", &[shape::delta_psi]),
    ("hillas_delta", &[shape::hillas_delta]),
    ("hillas_delta2", &[shape::hillas_delta2]),
    ("kill_isolated_pixels", &[islands::kill_isolated_pixels]),
    ("num_islands", &[islands::num_islands]),
];

/// Names accepted by [`MetricSelection::resolve`].
pub fn metric_names() -> impl Iterator<Item = &'static str> {
    METRIC_TABLE.iter().map(|(name, _)| *name)
}

/// A metric name resolved against [`METRIC_TABLE`], done once per run.
#[derive(Clone, Debug)]
pub struct MetricSelection {
    name: String,
    metrics: &'static [MetricFn],
}

impl MetricSelection {
    pub fn resolve(name: &str) -> Result<Self, ProcessingError> {
        METRIC_TABLE
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, metrics)| Self {
                name: name.to_string(),
                metrics,
            })
            .ok_or_else(|| ProcessingError::UnknownMethod(name.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Run every metric of `selection` and flatten the results.
pub fn assess(
    selection: &MetricSelection,
    input: &MetricInput<'_>,
    options: &MetricOptions,
) -> Result<ScoreRecord, ProcessingError> {
    check_shapes(input)?;
    let mut record = ScoreRecord::default();
    for metric in selection.metrics {
        record.extend(metric(input, options)?);
    }
    record.check()?;
    Ok(record)
}

fn check_shapes(input: &MetricInput<'_>) -> Result<(), ProcessingError> {
    for image in [input.raw, input.cleaned] {
        if !image.same_shape(input.reference) {
            return Err(ProcessingError::wrong_dimension(&image.shape()));
        }
    }
    input.coords.check_matches(input.reference)
}

/// Pixel pairs where both images hold a value.
pub(crate) fn valid_pairs<'a>(
    a: &'a ImageF64,
    b: &'a ImageF64,
) -> impl Iterator<Item = (f64, f64)> + 'a {
    a.data
        .iter()
        .zip(&b.data)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| (x, y))
}

/// Mean of `f` over the valid pairs, NaN when there are none.
pub(crate) fn mean_over_pairs(a: &ImageF64, b: &ImageF64, f: impl Fn(f64, f64) -> f64) -> f64 {
    let (sum, n) = valid_pairs(a, b).fold((0.0, 0usize), |(s, n), (x, y)| (s + f(x, y), n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}
