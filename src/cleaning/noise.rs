//! Filling of missing pixels before frequency- and scale-domain filters.
//!
//! The FFT and plane filters need a gap-free image. Missing pixels are filled
//! with zeros or with draws from a [`NoiseDistribution`], and put back as
//! missing after filtering. Noise is drawn from a `StdRng` seeded for every
//! image, so a run is reproducible.

use crate::error::ProcessingError;
use crate::image::ImageF64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Source of fill values for missing pixels.
pub trait NoiseDistribution: Send + Sync + fmt::Debug {
    fn sample(&self, rng: &mut StdRng) -> f64;
}

/// Uniform noise on `[low, high)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformNoise {
    low: f64,
    high: f64,
}

impl UniformNoise {
    pub fn new(low: f64, high: f64) -> Result<Self, ProcessingError> {
        if !(low.is_finite() && high.is_finite()) || high < low {
            return Err(ProcessingError::Other(format!(
                "invalid uniform noise range [{low}, {high})"
            )));
        }
        Ok(Self { low, high })
    }
}

impl NoiseDistribution for UniformNoise {
    fn sample(&self, rng: &mut StdRng) -> f64 {
        if self.high == self.low {
            return self.low;
        }
        rng.gen_range(self.low..self.high)
    }
}

/// Histogram-shaped distribution, sampled by inverting its cumulative
/// distribution. Within a bin values are uniform.
#[derive(Clone, Debug, PartialEq)]
pub struct EmpiricalDistribution {
    edges: Vec<f64>,
    /// Normalised cumulative weight at the upper edge of every bin.
    cdf: Vec<f64>,
}

impl EmpiricalDistribution {
    /// `edges` holds `counts.len() + 1` increasing bin edges.
    pub fn from_histogram(edges: Vec<f64>, counts: &[f64]) -> Result<Self, ProcessingError> {
        if counts.is_empty() || edges.len() != counts.len() + 1 {
            return Err(ProcessingError::Other(format!(
                "histogram needs counts.len() + 1 edges, got {} edges for {} bins",
                edges.len(),
                counts.len()
            )));
        }
        if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|e| e[1] <= e[0]) {
            return Err(ProcessingError::Other(
                "histogram edges must be strictly increasing".to_string(),
            ));
        }
        if counts.iter().any(|c| !c.is_finite() || *c < 0.0) {
            return Err(ProcessingError::Other(
                "histogram counts must be finite and non-negative".to_string(),
            ));
        }
        let total: f64 = counts.iter().sum();
        if total <= 0.0 {
            return Err(ProcessingError::Other("histogram is empty".to_string()));
        }
        let mut acc = 0.0;
        let cdf = counts
            .iter()
            .map(|c| {
                acc += c;
                acc / total
            })
            .collect();
        Ok(Self { edges, cdf })
    }

    /// Histogram of the finite `samples` over `bins` equal-width bins.
    pub fn from_samples(samples: &[f64], bins: usize) -> Result<Self, ProcessingError> {
        let finite: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        let (lo, hi) = finite
            .iter()
            .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .ok_or_else(|| ProcessingError::Other("no finite noise samples".to_string()))?;
        let bins = bins.max(1);
        let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, lo + 0.5) };
        let width = (hi - lo) / bins as f64;
        let edges = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0.0; bins];
        for v in finite {
            let bin = (((v - lo) / width) as usize).min(bins - 1);
            counts[bin] += 1.0;
        }
        Self::from_histogram(edges, &counts)
    }
}

impl NoiseDistribution for EmpiricalDistribution {
    fn sample(&self, rng: &mut StdRng) -> f64 {
        let u: f64 = rng.gen();
        let bin = self.cdf.partition_point(|&c| c <= u).min(self.cdf.len() - 1);
        let lo = self.edges[bin];
        let hi = self.edges[bin + 1];
        lo + (hi - lo) * rng.gen::<f64>()
    }
}

/// Serializable description of a noise distribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", rename_all = "snake_case")]
pub enum NoiseModel {
    Uniform { low: f64, high: f64 },
    Histogram { edges: Vec<f64>, counts: Vec<f64> },
}

impl NoiseModel {
    pub fn build(&self) -> Result<Arc<dyn NoiseDistribution>, ProcessingError> {
        Ok(match self {
            Self::Uniform { low, high } => Arc::new(UniformNoise::new(*low, *high)?),
            Self::Histogram { edges, counts } => {
                Arc::new(EmpiricalDistribution::from_histogram(edges.clone(), counts)?)
            }
        })
    }
}

/// How missing pixels are filled before filtering.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissingFill {
    #[default]
    Zero,
    Noise {
        #[serde(default)]
        seed: u64,
        model: NoiseModel,
    },
    /// A distribution passed in code through `with_filler`. Reported only;
    /// it cannot be configured.
    #[serde(skip_deserializing)]
    Injected { seed: u64 },
}

impl MissingFill {
    pub fn filler(&self) -> Result<MissingFiller, ProcessingError> {
        match self {
            Self::Zero => Ok(MissingFiller::zero()),
            Self::Noise { seed, model } => Ok(MissingFiller::noise(model.build()?, *seed)),
            Self::Injected { .. } => Err(ProcessingError::Other(
                "an injected noise fill cannot be rebuilt from options".to_string(),
            )),
        }
    }
}

/// Built form of [`MissingFill`]; also the injection point for custom
/// distributions.
#[derive(Clone, Debug)]
pub struct MissingFiller {
    noise: Option<Arc<dyn NoiseDistribution>>,
    seed: u64,
}

impl MissingFiller {
    pub fn zero() -> Self {
        Self {
            noise: None,
            seed: 0,
        }
    }

    pub fn noise(distribution: Arc<dyn NoiseDistribution>, seed: u64) -> Self {
        Self {
            noise: Some(distribution),
            seed,
        }
    }

    /// How this filler shows up in reported options.
    pub fn reported(&self) -> MissingFill {
        match self.noise {
            None => MissingFill::Zero,
            Some(_) => MissingFill::Injected { seed: self.seed },
        }
    }

    /// Gap-free copy of `image` and the mask of the pixels that were filled.
    pub fn fill(&self, image: &ImageF64) -> (ImageF64, Vec<bool>) {
        let missing = image.missing_mask();
        let mut filled = image.clone();
        match &self.noise {
            None => {
                for (v, &m) in filled.data.iter_mut().zip(&missing) {
                    if m {
                        *v = 0.0;
                    }
                }
            }
            Some(noise) => {
                let mut rng = StdRng::seed_from_u64(self.seed);
                for (v, &m) in filled.data.iter_mut().zip(&missing) {
                    if m {
                        *v = noise.sample(&mut rng);
                    }
                }
            }
        }
        (filled, missing)
    }
}

impl Default for MissingFiller {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_gaps() -> ImageF64 {
        ImageF64::from_vec(3, 2, vec![1.0, f64::NAN, 2.0, f64::NAN, 3.0, 4.0]).unwrap()
    }

    #[test]
    fn zero_fill_reports_mask() {
        let (filled, mask) = MissingFiller::zero().fill(&with_gaps());
        assert_eq!(filled.data, vec![1.0, 0.0, 2.0, 0.0, 3.0, 4.0]);
        assert_eq!(mask, vec![false, true, false, true, false, false]);
    }

    #[test]
    fn noise_fill_is_seeded_and_in_range() {
        let filler = MissingFiller::noise(Arc::new(UniformNoise::new(10.0, 11.0).unwrap()), 7);
        let (a, _) = filler.fill(&with_gaps());
        let (b, _) = filler.fill(&with_gaps());
        assert_eq!(a, b);
        assert!((10.0..11.0).contains(&a.data[1]));
        assert!((10.0..11.0).contains(&a.data[3]));
        assert_eq!(a.data[0], 1.0);
    }

    #[test]
    fn empirical_distribution_only_draws_from_populated_bins() {
        let dist =
            EmpiricalDistribution::from_histogram(vec![0.0, 1.0, 2.0, 3.0], &[0.0, 5.0, 0.0])
                .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let v = dist.sample(&mut rng);
            assert!((1.0..2.0).contains(&v), "v={v}");
        }
    }

    #[test]
    fn empirical_distribution_from_samples_covers_sample_range() {
        let samples = [0.0, 0.5, 1.0, 1.0, f64::NAN, 2.0];
        let dist = EmpiricalDistribution::from_samples(&samples, 4).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let v = dist.sample(&mut rng);
            assert!((0.0..=2.0).contains(&v));
        }
        assert!(EmpiricalDistribution::from_samples(&[f64::NAN], 4).is_err());
    }

    #[test]
    fn invalid_histograms_are_rejected() {
        assert!(EmpiricalDistribution::from_histogram(vec![0.0, 1.0], &[1.0, 2.0]).is_err());
        assert!(EmpiricalDistribution::from_histogram(vec![1.0, 0.0], &[1.0]).is_err());
        assert!(EmpiricalDistribution::from_histogram(vec![0.0, 1.0], &[0.0]).is_err());
        assert!(UniformNoise::new(2.0, 1.0).is_err());
    }

    #[test]
    fn fill_options_deserialize() {
        let fill: MissingFill = serde_json::from_str(
            r#"{"kind": "noise", "seed": 5,
                "model": {"distribution": "uniform", "low": 0.0, "high": 2.0}}"#,
        )
        .unwrap();
        assert_eq!(
            fill,
            MissingFill::Noise {
                seed: 5,
                model: NoiseModel::Uniform {
                    low: 0.0,
                    high: 2.0
                }
            }
        );
        let zero: MissingFill = serde_json::from_str(r#"{"kind": "zero"}"#).unwrap();
        assert_eq!(zero, MissingFill::Zero);
    }

    #[test]
    fn injected_fill_cannot_be_configured() {
        let parsed = serde_json::from_str::<MissingFill>(r#"{"kind": "injected", "seed": 1}"#);
        assert!(parsed.is_err());
        assert!(MissingFill::Injected { seed: 1 }.filler().is_err());
    }
}
