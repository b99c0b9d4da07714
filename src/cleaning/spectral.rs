//! Fourier-domain cleaning.
//!
//! The gap-filled image goes through a 2D FFT (row pass, then column pass).
//! Coefficients whose magnitude is below the threshold are zeroed and the
//! inverse transform's real part becomes the cleaned image.

use super::noise::{MissingFill, MissingFiller};
use super::{ensure_non_degenerate, options_value, Cleaned, CleaningAlgorithm, IslandFilter};
use crate::diagnostics::{elapsed_ms, CleaningDiagnostics};
use crate::error::ProcessingError;
use crate::image::ImageF64;
use crate::islands::DEFAULT_ISLAND_THRESHOLD;
use log::debug;
use rustfft::{num_complex::Complex, FftDirection, FftPlanner};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

pub(super) const NAME: &str = "spectral";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralOptions {
    /// Coefficients with a magnitude below this are zeroed. Zero keeps all.
    pub threshold: f64,
    /// Move the zero frequency to the centre of the spectrum before
    /// thresholding.
    pub shift: bool,
    pub fill: MissingFill,
    pub kill_isolated_pixels: bool,
    pub island_threshold: f64,
}

impl Default for SpectralOptions {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            shift: false,
            fill: MissingFill::default(),
            kill_isolated_pixels: false,
            island_threshold: DEFAULT_ISLAND_THRESHOLD,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SpectralFilter {
    options: SpectralOptions,
    filler: MissingFiller,
    islands: IslandFilter,
}

impl SpectralFilter {
    pub fn new(options: SpectralOptions) -> Result<Self, ProcessingError> {
        if options.threshold.is_nan() || options.threshold < 0.0 {
            return Err(ProcessingError::Other(format!(
                "spectral threshold must be >= 0, got {}",
                options.threshold
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

    /// Replace the configured missing-pixel filler, e.g. with a custom
    /// [`NoiseDistribution`](super::NoiseDistribution).
    pub fn with_filler(mut self, filler: MissingFiller) -> Self {
        self.options.fill = filler.reported();
        self.filler = filler;
        self
    }
}

/// In-place 2D FFT of a row-major `w`×`h` buffer. The inverse is unscaled.
fn fft_2d(data: &mut [Complex<f64>], w: usize, h: usize, direction: FftDirection) {
    let mut planner = FftPlanner::new();
    let row_fft = planner.plan_fft(w, direction);
    let col_fft = planner.plan_fft(h, direction);

    for row in data.chunks_exact_mut(w) {
        row_fft.process(row);
    }

    let mut column = vec![Complex::new(0.0, 0.0); h];
    for x in 0..w {
        for (y, c) in column.iter_mut().enumerate() {
            *c = data[y * w + x];
        }
        col_fft.process(&mut column);
        for (y, c) in column.iter().enumerate() {
            data[y * w + x] = *c;
        }
    }
}

/// Cyclic shift by `(dx, dy)`.
fn roll(data: &[Complex<f64>], w: usize, h: usize, dx: usize, dy: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::new(0.0, 0.0); data.len()];
    for y in 0..h {
        let ty = (y + dy) % h;
        for x in 0..w {
            out[ty * w + (x + dx) % w] = data[y * w + x];
        }
    }
    out
}

impl CleaningAlgorithm for SpectralFilter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn options(&self) -> Value {
        options_value(&self.options)
    }

    fn clean(&self, image: &ImageF64) -> Result<Cleaned, ProcessingError> {
        ensure_non_degenerate(image)?;
        let start = Instant::now();
        let (w, h) = (image.w, image.h);
        let mut diagnostics = CleaningDiagnostics::default();

        let (filled, missing) = diagnostics.timings.time("fill", || self.filler.fill(image));

        let mut spectrum: Vec<Complex<f64>> = diagnostics.timings.time("fft", || {
            let mut buf: Vec<Complex<f64>> =
                filled.data.iter().map(|&v| Complex::new(v, 0.0)).collect();
            fft_2d(&mut buf, w, h, FftDirection::Forward);
            buf
        });

        let threshold = self.options.threshold;
        let zeroed = diagnostics.timings.time("threshold", || {
            if self.options.shift {
                spectrum = roll(&spectrum, w, h, w / 2, h / 2);
            }
            let mut zeroed = 0usize;
            for c in spectrum.iter_mut() {
                if c.norm() < threshold {
                    *c = Complex::new(0.0, 0.0);
                    zeroed += 1;
                }
            }
            if self.options.shift {
                spectrum = roll(&spectrum, w, h, w - w / 2, h - h / 2);
            }
            zeroed
        });
        diagnostics.count("zeroed_coefficients", zeroed as f64);
        diagnostics.count("kept_coefficients", (spectrum.len() - zeroed) as f64);

        let mut cleaned = diagnostics.timings.time("ifft", || {
            fft_2d(&mut spectrum, w, h, FftDirection::Inverse);
            let norm = 1.0 / (w * h) as f64;
            let data = spectrum.iter().map(|c| c.re * norm).collect();
            ImageF64 {
                w,
                h,
                stride: w,
                data,
            }
        });
        cleaned.restore_missing(&missing);

        let image = self.islands.apply(cleaned, &mut diagnostics);
        diagnostics.timings.total_ms = elapsed_ms(start);
        debug!(
            "spectral filter zeroed {zeroed}/{} coefficients in {:.3} ms",
            w * h,
            diagnostics.timings.total_ms
        );
        Ok(Cleaned { image, diagnostics })
    }
}
