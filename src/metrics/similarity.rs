//! Structural similarity and peak signal-to-noise ratio.
//!
//! Both work on copies with missing pixels replaced by zero.

use super::{MetricInput, MetricOptions, Score};
use crate::error::ProcessingError;
use crate::image::{reflect_index, ImageF64, ImageView};

/// Gaussian window sigma for SSIM.
pub const SSIM_SIGMA: f64 = 0.5;
/// Window truncation, in sigmas.
const SSIM_TRUNCATE: f64 = 3.5;
const SSIM_K1: f64 = 0.01;
const SSIM_K2: f64 = 0.03;
/// Fixed peak value for PSNR.
pub const PSNR_DATA_RANGE: f64 = 1000.0;

fn gaussian_taps(sigma: f64, truncate: f64) -> Vec<f64> {
    let radius = (truncate * sigma + 0.5) as isize;
    let mut taps: Vec<f64> = (-radius..=radius)
        .map(|i| {
            let x = i as f64;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let norm: f64 = taps.iter().sum();
    taps.iter_mut().for_each(|t| *t /= norm);
    taps
}

/// Separable convolution with reflected borders.
fn gaussian_filter(src: &ImageF64, taps: &[f64]) -> ImageF64 {
    let (w, h) = (src.w, src.h);
    let r = (taps.len() / 2) as isize;
    let mut tmp = ImageF64::new(w, h);
    for y in 0..h {
        let row = src.row(y);
        for x in 0..w {
            let mut acc = 0.0;
            for (k, t) in taps.iter().enumerate() {
                acc += t * row[reflect_index(x as isize + k as isize - r, w)];
            }
            tmp.set(x, y, acc);
        }
    }
    let mut dst = ImageF64::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, t) in taps.iter().enumerate() {
                acc += t * tmp.get(x, reflect_index(y as isize + k as isize - r, h));
            }
            dst.set(x, y, acc);
        }
    }
    dst
}

/// Mean SSIM of two gap-free images of equal shape.
///
/// Local statistics use a normalised Gaussian window and population
/// (co)variances. The data range is `max - min` of `reference`, or 1 when the
/// reference is constant. The mean is taken after cropping the window radius
/// from every border, so images smaller than the window are rejected.
pub fn ssim_filled(cleaned: &ImageF64, reference: &ImageF64) -> Result<f64, ProcessingError> {
    if !cleaned.same_shape(reference) {
        return Err(ProcessingError::wrong_dimension(&cleaned.shape()));
    }
    let taps = gaussian_taps(SSIM_SIGMA, SSIM_TRUNCATE);
    let win = taps.len();
    if cleaned.w < win || cleaned.h < win {
        return Err(ProcessingError::Other(format!(
            "ssim window of {win} pixels exceeds image shape {:?}",
            cleaned.shape()
        )));
    }

    let data_range = match reference.finite_min_max() {
        Some((lo, hi)) if hi > lo => hi - lo,
        _ => 1.0,
    };
    let c1 = (SSIM_K1 * data_range).powi(2);
    let c2 = (SSIM_K2 * data_range).powi(2);

    let product = |a: &ImageF64, b: &ImageF64| {
        let data = a.data.iter().zip(&b.data).map(|(x, y)| x * y).collect();
        ImageF64 {
            data,
            ..a.clone()
        }
    };
    let ux = gaussian_filter(cleaned, &taps);
    let uy = gaussian_filter(reference, &taps);
    let uxx = gaussian_filter(&product(cleaned, cleaned), &taps);
    let uyy = gaussian_filter(&product(reference, reference), &taps);
    let uxy = gaussian_filter(&product(cleaned, reference), &taps);

    let pad = win / 2;
    let (mut acc, mut n) = (0.0, 0usize);
    for y in pad..cleaned.h - pad {
        for x in pad..cleaned.w - pad {
            let (mx, my) = (ux.get(x, y), uy.get(x, y));
            let vx = uxx.get(x, y) - mx * mx;
            let vy = uyy.get(x, y) - my * my;
            let vxy = uxy.get(x, y) - mx * my;
            let num = (2.0 * mx * my + c1) * (2.0 * vxy + c2);
            let den = (mx * mx + my * my + c1) * (vx + vy + c2);
            acc += num / den;
            n += 1;
        }
    }
    Ok(acc / n as f64)
}

/// PSNR against the fixed peak [`PSNR_DATA_RANGE`]; `+inf` for identical
/// images.
pub fn psnr_filled(cleaned: &ImageF64, reference: &ImageF64) -> Result<f64, ProcessingError> {
    if !cleaned.same_shape(reference) {
        return Err(ProcessingError::wrong_dimension(&cleaned.shape()));
    }
    if cleaned.is_empty() {
        return Err(ProcessingError::wrong_dimension(&cleaned.shape()));
    }
    let sse: f64 = cleaned
        .data
        .iter()
        .zip(&reference.data)
        .map(|(a, b)| (a - b) * (a - b))
        .sum();
    let mse = sse / cleaned.len() as f64;
    if mse == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(10.0 * (PSNR_DATA_RANGE * PSNR_DATA_RANGE / mse).log10())
}

pub(super) fn ssim(
    input: &MetricInput<'_>,
    _: &MetricOptions,
) -> Result<Vec<Score>, ProcessingError> {
    let value = ssim_filled(&input.cleaned.nan_to_zero(), &input.reference.nan_to_zero())?;
    Ok(vec![Score::new("ssim", value)])
}

pub(super) fn psnr(
    input: &MetricInput<'_>,
    _: &MetricOptions,
) -> Result<Vec<Score>, ProcessingError> {
    let value = psnr_filled(&input.cleaned.nan_to_zero(), &input.reference.nan_to_zero())?;
    Ok(vec![Score::new("psnr", value)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taps_cover_two_pixel_radius_and_sum_to_one() {
        let taps = gaussian_taps(SSIM_SIGMA, SSIM_TRUNCATE);
        assert_eq!(taps.len(), 5);
        assert!((taps.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((taps[0] - taps[4]).abs() < 1e-15);
    }

    #[test]
    fn gaussian_filter_preserves_constants() {
        let img = ImageF64::filled(6, 5, 3.0);
        let out = gaussian_filter(&img, &gaussian_taps(SSIM_SIGMA, SSIM_TRUNCATE));
        assert!(out.data.iter().all(|v| (v - 3.0).abs() < 1e-12));
    }
}
