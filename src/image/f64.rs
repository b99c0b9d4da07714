//! Owned single-channel f64 image in row-major layout (stride == width).
//!
//! NaN cells mark *missing* pixels (positions outside the active sensor
//! area). They are carried through every operation untouched unless a
//! function says otherwise; the `finite_*` helpers skip them.
use crate::error::ProcessingError;

#[derive(Clone, Debug, PartialEq)]
pub struct ImageF64 {
    /// Image width in pixels
    pub w: usize,
    /// Image height in pixels
    pub h: usize,
    /// Number of f64 elements between consecutive rows (equals `w`)
    pub stride: usize,
    /// Backing storage in row-major order
    pub data: Vec<f64>,
}

impl ImageF64 {
    /// Construct a zero-initialized buffer of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self::filled(w, h, 0.0)
    }

    /// Construct a `w × h` buffer where every pixel holds `value`.
    pub fn filled(w: usize, h: usize, value: f64) -> Self {
        Self {
            w,
            h,
            stride: w,
            data: vec![value; w * h],
        }
    }

    /// Wrap a row-major buffer, checking that it matches `w × h`.
    pub fn from_vec(w: usize, h: usize, data: Vec<f64>) -> Result<Self, ProcessingError> {
        if data.len() != w * h {
            return Err(ProcessingError::wrong_dimension(&[h, w, data.len()]));
        }
        Ok(Self {
            w,
            h,
            stride: w,
            data,
        })
    }

    /// Build an image from nested rows. Ragged rows are rejected.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ProcessingError> {
        let h = rows.len();
        let w = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(w * h);
        for row in rows {
            if row.len() != w {
                return Err(ProcessingError::wrong_dimension(&[h, w, row.len()]));
            }
            data.extend_from_slice(row);
        }
        Self::from_vec(w, h, data)
    }

    /// `[height, width]`, numpy-style.
    #[inline]
    pub fn shape(&self) -> [usize; 2] {
        [self.h, self.w]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.w * self.h
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    #[inline]
    pub fn same_shape(&self, other: &ImageF64) -> bool {
        self.w == other.w && self.h == other.h
    }

    #[inline]
    /// Convert (x, y) to a linear index into `data`.
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.stride + x
    }
    #[inline]
    /// Get the pixel value at (x, y).
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[self.idx(x, y)]
    }
    #[inline]
    /// Set the pixel value at (x, y).
    pub fn set(&mut self, x: usize, y: usize, v: f64) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    /// Copy with `f` applied to every pixel.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            w: self.w,
            h: self.h,
            stride: self.stride,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Copy with missing pixels replaced by zero.
    pub fn nan_to_zero(&self) -> Self {
        self.map(|v| if v.is_nan() { 0.0 } else { v })
    }

    /// Boolean mask (row-major) of missing pixels.
    pub fn missing_mask(&self) -> Vec<bool> {
        self.data.iter().map(|v| v.is_nan()).collect()
    }

    pub fn has_missing(&self) -> bool {
        self.data.iter().any(|v| v.is_nan())
    }

    /// Put NaN back wherever `mask` is set.
    pub fn restore_missing(&mut self, mask: &[bool]) {
        debug_assert_eq!(mask.len(), self.data.len());
        for (v, &missing) in self.data.iter_mut().zip(mask) {
            if missing {
                *v = f64::NAN;
            }
        }
    }

    /// Sum over finite pixels (numpy `nansum`).
    pub fn finite_sum(&self) -> f64 {
        self.data.iter().filter(|v| v.is_finite()).sum()
    }

    /// `(min, max)` over finite pixels, `None` when there are none.
    pub fn finite_min_max(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

impl crate::image::traits::ImageView for ImageF64 {
    type Pixel = f64;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn row(&self, y: usize) -> &[f64] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_rejects_ragged_input() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        let err = ImageF64::from_rows(&rows).unwrap_err();
        assert_eq!(err.kind(), "WrongDimension");
    }

    #[test]
    fn finite_helpers_skip_missing_pixels() {
        let img = ImageF64::from_rows(&[vec![1.0, f64::NAN], vec![-2.0, 4.0]]).unwrap();
        assert_eq!(img.finite_sum(), 3.0);
        assert_eq!(img.finite_min_max(), Some((-2.0, 4.0)));
        assert!(img.has_missing());

        let mut filled = img.nan_to_zero();
        assert_eq!(filled.get(1, 0), 0.0);
        filled.restore_missing(&img.missing_mask());
        assert!(filled.get(1, 0).is_nan());
    }

    #[test]
    fn all_missing_image_has_no_range() {
        let img = ImageF64::filled(3, 2, f64::NAN);
        assert_eq!(img.finite_min_max(), None);
        assert_eq!(img.finite_sum(), 0.0);
    }
}
