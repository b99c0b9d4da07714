use crate::geometry::PixelCoordinates;
use crate::image::ImageF64;
use nalgebra::{Matrix2, SymmetricEigen};
use std::f64::consts::{FRAC_PI_2, PI};

const EPS: f64 = 1e-12;

/// Intensity-weighted first and second moments over the usable pixels.
pub(super) struct WeightedMoments {
    pub size: f64,
    pub cen_x: f64,
    pub cen_y: f64,
    pub sxx: f64,
    pub syy: f64,
    pub sxy: f64,
}

/// Pixels that take part in the moments: finite value and finite position.
fn usable<'a>(
    image: &'a ImageF64,
    coords: &'a PixelCoordinates,
) -> impl Iterator<Item = (f64, f64, f64)> + 'a {
    image
        .data
        .iter()
        .zip(&coords.x.data)
        .zip(&coords.y.data)
        .filter(|((v, x), y)| v.is_finite() && x.is_finite() && y.is_finite())
        .map(|((&v, &x), &y)| (v, x, y))
}

impl WeightedMoments {
    /// `None` when the usable intensity sum is not positive.
    pub(super) fn accumulate(image: &ImageF64, coords: &PixelCoordinates) -> Option<Self> {
        let (mut size, mut sum_x, mut sum_y) = (0.0, 0.0, 0.0);
        for (v, x, y) in usable(image, coords) {
            size += v;
            sum_x += v * x;
            sum_y += v * y;
        }
        if size <= 0.0 || !size.is_finite() {
            return None;
        }
        let cen_x = sum_x / size;
        let cen_y = sum_y / size;

        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for (v, x, y) in usable(image, coords) {
            let dx = x - cen_x;
            let dy = y - cen_y;
            sxx += v * dx * dx;
            syy += v * dy * dy;
            sxy += v * dx * dy;
        }
        Some(Self {
            size,
            cen_x,
            cen_y,
            sxx: sxx / size,
            syy: syy / size,
            sxy: sxy / size,
        })
    }

    fn is_round(&self) -> bool {
        let d = self.syy - self.sxx;
        let z = (d * d + 4.0 * self.sxy * self.sxy).sqrt();
        z <= EPS * (self.sxx + self.syy).abs().max(EPS)
    }

    /// `(length, width, psi)` from the analytic eigenvalues of the second
    /// moment matrix.
    pub(super) fn axes_closed_form(&self) -> (f64, f64, f64) {
        let d = self.syy - self.sxx;
        let z = (d * d + 4.0 * self.sxy * self.sxy).sqrt();
        let trace = self.sxx + self.syy;
        let length = ((trace + z) / 2.0).max(0.0).sqrt();
        let width = ((trace - z) / 2.0).max(0.0).sqrt();
        let psi = if self.is_round() {
            0.0
        } else {
            normalize_psi(0.5 * (2.0 * self.sxy).atan2(self.sxx - self.syy))
        };
        (length, width, psi)
    }

    /// `(length, width, psi)` from a numeric eigen-decomposition.
    pub(super) fn axes_eigen(&self) -> (f64, f64, f64) {
        let cov = Matrix2::new(self.sxx, self.sxy, self.sxy, self.syy);
        let eig = SymmetricEigen::new(cov);
        let (major, lambda_max, lambda_min) = if eig.eigenvalues[0] >= eig.eigenvalues[1] {
            (eig.eigenvectors.column(0), eig.eigenvalues[0], eig.eigenvalues[1])
        } else {
            (eig.eigenvectors.column(1), eig.eigenvalues[1], eig.eigenvalues[0])
        };
        let length = lambda_max.max(0.0).sqrt();
        let width = lambda_min.max(0.0).sqrt();
        let psi = if self.is_round() {
            0.0
        } else {
            normalize_psi(major[1].atan2(major[0]))
        };
        (length, width, psi)
    }

    /// Skewness and kurtosis of the intensity along the major axis.
    ///
    /// Both are NaN for a zero-length image (a single lit pixel).
    pub(super) fn longitudinal_moments(
        &self,
        image: &ImageF64,
        coords: &PixelCoordinates,
        psi: f64,
        length: f64,
    ) -> (f64, f64) {
        if length <= EPS {
            return (f64::NAN, f64::NAN);
        }
        let (s, c) = psi.sin_cos();
        let (mut m3, mut m4) = (0.0, 0.0);
        for (v, x, y) in usable(image, coords) {
            let long = (x - self.cen_x) * c + (y - self.cen_y) * s;
            let long2 = long * long;
            m3 += v * long2 * long;
            m4 += v * long2 * long2;
        }
        m3 /= self.size;
        m4 /= self.size;
        (m3 / length.powi(3), m4 / length.powi(4))
    }
}

/// Map an axis direction (defined modulo π) into `(-π/2, π/2]`.
fn normalize_psi(angle: f64) -> f64 {
    let mut psi = angle.rem_euclid(PI);
    if psi > FRAC_PI_2 {
        psi -= PI;
    }
    psi
}
