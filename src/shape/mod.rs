//! Moment-based shape ("Hillas") parameters of an image.
//!
//! The metric engine treats this as a numeric oracle: give it an image, its
//! pixel coordinates and an implementation selector, get back centroid,
//! principal axes, orientation and higher moments. Two implementations are
//! provided and agree to floating tolerance:
//! - [`HillasImplementation::Moments`] (id 1) uses the closed-form solution of
//!   the 2×2 second-moment problem;
//! - [`HillasImplementation::Eigen`] (id 2) diagonalises the weighted
//!   covariance matrix with `nalgebra`.
//!
//! Missing pixels (and pixels whose coordinates are missing) are skipped, so
//! a NaN border around an image does not change its parameters.

mod moments;

use crate::error::ProcessingError;
use crate::geometry::PixelCoordinates;
use crate::image::ImageF64;
use moments::WeightedMoments;
use serde::{Deserialize, Serialize};

/// Which moment-computation strategy to use. Serialised as its integer id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum HillasImplementation {
    Moments,
    #[default]
    Eigen,
}

impl HillasImplementation {
    pub fn id(self) -> u8 {
        match self {
            Self::Moments => 1,
            Self::Eigen => 2,
        }
    }
}

impl TryFrom<u8> for HillasImplementation {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Self::Moments),
            2 => Ok(Self::Eigen),
            other => Err(format!("unknown shape-parameter implementation {other}")),
        }
    }
}

impl From<HillasImplementation> for u8 {
    fn from(value: HillasImplementation) -> Self {
        value.id()
    }
}

/// Which image is being parameterised; picks the error for empty images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageRole {
    Cleaned,
    Reference,
}

impl ImageRole {
    fn empty_error(self) -> ProcessingError {
        match self {
            Self::Cleaned => ProcessingError::EmptyOutputImage,
            Self::Reference => ProcessingError::EmptyReferenceImage,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ShapeParameters {
    /// Total intensity.
    pub size: f64,
    pub cen_x: f64,
    pub cen_y: f64,
    /// Standard deviation along the major axis.
    pub length: f64,
    /// Standard deviation along the minor axis.
    pub width: f64,
    /// Distance of the centroid from the origin.
    pub r: f64,
    /// Azimuth of the centroid, radians.
    pub phi: f64,
    /// Major-axis orientation, radians in `(-π/2, π/2]`.
    pub psi: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

/// Compute the shape parameters of `image`.
///
/// Fails with the empty-image error of `role` when the finite intensity sum
/// is not positive, and with `WrongDimension` when `coords` does not match.
pub fn shape_parameters(
    image: &ImageF64,
    coords: &PixelCoordinates,
    implementation: HillasImplementation,
    role: ImageRole,
) -> Result<ShapeParameters, ProcessingError> {
    coords.check_matches(image)?;
    let m = WeightedMoments::accumulate(image, coords).ok_or_else(|| role.empty_error())?;

    let (length, width, psi) = match implementation {
        HillasImplementation::Moments => m.axes_closed_form(),
        HillasImplementation::Eigen => m.axes_eigen(),
    };
    let (skewness, kurtosis) = m.longitudinal_moments(image, coords, psi, length);

    Ok(ShapeParameters {
        size: m.size,
        cen_x: m.cen_x,
        cen_y: m.cen_y,
        length,
        width,
        r: m.cen_x.hypot(m.cen_y),
        phi: m.cen_y.atan2(m.cen_x),
        psi,
        skewness,
        kurtosis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Elongated blob along the direction `angle`, centred at (cx, cy).
    fn ellipse(w: usize, h: usize, cx: f64, cy: f64, angle: f64) -> ImageF64 {
        let mut img = ImageF64::new(w, h);
        let (s, c) = angle.sin_cos();
        for y in 0..h {
            for x in 0..w {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                let along = dx * c + dy * s;
                let across = -dx * s + dy * c;
                let v = (-(along * along) / 8.0 - (across * across) / 1.0).exp();
                img.set(x, y, if v > 1e-3 { v } else { 0.0 });
            }
        }
        img
    }

    #[test]
    fn implementations_agree() {
        let img = ellipse(21, 21, 10.0, 9.0, 0.6);
        let coords = PixelCoordinates::grid(21, 21);
        let a = shape_parameters(&img, &coords, HillasImplementation::Moments, ImageRole::Cleaned)
            .unwrap();
        let b = shape_parameters(&img, &coords, HillasImplementation::Eigen, ImageRole::Cleaned)
            .unwrap();
        for (x, y) in [
            (a.size, b.size),
            (a.cen_x, b.cen_x),
            (a.cen_y, b.cen_y),
            (a.length, b.length),
            (a.width, b.width),
            (a.psi, b.psi),
            (a.skewness, b.skewness),
            (a.kurtosis, b.kurtosis),
        ] {
            assert!((x - y).abs() < 1e-6, "{x} vs {y}");
        }
        assert!((a.psi - 0.6).abs() < 1e-2, "psi={}", a.psi);
        assert!(a.length > a.width);
    }

    #[test]
    fn missing_border_does_not_change_result() {
        let core = ellipse(9, 9, 4.0, 4.0, -0.4);
        let mut padded = ImageF64::filled(11, 11, f64::NAN);
        for y in 0..9 {
            for x in 0..9 {
                padded.set(x + 1, y + 1, core.get(x, y));
            }
        }
        let core_coords = PixelCoordinates::grid(9, 9);
        let mut padded_coords = PixelCoordinates::grid(11, 11);
        padded_coords.x.data.iter_mut().for_each(|v| *v -= 1.0);
        padded_coords.y.data.iter_mut().for_each(|v| *v -= 1.0);
        for imp in [HillasImplementation::Moments, HillasImplementation::Eigen] {
            let a = shape_parameters(&core, &core_coords, imp, ImageRole::Cleaned).unwrap();
            let b = shape_parameters(&padded, &padded_coords, imp, ImageRole::Cleaned).unwrap();
            assert!(approx_eq(a.cen_x, b.cen_x));
            assert!(approx_eq(a.length, b.length));
            assert!(approx_eq(a.psi, b.psi));
        }
    }

    #[test]
    fn vertical_line_has_half_pi_orientation() {
        let mut img = ImageF64::new(5, 5);
        for y in 0..5 {
            img.set(2, y, 1.0);
        }
        let coords = PixelCoordinates::grid(5, 5);
        for imp in [HillasImplementation::Moments, HillasImplementation::Eigen] {
            let p = shape_parameters(&img, &coords, imp, ImageRole::Cleaned).unwrap();
            assert!(approx_eq(p.psi.abs(), FRAC_PI_2), "psi={}", p.psi);
            assert!(approx_eq(p.width, 0.0));
            assert!(approx_eq(p.length, 2f64.sqrt()));
            assert!(approx_eq(p.skewness, 0.0));
        }
    }

    #[test]
    fn diagonal_line_and_centroid_polar_coordinates() {
        let mut img = ImageF64::new(4, 4);
        for i in 0..4 {
            img.set(i, i, 2.0);
        }
        let coords = PixelCoordinates::grid(4, 4);
        let p = shape_parameters(&img, &coords, HillasImplementation::Moments, ImageRole::Cleaned)
            .unwrap();
        assert!(approx_eq(p.size, 8.0));
        assert!(approx_eq(p.psi, FRAC_PI_4));
        assert!(approx_eq(p.r, 1.5 * 2f64.sqrt()));
        assert!(approx_eq(p.phi, FRAC_PI_4));
    }

    #[test]
    fn empty_image_error_depends_on_role() {
        let img = ImageF64::new(3, 3);
        let coords = PixelCoordinates::grid(3, 3);
        let err = shape_parameters(&img, &coords, HillasImplementation::Eigen, ImageRole::Cleaned)
            .unwrap_err();
        assert_eq!(err, ProcessingError::EmptyOutputImage);
        let err =
            shape_parameters(&img, &coords, HillasImplementation::Eigen, ImageRole::Reference)
                .unwrap_err();
        assert_eq!(err, ProcessingError::EmptyReferenceImage);
    }

    #[test]
    fn implementation_ids_round_trip_through_serde() {
        let json = serde_json::to_string(&HillasImplementation::Moments).unwrap();
        assert_eq!(json, "1");
        let back: HillasImplementation = serde_json::from_str("2").unwrap();
        assert_eq!(back, HillasImplementation::Eigen);
        assert!(serde_json::from_str::<HillasImplementation>("7").is_err());
    }
}
