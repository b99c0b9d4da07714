//! Angle utilities shared by the orientation metrics.

/// Folds an angle in degrees into `[0, 90]`, treating directions that differ
/// by 180° as identical: `|((a + 90) mod 180) - 90|` with a floored modulo.
#[inline]
pub fn fold_degrees(angle_deg: f64) -> f64 {
    ((angle_deg + 90.0).rem_euclid(180.0) - 90.0).abs()
}

/// Smallest unsigned difference, in degrees within `[0, 90]`, between two
/// axis orientations given in radians.
#[inline]
pub fn axis_difference_deg(a_rad: f64, b_rad: f64) -> f64 {
    fold_degrees((a_rad - b_rad).to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn fold_degrees_basic() {
        assert!(approx_eq(fold_degrees(0.0), 0.0));
        assert!(approx_eq(fold_degrees(30.0), 30.0));
        assert!(approx_eq(fold_degrees(-30.0), 30.0));
        assert!(approx_eq(fold_degrees(90.0), 90.0));
        assert!(approx_eq(fold_degrees(120.0), 60.0));
        assert!(approx_eq(fold_degrees(180.0), 0.0));
        assert!(approx_eq(fold_degrees(-170.0), 10.0));
        assert!(approx_eq(fold_degrees(390.0), 30.0));
    }

    #[test]
    fn axis_difference_is_symmetric() {
        let a = 0.25f64;
        let b = 1.7f64;
        assert!(approx_eq(
            axis_difference_deg(a, b),
            axis_difference_deg(b, a)
        ));
    }

    #[test]
    fn axis_difference_handles_wrap() {
        use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
        assert!(approx_eq(axis_difference_deg(0.0, PI), 0.0));
        assert!(approx_eq(axis_difference_deg(0.0, FRAC_PI_2), 90.0));
        assert!(approx_eq(axis_difference_deg(FRAC_PI_4, -FRAC_PI_4), 90.0));
        assert!(approx_eq(axis_difference_deg(1.5, -1.5), fold_degrees(3f64.to_degrees())));
    }
}
