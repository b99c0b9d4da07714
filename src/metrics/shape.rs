//! Metrics built on the shape-parameter oracle.

use super::{MetricInput, MetricOptions, Score};
use crate::angle::{axis_difference_deg, fold_degrees};
use crate::error::ProcessingError;
use crate::image::ImageF64;
use crate::islands::{keep_largest_island, DEFAULT_ISLAND_THRESHOLD};
use crate::shape::{shape_parameters, ImageRole, ShapeParameters};
use std::borrow::Cow;

/// Reference image, island-suppressed when the options ask for it.
fn prepared_reference<'a>(
    input: &MetricInput<'a>,
    options: &MetricOptions,
) -> Cow<'a, ImageF64> {
    if options.kill_isolated_pixels_on_reference {
        Cow::Owned(keep_largest_island(input.reference, options.kill_threshold))
    } else {
        Cow::Borrowed(input.reference)
    }
}

/// Shape parameters of (reference, cleaned).
fn parameter_pair(
    reference: &ImageF64,
    cleaned: &ImageF64,
    input: &MetricInput<'_>,
    options: &MetricOptions,
) -> Result<(ShapeParameters, ShapeParameters), ProcessingError> {
    let implementation = options.hillas_implementation;
    let reference =
        shape_parameters(reference, input.coords, implementation, ImageRole::Reference)?;
    let cleaned = shape_parameters(cleaned, input.coords, implementation, ImageRole::Cleaned)?;
    Ok((reference, cleaned))
}

/// `(field, reference - cleaned)` for every reported shape field.
fn field_deltas(
    reference: &ShapeParameters,
    cleaned: &ShapeParameters,
) -> [(&'static str, f64); 9] {
    let psi_norm = |p: &ShapeParameters| fold_degrees(p.psi.to_degrees());
    [
        ("size", reference.size - cleaned.size),
        ("cen_x", reference.cen_x - cleaned.cen_x),
        ("cen_y", reference.cen_y - cleaned.cen_y),
        ("length", reference.length - cleaned.length),
        ("width", reference.width - cleaned.width),
        ("r", reference.r - cleaned.r),
        ("phi", reference.phi - cleaned.phi),
        ("psi", reference.psi - cleaned.psi),
        ("psi_norm", psi_norm(reference) - psi_norm(cleaned)),
    ]
}

fn named_deltas(
    prefix: &str,
    suffix: &str,
    reference: &ShapeParameters,
    cleaned: &ShapeParameters,
) -> Vec<Score> {
    field_deltas(reference, cleaned)
        .into_iter()
        .map(|(field, value)| Score::new(format!("{prefix}_{field}_{suffix}"), value))
        .collect()
}

pub(super) fn delta_psi(
    input: &MetricInput<'_>,
    options: &MetricOptions,
) -> Result<Vec<Score>, ProcessingError> {
    let reference = prepared_reference(input, options);
    let (reference, cleaned) = parameter_pair(&reference, input.cleaned, input, options)?;
    Ok(vec![Score::new(
        "delta_psi",
        axis_difference_deg(reference.psi, cleaned.psi),
    )])
}

pub(super) fn hillas_delta(
    input: &MetricInput<'_>,
    options: &MetricOptions,
) -> Result<Vec<Score>, ProcessingError> {
    let reference = prepared_reference(input, options);
    let (reference, cleaned) = parameter_pair(&reference, input.cleaned, input, options)?;
    let mut suffix = options.hillas_implementation.id().to_string();
    if options.kill_isolated_pixels_on_reference {
        suffix.push_str("_kill");
    }
    Ok(named_deltas("hillas_delta", &suffix, &reference, &cleaned))
}

/// Like [`hillas_delta`], with the reference always island-suppressed at the
/// default threshold. The cleaned image is compared as is.
pub(super) fn hillas_delta2(
    input: &MetricInput<'_>,
    options: &MetricOptions,
) -> Result<Vec<Score>, ProcessingError> {
    let reference = keep_largest_island(input.reference, DEFAULT_ISLAND_THRESHOLD);
    let (reference, cleaned) = parameter_pair(&reference, input.cleaned, input, options)?;
    let suffix = format!("{}_kill", options.hillas_implementation.id());
    Ok(named_deltas("hillas2_delta", &suffix, &reference, &cleaned))
}
