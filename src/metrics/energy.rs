//! Energy-domain metrics: where the signal is (`e_shape`) and how much of it
//! survived (`e_energy`, `sspd`).

use super::{mean_over_pairs, MetricInput, MetricOptions, Score};
use crate::error::ProcessingError;

/// Finite intensity sums of (cleaned, reference), reference checked positive.
fn checked_sums(input: &MetricInput<'_>) -> Result<(f64, f64), ProcessingError> {
    let reference = input.reference.finite_sum();
    if reference <= 0.0 {
        return Err(ProcessingError::EmptyReferenceImage);
    }
    Ok((input.cleaned.finite_sum(), reference))
}

/// Signed relative energy difference `(Σc - Σr) / Σr`.
pub(crate) fn signed_energy_delta(input: &MetricInput<'_>) -> Result<f64, ProcessingError> {
    let (cleaned, reference) = checked_sums(input)?;
    Ok((cleaned - reference) / reference)
}

pub(super) fn e_shape(
    input: &MetricInput<'_>,
    _: &MetricOptions,
) -> Result<Vec<Score>, ProcessingError> {
    let cleaned_sum = input.cleaned.finite_sum();
    if cleaned_sum <= 0.0 {
        return Err(ProcessingError::EmptyOutputImage);
    }
    let reference_sum = input.reference.finite_sum();
    if reference_sum <= 0.0 {
        return Err(ProcessingError::EmptyReferenceImage);
    }
    let value = mean_over_pairs(input.cleaned, input.reference, |c, r| {
        (c / cleaned_sum - r / reference_sum).abs()
    });
    Ok(vec![Score::new("e_shape", value)])
}

pub(super) fn e_energy(
    input: &MetricInput<'_>,
    _: &MetricOptions,
) -> Result<Vec<Score>, ProcessingError> {
    Ok(vec![Score::new("e_energy", signed_energy_delta(input)?.abs())])
}

pub(super) fn sspd(
    input: &MetricInput<'_>,
    _: &MetricOptions,
) -> Result<Vec<Score>, ProcessingError> {
    Ok(vec![Score::new("sspd", signed_energy_delta(input)?)])
}
