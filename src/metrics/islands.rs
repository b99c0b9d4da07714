use super::{MetricInput, MetricOptions, Score};
use crate::error::ProcessingError;
use crate::islands::{count_islands, island_suppression_stats};

/// What the isolated-pixel filter would remove from the cleaned image.
pub(super) fn kill_isolated_pixels(
    input: &MetricInput<'_>,
    options: &MetricOptions,
) -> Result<Vec<Score>, ProcessingError> {
    let stats = island_suppression_stats(input.cleaned, options.kill_threshold);
    Ok(vec![
        Score::new("kill_isolated_pixels_delta_sum", stats.delta_sum),
        Score::new("kill_isolated_pixels_delta_abs_sum", stats.delta_abs_sum),
        Score::new(
            "kill_isolated_pixels_delta_num_pixels",
            stats.delta_pixel_count as f64,
        ),
    ])
}

pub(super) fn num_islands(
    input: &MetricInput<'_>,
    options: &MetricOptions,
) -> Result<Vec<Score>, ProcessingError> {
    let count = count_islands(input.cleaned, options.kill_threshold);
    Ok(vec![Score::new("num_islands", count as f64)])
}
