//! Bridging the gaps between blocks and between trials on the refresh grid.

use crate::error::PreconditionError;
use crate::resample::{linspace, resample_block, upsample_ratio};
use crate::segment::{segment_trial, Segmentation};

/// Refresh-rate flips covering a gap that follows a block.
///
/// The first point is the block's own last flip; it is followed by
/// `round(gap * refresh_rate) - 1` synthetic flips, the last of which sits one
/// refresh period before the next real flip. A gap shorter than half a
/// refresh period rounds to zero frames and is rejected as `GapMismatch`.
pub fn bridge(
    last_flip: f64,
    gap: f64,
    refresh_rate: f64,
    tolerance: f64,
) -> Result<Vec<f64>, PreconditionError> {
    let frames = (gap * refresh_rate).round_ties_even();
    let on_grid = (frames / refresh_rate - gap).abs() < tolerance;
    if !(frames >= 1.0) || !on_grid {
        return Err(PreconditionError::GapMismatch {
            gap,
            frames: frames as i64,
            tolerance,
        });
    }

    let frames = frames as usize;
    let mut points = linspace(last_flip, last_flip + gap, frames + 1, true);
    points.pop();
    Ok(points)
}

/// Concatenate every resampled block with the bridge that follows it.
pub fn stitch_blocks(
    segmentation: &Segmentation<'_>,
    ratio: usize,
    refresh_rate: f64,
    tolerance: f64,
) -> Result<Vec<f64>, PreconditionError> {
    let mut stitched = Vec::new();
    for (block, &gap) in segmentation.blocks.iter().zip(&segmentation.gaps) {
        let Some(&last_flip) = block.last() else {
            return Err(PreconditionError::EmptyTrial);
        };
        stitched.extend(resample_block(block, ratio));
        stitched.extend(bridge(last_flip, gap, refresh_rate, tolerance)?);
    }
    Ok(stitched)
}

/// Per-trial flip times at the refresh rate, including the following inter-trial period.
///
/// # Arguments
/// * `flips` - Recorded flip times of the trial
/// * `frame_rate` - Nominal frame rate of the trial's stimulus (Hz)
/// * `trailing_gap` - Time from the trial's last flip to the next trial's first flip
/// * `refresh_rate` - Target monitor refresh rate (Hz)
/// * `tolerance` - Timing tolerance (seconds)
pub fn reconstruct_trial_flips(
    flips: &[f64],
    frame_rate: f64,
    trailing_gap: f64,
    refresh_rate: f64,
    tolerance: f64,
) -> Result<Vec<f64>, PreconditionError> {
    let ratio = upsample_ratio(refresh_rate, frame_rate)?;
    let segmentation = segment_trial(flips, frame_rate, tolerance, refresh_rate, trailing_gap)?;

    if segmentation.dropped_frame_gaps() > 0 {
        log::warn!(
            "Intra-trial dropped frames detected ({} gap(s)), filling independently at {} Hz",
            segmentation.dropped_frame_gaps(),
            refresh_rate
        );
    }
    log::trace!(
        "Stitching {} block(s) at upsample ratio {}",
        segmentation.blocks.len(),
        ratio
    );

    stitch_blocks(&segmentation, ratio, refresh_rate, tolerance)
}

/// Time from each trial's last flip to the next trial's first flip.
///
/// The final trial has no successor; it gets the median of the measured gaps.
pub fn intertrial_intervals(trials: &[&[f64]]) -> Result<Vec<f64>, PreconditionError> {
    let mut intervals = Vec::with_capacity(trials.len());
    for pair in trials.windows(2) {
        match (pair[0].last(), pair[1].first()) {
            (Some(&last), Some(&first)) => intervals.push(first - last),
            _ => return Err(PreconditionError::EmptyTrial),
        }
    }

    let Some(median) = median(&intervals) else {
        return Err(PreconditionError::MissingIntertrialInterval);
    };
    intervals.push(median);
    Ok(intervals)
}

/// Median with the mean of the two central values for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
