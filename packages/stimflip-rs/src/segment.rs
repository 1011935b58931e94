//! Splitting a trial's flips into runs of uniform inter-flip interval.
//!
//! Hardware occasionally holds a frame on screen for extra refresh periods.
//! Such a hold shows up as an interval far from the nominal frame period; the
//! trial is cut there so each run can be resampled independently and the hold
//! bridged on the refresh grid.

use crate::error::PreconditionError;

/// Blocks of a trial together with the gap that follows each block
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation<'a> {
    pub blocks: Vec<&'a [f64]>,
    /// `gaps[i]` is the time from the last flip of `blocks[i]` to the next real flip
    pub gaps: Vec<f64>,
}

impl Segmentation<'_> {
    /// Number of deviant intervals found inside the trial
    pub fn dropped_frame_gaps(&self) -> usize {
        self.blocks.len().saturating_sub(1)
    }
}

/// Segment one trial's flip times.
///
/// # Arguments
/// * `flips` - Recorded flip times of the trial (seconds)
/// * `frame_rate` - Nominal frame rate of the stimulus (Hz)
/// * `tolerance` - Allowed deviation of an interval from the nominal period (seconds)
/// * `refresh_rate` - Target monitor refresh rate (Hz)
/// * `trailing_gap` - Time from the trial's last flip to the next trial's first flip
///
/// # Returns
/// One block per uniform run; a trial without deviant intervals is a single block.
pub fn segment_trial(
    flips: &[f64],
    frame_rate: f64,
    tolerance: f64,
    refresh_rate: f64,
    trailing_gap: f64,
) -> Result<Segmentation<'_>, PreconditionError> {
    if flips.is_empty() {
        return Err(PreconditionError::EmptyTrial);
    }

    let period = 1.0 / frame_rate;
    let mut blocks = Vec::new();
    let mut gaps = Vec::new();
    let mut start = 0;

    for (i, pair) in flips.windows(2).enumerate() {
        let interval = pair[1] - pair[0];
        let deviant = (interval - period).abs() > tolerance;
        if !deviant {
            continue;
        }

        // a held frame must last a whole number of refresh periods
        let frames = interval * refresh_rate;
        if !((frames.round_ties_even() - frames).abs() / refresh_rate < tolerance) {
            return Err(PreconditionError::NonIntegerDroppedFrames {
                gap: interval,
                frames,
            });
        }

        blocks.push(&flips[start..=i]);
        gaps.push(interval);
        start = i + 1;
    }

    blocks.push(&flips[start..]);
    gaps.push(trailing_gap);

    for block in &blocks {
        check_block_rate(block, period, tolerance)?;
    }

    Ok(Segmentation { blocks, gaps })
}

/// Every interval inside a block must sit strictly within tolerance of the period.
fn check_block_rate(block: &[f64], period: f64, tolerance: f64) -> Result<(), PreconditionError> {
    for pair in block.windows(2) {
        let interval = pair[1] - pair[0];
        if !((interval - period).abs() < tolerance) {
            return Err(PreconditionError::FrameRateDeviation {
                interval,
                expected: period,
                tolerance,
            });
        }
    }
    Ok(())
}
