//! Extending stimulus flips over the full image-acquisition window.

use crate::error::PreconditionError;
use crate::resample::linspace;
use crate::types::ScanFrames;

/// Span of time during which the microscope was acquiring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquisitionWindow {
    pub onset: f64,
    pub offset: f64,
}

/// Compute the acquisition window of a scan.
///
/// Frame timestamps mark the first depth of each frame, so the offset adds the
/// time needed for the remaining depths of the final frame, plus
/// `extra_trailing_frames` depth periods for scans whose acquisition was cut
/// short.
pub fn acquisition_window(
    frames: &ScanFrames,
    extra_trailing_frames: u32,
) -> Result<AcquisitionWindow, PreconditionError> {
    let times = &frames.frame_times;
    if times.len() < 2 {
        return Err(PreconditionError::InvalidAcquisitionWindow(format!(
            "need at least 2 frame times, got {}",
            times.len()
        )));
    }
    if frames.ndepths == 0 {
        return Err(PreconditionError::InvalidAcquisitionWindow(
            "ndepths must be at least 1".to_string(),
        ));
    }

    let onset = times[0];
    let last = times[times.len() - 1];
    let mean_frame_interval =
        times.windows(2).map(|w| w[1] - w[0]).sum::<f64>() / (times.len() - 1) as f64;
    let interdepth = mean_frame_interval / frames.ndepths as f64;
    let extra = (frames.ndepths - 1 + extra_trailing_frames) as f64;
    let offset = last + extra * interdepth;

    if !(offset >= onset) {
        return Err(PreconditionError::InvalidAcquisitionWindow(format!(
            "offset {} precedes onset {}",
            offset, onset
        )));
    }

    Ok(AcquisitionWindow { onset, offset })
}

/// Mean refresh rate measured on the stimulus clock.
///
/// Only trials whose mean flip rate exceeds 75% of the estimated refresh rate
/// contribute; lower-rate stimuli would bias the estimate.
pub fn empirical_refresh_rate(
    trials: &[&[f64]],
    est_refresh_rate: f64,
) -> Result<f64, PreconditionError> {
    let mut total = 0.0;
    let mut count = 0usize;

    for flips in trials {
        if flips.len() < 2 {
            continue;
        }
        let span: f64 = flips.windows(2).map(|w| w[1] - w[0]).sum();
        let intervals = flips.len() - 1;
        let rate = intervals as f64 / span;
        if rate > 0.75 * est_refresh_rate {
            total += span;
            count += intervals;
        }
    }

    if count == 0 || !(total > 0.0) {
        return Err(PreconditionError::NoRefreshRateTrials {
            refresh_rate: est_refresh_rate,
        });
    }
    Ok(count as f64 / total)
}

/// Stitched flips with synthetic padding on both sides
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedFlips {
    pub flips: Vec<f64>,
    pub prepad_len: usize,
    pub postpad_len: usize,
}

/// Pad flips at `rate` so they cover `window`.
///
/// The prepad ends one period before the first flip and the postpad starts one
/// period after the last, so no timestamp appears twice. Flips already
/// reaching past a window edge get no padding on that side.
pub fn pad_to_window(
    flips: &[f64],
    window: AcquisitionWindow,
    rate: f64,
) -> Result<PaddedFlips, PreconditionError> {
    let (Some(&first), Some(&last)) = (flips.first(), flips.last()) else {
        return Err(PreconditionError::EmptyTrial);
    };

    let prepad_len = pad_frames(first - window.onset, rate);
    let prepad = linspace(first - prepad_len as f64 / rate, first, prepad_len, false);

    let postpad_len = pad_frames(window.offset - last, rate);
    let postpad = linspace(last, last + postpad_len as f64 / rate, postpad_len + 1, true);

    let mut padded = Vec::with_capacity(prepad_len + flips.len() + postpad_len);
    padded.extend(prepad);
    padded.extend_from_slice(flips);
    padded.extend(postpad.into_iter().skip(1));

    Ok(PaddedFlips {
        flips: padded,
        prepad_len,
        postpad_len,
    })
}

fn pad_frames(duration: f64, rate: f64) -> usize {
    let frames = (duration * rate).ceil();
    if frames > 0.0 {
        frames as usize
    } else {
        0
    }
}
