//! Upsampling uniform flip blocks to the monitor refresh grid.

use crate::error::PreconditionError;

/// Integer number of refresh periods per stimulus frame.
///
/// The refresh rate must be an exact integer multiple of the frame rate; no
/// rounding is applied.
pub fn upsample_ratio(refresh_rate: f64, frame_rate: f64) -> Result<usize, PreconditionError> {
    let ratio = refresh_rate / frame_rate;
    if !ratio.is_finite() || ratio < 1.0 || ratio.fract() != 0.0 {
        return Err(PreconditionError::NonIntegerRateRatio {
            refresh_rate,
            frame_rate,
        });
    }
    Ok(ratio as usize)
}

/// Resample one block to `ratio` points per recorded frame.
///
/// The recorded flips sit at refresh indices `0, ratio, 2*ratio, ...` and every
/// integer index in between is linearly interpolated from its two neighbours.
/// The block's final flip is not emitted; it opens the bridge that follows the
/// block. Recorded flips are reproduced exactly.
pub fn resample_block(block: &[f64], ratio: usize) -> Vec<f64> {
    if block.len() < 2 || ratio == 0 {
        return Vec::new();
    }
    if ratio == 1 {
        return block[..block.len() - 1].to_vec();
    }

    let span = ratio as f64;
    let mut resampled = Vec::with_capacity((block.len() - 1) * ratio);
    for pair in block.windows(2) {
        let slope = (pair[1] - pair[0]) / span;
        resampled.push(pair[0]);
        for offset in 1..ratio {
            resampled.push(slope * offset as f64 + pair[0]);
        }
    }
    resampled
}

/// `num` evenly spaced points from `start` towards `stop`.
///
/// With `endpoint` the last point is exactly `stop`; without it the spacing is
/// `(stop - start) / num` and `stop` itself is excluded.
pub fn linspace(start: f64, stop: f64, num: usize, endpoint: bool) -> Vec<f64> {
    if num == 0 {
        return Vec::new();
    }
    let div = if endpoint { num - 1 } else { num };
    if div == 0 {
        return vec![start];
    }

    let step = (stop - start) / div as f64;
    let mut points: Vec<f64> = (0..num).map(|i| i as f64 * step + start).collect();
    if endpoint {
        points[num - 1] = stop;
    }
    points
}
