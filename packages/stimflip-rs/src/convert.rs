use std::path::Path;

use crate::cache::{read_cache, write_cache};
use crate::config::ReconstructionConfig;
use crate::error::Result;
use crate::reconstruct::reconstruct_flips;
use crate::source::ExperimentSource;
use crate::timeline::TimeShift;
use crate::types::{FlipSequence, ScanConversion, ScanKey, TrialInterval, TrialRecord};

/// Stimulus timestamps of a scan, read from `cache_path` when present.
///
/// Returns the timestamps and, when they were reconstructed, the empirical
/// refresh rate. A fresh reconstruction is written to `cache_path`.
pub fn stimulus_timestamps<S: ExperimentSource + ?Sized>(
    source: &S,
    key: &ScanKey,
    cache_path: Option<&Path>,
    config: &ReconstructionConfig,
) -> Result<(FlipSequence, Option<f64>)> {
    if let Some(cached) = cached_timestamps(key, cache_path)? {
        return Ok((cached, None));
    }
    let trials = source.trials(key)?;
    reconstruct_and_cache(source, key, &trials, cache_path, config)
}

fn cached_timestamps(key: &ScanKey, cache_path: Option<&Path>) -> Result<Option<FlipSequence>> {
    match cache_path {
        Some(path) if path.is_file() => {
            log::info!("Using cached stimulus timestamps for {}", key);
            Ok(Some(read_cache(path)?))
        }
        _ => Ok(None),
    }
}

fn reconstruct_and_cache<S: ExperimentSource + ?Sized>(
    source: &S,
    key: &ScanKey,
    trials: &[TrialRecord],
    cache_path: Option<&Path>,
    config: &ReconstructionConfig,
) -> Result<(FlipSequence, Option<f64>)> {
    let frames = source.scan_frames(key)?;
    let reconstructed = reconstruct_flips(key, trials, &frames, config)?;

    if let Some(path) = cache_path {
        write_cache(path, &reconstructed.flips)?;
    }
    Ok((
        reconstructed.flips,
        Some(reconstructed.empirical_refresh_rate),
    ))
}

/// Assemble everything a file writer needs for one scan.
///
/// Stimulus timestamps and trial intervals are shifted together so the
/// earliest behavioral timestamp is not negative.
pub fn convert_scan<S: ExperimentSource + ?Sized>(
    source: &S,
    key: &ScanKey,
    cache_path: Option<&Path>,
    config: &ReconstructionConfig,
) -> Result<ScanConversion> {
    let behavior = source.behavior_timestamps(key)?;
    let shift = TimeShift::from_behavior(&behavior.series());
    if shift.offset() != 0.0 {
        log::info!(
            "Shifting {} by {:.6}s to the earliest behavioral timestamp",
            key,
            shift.offset()
        );
    }

    let trials = source.trials(key)?;
    let (timestamps, emp_rate) = match cached_timestamps(key, cache_path)? {
        Some(cached) => (cached, None),
        None => reconstruct_and_cache(source, key, &trials, cache_path, config)?,
    };

    let intervals: Vec<TrialInterval> = trials
        .iter()
        .map(|t| shift.shift_interval(TrialInterval::from_record(t)))
        .collect();

    Ok(ScanConversion::new(
        *key,
        shift.shift_flips(&timestamps),
        emp_rate,
        shift.offset(),
        intervals,
    ))
}
