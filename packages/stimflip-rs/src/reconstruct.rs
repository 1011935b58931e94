use crate::config::ReconstructionConfig;
use crate::error::{FlipError, PreconditionError, Result};
use crate::pad::{acquisition_window, empirical_refresh_rate, pad_to_window};
use crate::profile_scope;
use crate::source::ExperimentSource;
use crate::stitch::{intertrial_intervals, reconstruct_trial_flips};
use crate::types::{FlipSequence, ReconstructedFlips, ScanFrames, ScanKey, TrialRecord};

/// Fetch a scan's trials and acquisition timing, then reconstruct its flips.
pub fn reconstruct_scan<S: ExperimentSource + ?Sized>(
    source: &S,
    key: &ScanKey,
    config: &ReconstructionConfig,
) -> Result<ReconstructedFlips> {
    let trials = source.trials(key)?;
    let frames = source.scan_frames(key)?;
    reconstruct_flips(key, &trials, &frames, config)
}

/// Reconstruct refresh-rate flip times for a whole scan.
///
/// Trials are processed in trial index order. Each trial is resampled and
/// bridged up to the next trial's first flip, and the result is padded to span
/// the acquisition window.
///
/// # Arguments
/// * `key` - Scan the trials belong to
/// * `trials` - Every trial of the scan
/// * `frames` - Image-acquisition frame times of the scan
/// * `config` - Tolerance, refresh rate and per-scan corrections
pub fn reconstruct_flips(
    key: &ScanKey,
    trials: &[TrialRecord],
    frames: &ScanFrames,
    config: &ReconstructionConfig,
) -> Result<ReconstructedFlips> {
    profile_scope!(format!("reconstruct {}", key));
    config.validate()?;

    let mut ordered: Vec<&TrialRecord> = trials.iter().collect();
    ordered.sort_by_key(|t| t.key.trial_idx);

    if ordered.is_empty() {
        return Err(FlipError::Scan {
            key: *key,
            source: PreconditionError::NoTrials,
        });
    }
    if let Some(trial) = ordered.iter().find(|t| t.flip_times.is_empty()) {
        return Err(FlipError::Trial {
            key: trial.key,
            source: PreconditionError::EmptyTrial,
        });
    }

    log::info!(
        "Reconstructing stimulus flips for {} ({} trials, {} Hz)",
        key,
        ordered.len(),
        config.refresh_rate
    );

    let flip_sets: Vec<&[f64]> = ordered.iter().map(|t| t.flip_times.as_slice()).collect();
    let gaps = intertrial_intervals(&flip_sets).map_err(FlipError::scan(*key))?;

    // inter-trial gaps must span a whole number of refresh periods
    for (trial, &gap) in ordered.iter().zip(&gaps) {
        let exact = gap * config.refresh_rate;
        let periods = exact.round_ties_even();
        if !((periods - exact).abs() < config.tolerance) {
            return Err(FlipError::Trial {
                key: trial.key,
                source: PreconditionError::GapMismatch {
                    gap,
                    frames: periods as i64,
                    tolerance: config.tolerance,
                },
            });
        }
    }

    let emp_rate =
        empirical_refresh_rate(&flip_sets, config.refresh_rate).map_err(FlipError::scan(*key))?;

    let mut stitched = Vec::new();
    for (trial, &gap) in ordered.iter().zip(&gaps) {
        let frame_rate = trial.stimulus.nominal_frame_rate(config.clip_frame_rate);
        let trial_flips = reconstruct_trial_flips(
            &trial.flip_times,
            frame_rate,
            gap,
            config.refresh_rate,
            config.tolerance,
        )
        .map_err(FlipError::trial(trial.key))?;

        log::debug!(
            "Trial {} ({}): {} recorded -> {} refresh flips",
            trial.key.trial_idx,
            trial.stimulus.type_name(),
            trial.flip_times.len(),
            trial_flips.len()
        );
        stitched.extend(trial_flips);
    }

    let window = acquisition_window(frames, config.extra_trailing_frames(key))
        .map_err(FlipError::scan(*key))?;
    let padded = pad_to_window(&stitched, window, emp_rate).map_err(FlipError::scan(*key))?;

    log::info!(
        "Scan {}: {} flips ({} prepad, {} postpad), empirical refresh {:.4} Hz",
        key,
        padded.flips.len(),
        padded.prepad_len,
        padded.postpad_len,
        emp_rate
    );

    Ok(ReconstructedFlips {
        key: *key,
        flips: FlipSequence::from(padded.flips),
        empirical_refresh_rate: emp_rate,
        prepad_len: padded.prepad_len,
        postpad_len: padded.postpad_len,
        trial_count: ordered.len(),
    })
}
