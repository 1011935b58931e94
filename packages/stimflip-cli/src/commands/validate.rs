use crate::cli::ValidateArgs;
use crate::engine;
use crate::exit_codes;
use crate::output;
use serde::Serialize;
use stimflip_rs::{reconstruct_scan, ExperimentSource, MemorySource, ReconstructionConfig, ScanKey};

#[derive(Serialize)]
struct ScanReport {
    session: u32,
    scan_idx: u32,
    trials: usize,
    frames: usize,
    timestamps: Option<usize>,
    empirical_refresh_rate: Option<f64>,
    error: Option<String>,
}

#[derive(Serialize)]
struct ValidateOutput {
    file: String,
    loaded: bool,
    scans: Vec<ScanReport>,
    error: Option<String>,
}

pub fn execute(args: ValidateArgs) -> i32 {
    let config = match engine::build_config(&args.engine) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let result = match engine::open_source(&args.source) {
        Ok(source) => ValidateOutput {
            file: args.source.clone(),
            loaded: true,
            scans: scan_reports(&source, &config),
            error: None,
        },
        Err(msg) => ValidateOutput {
            file: args.source.clone(),
            loaded: false,
            scans: Vec::new(),
            error: Some(msg),
        },
    };

    let invalid = result.scans.iter().filter(|s| s.error.is_some()).count();

    if args.json {
        match output::to_json(&result, false) {
            Ok(json) => {
                if let Err(e) = output::write_output(&json, None) {
                    eprintln!("Error: {}", e);
                    return exit_codes::EXECUTION_ERROR;
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                return exit_codes::EXECUTION_ERROR;
            }
        }
    } else if let Some(ref err) = result.error {
        eprintln!("Error: {}", err);
    } else {
        for scan in &result.scans {
            let key = ScanKey::new(scan.session, scan.scan_idx);
            match scan.error {
                Some(ref err) => eprintln!("{}: {}", key, err),
                None => println!(
                    "{}: {} trial(s), {} frame(s), {} timestamps",
                    key,
                    scan.trials,
                    scan.frames,
                    scan.timestamps.unwrap_or(0)
                ),
            }
        }
        println!(
            "File '{}' has {} scan(s), {} invalid",
            args.source,
            result.scans.len(),
            invalid
        );
    }

    if result.error.is_some() || invalid > 0 {
        exit_codes::INPUT_ERROR
    } else {
        exit_codes::SUCCESS
    }
}

/// Dry-run the reconstruction of every scan; nothing is cached.
fn scan_reports(source: &MemorySource, config: &ReconstructionConfig) -> Vec<ScanReport> {
    let keys = match source.scan_keys() {
        Ok(k) => k,
        Err(e) => {
            log::error!("Failed to list scans: {}", e);
            return Vec::new();
        }
    };

    keys.iter()
        .map(|key| {
            let trials = source.trial_keys(key).map(|t| t.len()).unwrap_or(0);
            let frames = source
                .scan_frames(key)
                .map(|f| f.frame_times.len())
                .unwrap_or(0);
            let (timestamps, empirical_refresh_rate, error) =
                match reconstruct_scan(source, key, config) {
                    Ok(r) => (Some(r.flips.len()), Some(r.empirical_refresh_rate), None),
                    Err(e) => (None, None, Some(e.to_string())),
                };
            ScanReport {
                session: key.session,
                scan_idx: key.scan_idx,
                trials,
                frames,
                timestamps,
                empirical_refresh_rate,
                error,
            }
        })
        .collect()
}
