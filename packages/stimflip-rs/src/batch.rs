//! Parallel conversion of independent scans.

use std::path::Path;

use rayon::prelude::*;

use crate::cache::cache_path;
use crate::config::ReconstructionConfig;
use crate::convert::convert_scan;
use crate::error::Result;
use crate::source::ExperimentSource;
use crate::types::{ScanConversion, ScanKey};

/// Result of converting one scan in a batch
#[derive(Debug)]
pub struct ScanOutcome {
    pub key: ScanKey,
    pub result: Result<ScanConversion>,
}

impl ScanOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Convert every scan in `keys` on the current rayon pool.
///
/// Scans share nothing but the read-only source; a failure is recorded in that
/// scan's outcome and never stops the others. Outcomes keep the order of `keys`.
pub fn convert_scans<S: ExperimentSource + Sync + ?Sized>(
    source: &S,
    keys: &[ScanKey],
    cache_dir: Option<&Path>,
    config: &ReconstructionConfig,
) -> Vec<ScanOutcome> {
    keys.par_iter()
        .map(|key| {
            let cache = cache_dir.map(|dir| cache_path(dir, key));
            let result = convert_scan(source, key, cache.as_deref(), config);
            if let Err(ref e) = result {
                log::error!("Conversion of {} failed: {}", key, e);
            }
            ScanOutcome { key: *key, result }
        })
        .collect()
}

/// Count successes and failures in a batch
pub fn summarize(outcomes: &[ScanOutcome]) -> (usize, usize) {
    let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
    (succeeded, outcomes.len() - succeeded)
}
