//! Experiment data sources.
//!
//! The reconstruction only needs a handful of typed columns per key, so any
//! backing store can serve it by implementing [`ExperimentSource`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;

use serde::{Deserialize, Serialize};

use crate::config::SourceConfig;
use crate::error::{FlipError, Result};
use crate::types::{BehaviorTimestamps, ScanFrames, ScanKey, Stimulus, TrialKey, TrialRecord};

/// Typed column access keyed by scan or trial.
pub trait ExperimentSource {
    /// Every scan the source holds, ordered by key
    fn scan_keys(&self) -> Result<Vec<ScanKey>>;

    /// Trials of a scan, ordered by trial index
    fn trial_keys(&self, scan: &ScanKey) -> Result<Vec<TrialKey>>;

    fn trial(&self, key: &TrialKey) -> Result<TrialRecord>;

    fn scan_frames(&self, scan: &ScanKey) -> Result<ScanFrames>;

    fn behavior_timestamps(&self, scan: &ScanKey) -> Result<BehaviorTimestamps>;

    fn trials(&self, scan: &ScanKey) -> Result<Vec<TrialRecord>> {
        self.trial_keys(scan)?
            .iter()
            .map(|key| self.trial(key))
            .collect()
    }
}

/// Trial entry of a fixture file; its key comes from the enclosing scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialFixture {
    pub trial_idx: u32,
    pub stimulus: Stimulus,
    pub flip_times: Vec<f64>,
    pub start_frame_time: f64,
    pub end_frame_time: f64,
    #[serde(default)]
    pub condition_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanFixture {
    pub session: u32,
    pub scan_idx: u32,
    pub frames: ScanFrames,
    #[serde(default)]
    pub behavior: BehaviorTimestamps,
    pub trials: Vec<TrialFixture>,
}

/// On-disk layout of a JSON fixture source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceFixture {
    pub scans: Vec<ScanFixture>,
}

#[derive(Debug, Clone)]
struct ScanEntry {
    frames: ScanFrames,
    behavior: BehaviorTimestamps,
}

/// In-memory experiment source, used for fixture files and tests
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    scans: BTreeMap<ScanKey, ScanEntry>,
    trials: BTreeMap<TrialKey, TrialRecord>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON fixture file described by `config`
    pub fn open(config: &SourceConfig) -> Result<Self> {
        if !config.path.is_file() {
            return Err(FlipError::Source(format!(
                "fixture file not found: {}",
                config.path.display()
            )));
        }
        let reader = BufReader::new(File::open(&config.path)?);
        let fixture: SourceFixture = serde_json::from_reader(reader)?;
        log::info!(
            "Loaded {} scan(s) from {}",
            fixture.scans.len(),
            config.path.display()
        );
        Ok(Self::from_fixture(fixture))
    }

    pub fn from_fixture(fixture: SourceFixture) -> Self {
        let mut source = Self::new();
        for scan in fixture.scans {
            let key = ScanKey::new(scan.session, scan.scan_idx);
            source.insert_scan(key, scan.frames, scan.behavior);
            for trial in scan.trials {
                source.insert_trial(TrialRecord {
                    key: key.trial(trial.trial_idx),
                    stimulus: trial.stimulus,
                    flip_times: trial.flip_times,
                    start_frame_time: trial.start_frame_time,
                    end_frame_time: trial.end_frame_time,
                    condition_hash: trial.condition_hash,
                });
            }
        }
        source
    }

    pub fn insert_scan(&mut self, key: ScanKey, frames: ScanFrames, behavior: BehaviorTimestamps) {
        self.scans.insert(key, ScanEntry { frames, behavior });
    }

    pub fn insert_trial(&mut self, record: TrialRecord) {
        self.trials.insert(record.key, record);
    }

    fn scan_entry(&self, scan: &ScanKey) -> Result<&ScanEntry> {
        self.scans
            .get(scan)
            .ok_or_else(|| FlipError::NotFound(scan.to_string()))
    }
}

impl ExperimentSource for MemorySource {
    fn scan_keys(&self) -> Result<Vec<ScanKey>> {
        Ok(self.scans.keys().copied().collect())
    }

    fn trial_keys(&self, scan: &ScanKey) -> Result<Vec<TrialKey>> {
        self.scan_entry(scan)?;
        Ok(self
            .trials
            .keys()
            .filter(|key| key.scan() == *scan)
            .copied()
            .collect())
    }

    fn trial(&self, key: &TrialKey) -> Result<TrialRecord> {
        self.trials
            .get(key)
            .cloned()
            .ok_or_else(|| FlipError::NotFound(key.to_string()))
    }

    fn scan_frames(&self, scan: &ScanKey) -> Result<ScanFrames> {
        Ok(self.scan_entry(scan)?.frames.clone())
    }

    fn behavior_timestamps(&self, scan: &ScanKey) -> Result<BehaviorTimestamps> {
        Ok(self.scan_entry(scan)?.behavior.clone())
    }
}
