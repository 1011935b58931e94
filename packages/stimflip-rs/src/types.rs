use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Identifies one imaging scan within an experiment session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScanKey {
    pub session: u32,
    pub scan_idx: u32,
}

impl ScanKey {
    pub fn new(session: u32, scan_idx: u32) -> Self {
        Self { session, scan_idx }
    }

    pub fn trial(&self, trial_idx: u32) -> TrialKey {
        TrialKey {
            session: self.session,
            scan_idx: self.scan_idx,
            trial_idx,
        }
    }
}

impl fmt::Display for ScanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session={} scan_idx={}", self.session, self.scan_idx)
    }
}

/// Identifies one stimulus presentation epoch within a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrialKey {
    pub session: u32,
    pub scan_idx: u32,
    pub trial_idx: u32,
}

impl TrialKey {
    pub fn scan(&self) -> ScanKey {
        ScanKey::new(self.session, self.scan_idx)
    }
}

impl fmt::Display for TrialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session={} scan_idx={} trial_idx={}",
            self.session, self.scan_idx, self.trial_idx
        )
    }
}

/// Stimulus generator that produced a trial, with its per-generator columns.
///
/// Clips carry no frame-rate column; they are always rendered at the
/// configured clip rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Stimulus {
    #[serde(rename = "stimulus.Clip")]
    Clip,
    #[serde(rename = "stimulus.Monet2")]
    Monet2 { fps: f64 },
    #[serde(rename = "stimulus.Trippy")]
    Trippy { fps: f64 },
}

impl Stimulus {
    /// Nominal source frame rate in Hz
    pub fn nominal_frame_rate(&self, clip_frame_rate: f64) -> f64 {
        match self {
            Stimulus::Clip => clip_frame_rate,
            Stimulus::Monet2 { fps } | Stimulus::Trippy { fps } => *fps,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Stimulus::Clip => "stimulus.Clip",
            Stimulus::Monet2 { .. } => "stimulus.Monet2",
            Stimulus::Trippy { .. } => "stimulus.Trippy",
        }
    }
}

/// One trial as fetched from the experiment source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub key: TrialKey,
    pub stimulus: Stimulus,
    /// Recorded flip timestamps (seconds, stimulus clock)
    pub flip_times: Vec<f64>,
    pub start_frame_time: f64,
    pub end_frame_time: f64,
    #[serde(default)]
    pub condition_hash: String,
}

/// Image-acquisition timing for a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFrames {
    /// Start time of the first depth of every acquired frame
    pub frame_times: Vec<f64>,
    /// Number of imaging depths per frame cycle
    pub ndepths: u32,
}

/// Behavioral series recorded alongside a scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorTimestamps {
    #[serde(default)]
    pub pupil: Vec<f64>,
    #[serde(default)]
    pub treadmill: Vec<f64>,
}

impl BehaviorTimestamps {
    pub fn series(&self) -> [&[f64]; 2] {
        [&self.pupil, &self.treadmill]
    }
}

/// Immutable, ordered monitor flip timestamps in seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlipSequence(Vec<f64>);

impl FlipSequence {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }

    /// True when no timestamp precedes its predecessor
    pub fn is_monotonic(&self) -> bool {
        self.0.windows(2).all(|w| w[1] >= w[0])
    }
}

impl From<Vec<f64>> for FlipSequence {
    fn from(flips: Vec<f64>) -> Self {
        Self(flips)
    }
}

impl Deref for FlipSequence {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

/// Full reconstruction result for one scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructedFlips {
    pub key: ScanKey,
    /// Prepad, stitched trial flips and postpad
    pub flips: FlipSequence,
    /// Mean monitor refresh rate measured on the stimulus clock (Hz)
    pub empirical_refresh_rate: f64,
    pub prepad_len: usize,
    pub postpad_len: usize,
    pub trial_count: usize,
}

/// One row of the trial interval table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialInterval {
    pub id: u32,
    pub start_time: f64,
    pub stop_time: f64,
    pub stimulus_type: String,
    pub condition_hash: String,
}

impl TrialInterval {
    pub fn from_record(record: &TrialRecord) -> Self {
        Self {
            id: record.key.trial_idx,
            start_time: record.start_frame_time,
            stop_time: record.end_frame_time,
            stimulus_type: record.stimulus.type_name().to_string(),
            condition_hash: record.condition_hash.clone(),
        }
    }
}

/// Everything the downstream file writer needs for one scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConversion {
    pub id: String,
    pub key: ScanKey,
    pub stimulus_timestamps: FlipSequence,
    /// `None` when timestamps came from the cache
    pub empirical_refresh_rate: Option<f64>,
    /// Seconds added to every series
    pub time_offset: f64,
    pub trials: Vec<TrialInterval>,
    pub created_at: String,
}

impl ScanConversion {
    pub fn new(
        key: ScanKey,
        stimulus_timestamps: FlipSequence,
        empirical_refresh_rate: Option<f64>,
        time_offset: f64,
        trials: Vec<TrialInterval>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            key,
            stimulus_timestamps,
            empirical_refresh_rate,
            time_offset,
            trials,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
