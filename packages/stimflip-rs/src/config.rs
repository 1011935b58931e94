use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FlipError, Result};
use crate::types::ScanKey;

pub const DEFAULT_TOLERANCE: f64 = 2e-3;
pub const DEFAULT_REFRESH_RATE: f64 = 60.0;
pub const DEFAULT_CLIP_FRAME_RATE: f64 = 30.0;

/// A scan whose acquisition stopped partway through the depths of its last frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptedScan {
    pub session: u32,
    pub scan_idx: u32,
    /// Depth periods to add on top of the missing depths
    pub extra_frames: u32,
}

/// Parameters of the flip-time reconstruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Allowed deviation of any interval from its expected value
    /// (seconds; refresh periods for inter-trial gaps)
    pub tolerance: f64,
    /// Estimated monitor refresh rate (Hz)
    pub refresh_rate: f64,
    /// Assumed frame rate of clip stimuli, which record no rate of their own (Hz)
    pub clip_frame_rate: f64,
    pub interrupted_scans: Vec<InterruptedScan>,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            refresh_rate: DEFAULT_REFRESH_RATE,
            clip_frame_rate: DEFAULT_CLIP_FRAME_RATE,
            // Session 4 scan 9 was interrupted mid-frame
            interrupted_scans: vec![InterruptedScan {
                session: 4,
                scan_idx: 9,
                extra_frames: 3,
            }],
        }
    }
}

impl ReconstructionConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(FlipError::InvalidParameter(format!(
                    "{} must be a positive finite number, got {}",
                    name, value
                )))
            }
        };
        positive("tolerance", self.tolerance)?;
        positive("refresh_rate", self.refresh_rate)?;
        positive("clip_frame_rate", self.clip_frame_rate)?;
        Ok(())
    }

    /// Extra trailing frame periods needed to close the acquisition window
    pub fn extra_trailing_frames(&self, key: &ScanKey) -> u32 {
        self.interrupted_scans
            .iter()
            .find(|s| s.session == key.session && s.scan_idx == key.scan_idx)
            .map(|s| s.extra_frames)
            .unwrap_or(0)
    }
}

/// Where the fixture-backed experiment source reads its tables from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
}

impl SourceConfig {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}
