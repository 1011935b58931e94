use thiserror::Error;

use crate::types::{ScanKey, TrialKey};

/// Fatal precondition violations raised by the reconstruction engine.
///
/// None of these are recoverable: the engine refuses to place synthetic flips
/// off the refresh grid, so the whole trial (and with it the scan) is abandoned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreconditionError {
    #[error("trial has no recorded flips")]
    EmptyTrial,

    #[error("scan has no trials")]
    NoTrials,

    #[error("refresh rate {refresh_rate} Hz is not an integer multiple of frame rate {frame_rate} Hz")]
    NonIntegerRateRatio { refresh_rate: f64, frame_rate: f64 },

    #[error("non-integer dropped frames detected: {gap:.6}s gap spans {frames:.4} refresh periods")]
    NonIntegerDroppedFrames { gap: f64, frames: f64 },

    #[error("frame rate deviation > {tolerance}s detected: interval {interval:.6}s against expected {expected:.6}s")]
    FrameRateDeviation {
        interval: f64,
        expected: f64,
        tolerance: f64,
    },

    #[error("gap of {gap:.6}s does not land on the refresh grid (nearest {frames} frames, tolerance {tolerance})")]
    GapMismatch {
        gap: f64,
        frames: i64,
        tolerance: f64,
    },

    #[error("no inter-trial interval can be measured from a single trial")]
    MissingIntertrialInterval,

    #[error("no trial runs near the estimated refresh rate of {refresh_rate} Hz")]
    NoRefreshRateTrials { refresh_rate: f64 },

    #[error("invalid acquisition window: {0}")]
    InvalidAcquisitionWindow(String),
}

#[derive(Error, Debug)]
pub enum FlipError {
    #[error("trial {key}: {source}")]
    Trial {
        key: TrialKey,
        #[source]
        source: PreconditionError,
    },

    #[error("scan {key}: {source}")]
    Scan {
        key: ScanKey,
        #[source]
        source: PreconditionError,
    },

    #[error("No data for key: {0}")]
    NotFound(String),

    #[error("Timestamp cache error: {0}")]
    Cache(String),

    #[error("Data source error: {0}")]
    Source(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlipError {
    /// Attach a trial key to an engine precondition failure.
    pub fn trial(key: TrialKey) -> impl FnOnce(PreconditionError) -> Self {
        move |source| FlipError::Trial { key, source }
    }

    /// Attach a scan key to an engine precondition failure.
    pub fn scan(key: ScanKey) -> impl FnOnce(PreconditionError) -> Self {
        move |source| FlipError::Scan { key, source }
    }

    /// The precondition that aborted the trial or scan, if this is one.
    pub fn precondition(&self) -> Option<&PreconditionError> {
        match self {
            FlipError::Trial { source, .. } | FlipError::Scan { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FlipError>;
