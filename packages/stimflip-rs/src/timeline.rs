//! Aligning every series of a scan to a non-negative time base.
//!
//! Behavioral recordings can start before the stimulus clock's zero. The whole
//! scan is shifted by the absolute value of the earliest behavioral timestamp
//! when, and only when, that timestamp is negative.

use serde::{Deserialize, Serialize};

use crate::types::{FlipSequence, TrialInterval};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeShift {
    offset: f64,
}

impl TimeShift {
    pub fn none() -> Self {
        Self::default()
    }

    /// Shift that brings the earliest behavioral timestamp to zero if it is negative
    pub fn from_behavior(series: &[&[f64]]) -> Self {
        match earliest_timestamp(series) {
            Some(earliest) if earliest < 0.0 => Self { offset: -earliest },
            _ => Self::none(),
        }
    }

    /// Seconds added to every timestamp
    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn apply(&self, t: f64) -> f64 {
        t + self.offset
    }

    pub fn shift_flips(&self, flips: &FlipSequence) -> FlipSequence {
        if self.offset == 0.0 {
            return flips.clone();
        }
        FlipSequence::from(flips.iter().map(|&t| self.apply(t)).collect::<Vec<_>>())
    }

    pub fn shift_interval(&self, interval: TrialInterval) -> TrialInterval {
        TrialInterval {
            start_time: self.apply(interval.start_time),
            stop_time: self.apply(interval.stop_time),
            ..interval
        }
    }
}

/// Earliest finite timestamp across all series
pub fn earliest_timestamp(series: &[&[f64]]) -> Option<f64> {
    series
        .iter()
        .flat_map(|s| s.iter().copied())
        .filter(|t| t.is_finite())
        .reduce(f64::min)
}
