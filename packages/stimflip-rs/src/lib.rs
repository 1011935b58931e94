//! Reconstruction of visual stimulus flip times at monitor refresh rate.
//!
//! Recorded flips are split into uniform blocks, upsampled to the refresh
//! grid, bridged across dropped frames and inter-trial gaps, and padded to
//! cover the image-acquisition window of the scan.

pub mod batch;
pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod pad;
pub mod profiling;
pub mod reconstruct;
pub mod resample;
pub mod segment;
pub mod source;
pub mod stitch;
pub mod timeline;
pub mod types;

pub use batch::{convert_scans, ScanOutcome};
pub use config::{ReconstructionConfig, SourceConfig};
pub use convert::{convert_scan, stimulus_timestamps};
pub use error::{FlipError, PreconditionError, Result};
pub use reconstruct::{reconstruct_flips, reconstruct_scan};
pub use source::{ExperimentSource, MemorySource, SourceFixture};
pub use timeline::TimeShift;
pub use types::*;
