//! Continuous Eye-Closure Detection
//!
//! Frame-by-frame drowsiness detection from per-frame eye openness scores
//! and a face-detection confidence score:
//! - Input sanitization with NaN substitution and range clamping
//! - Per-eye exponential-moving-average smoothing and closed/open thresholding
//! - Continuous-closure timing with reset-on-interruption
//! - A per-frame verdict record that never fails mid-stream
//!
//! Eye-openness estimation itself is out of scope; scores are supplied by an
//! upstream vision pipeline. One [`DrowsyDetector`] serves one frame stream.

pub mod config;
pub mod detector;
pub mod eye;
pub mod preprocess;
pub mod timer;

pub use config::DetectorConfig;
pub use detector::{DetectorStats, DrowsyDetector, Drowsiness, ErrorCode, FrameInput, Verdict};
pub use eye::{EyeFilter, EyeState, FilterState};
pub use preprocess::{FramePreprocessor, PreprocessorStats, ProcessedFrame};
pub use timer::{ContinuousTimer, TimerState};

use thiserror::Error;

/// Construction-time and internal validation errors.
///
/// These surface only from constructors, `set_frame_rate`, and direct
/// component use. `DrowsyDetector::update` never returns them; steady-state
/// per-frame conditions are carried as error codes in the [`Verdict`].
#[derive(Debug, Clone, Error)]
pub enum DetectorError {
    /// Value outside its allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Value that must be strictly positive
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}
