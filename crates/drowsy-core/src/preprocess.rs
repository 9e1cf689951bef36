//! Frame sanitization and data-quality tracking

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::detector::FrameInput;
use crate::DetectorError;

/// Sanitized per-frame measurements.
///
/// Invariant: all three fields lie in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProcessedFrame {
    pub left_eye_open: f64,
    pub right_eye_open: f64,
    pub face_confidence: f64,
}

impl ProcessedFrame {
    fn new(left_eye_open: f64, right_eye_open: f64, face_confidence: f64) -> Result<Self, DetectorError> {
        for (field, value) in [
            ("left_eye_open", left_eye_open),
            ("right_eye_open", right_eye_open),
            ("face_confidence", face_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DetectorError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: 1.0,
                });
            }
        }
        Ok(Self {
            left_eye_open,
            right_eye_open,
            face_confidence,
        })
    }
}

/// Data-quality counters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PreprocessorStats {
    /// Frames preprocessed this session
    pub total_count: u64,
    /// NaN fields substituted this session
    pub nan_count: u64,
    /// nan_count / max(total_count, 1)
    pub nan_rate: f64,
}

/// Sanitizes raw frame measurements before classification.
///
/// NaN fields are substituted from the last successfully produced frame
/// (0.0 when there is none), then every field is clamped to [0, 1]. NaN
/// substitutions are counted across the whole session as a data-quality
/// signal for upstream producers.
#[derive(Default)]
pub struct FramePreprocessor {
    last_valid: Option<ProcessedFrame>,
    nan_count: u64,
    total_count: u64,
}

impl FramePreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitize one frame and remember it as the new last-valid record.
    pub fn preprocess(&mut self, frame: &FrameInput) -> Result<ProcessedFrame, DetectorError> {
        self.total_count += 1;

        let left = self.substitute_nan(frame.left_eye_open, |f| f.left_eye_open, "left_eye_open");
        let right = self.substitute_nan(frame.right_eye_open, |f| f.right_eye_open, "right_eye_open");
        let conf = self.substitute_nan(frame.face_confidence, |f| f.face_confidence, "face_confidence");

        let processed = ProcessedFrame::new(
            left.clamp(0.0, 1.0),
            right.clamp(0.0, 1.0),
            conf.clamp(0.0, 1.0),
        )?;
        self.last_valid = Some(processed);
        Ok(processed)
    }

    fn substitute_nan(
        &mut self,
        value: f64,
        field: impl Fn(&ProcessedFrame) -> f64,
        name: &'static str,
    ) -> f64 {
        if value.is_nan() {
            self.nan_count += 1;
            let substituted = self.last_valid.as_ref().map(&field).unwrap_or(0.0);
            warn!(field = name, substituted, "NaN input substituted");
            substituted
        } else {
            value
        }
    }

    /// Clear counters and the remembered last-valid record.
    pub fn reset(&mut self) {
        self.last_valid = None;
        self.nan_count = 0;
        self.total_count = 0;
    }

    /// Session data-quality counters.
    pub fn stats(&self) -> PreprocessorStats {
        PreprocessorStats {
            total_count: self.total_count,
            nan_count: self.nan_count,
            nan_rate: self.nan_count as f64 / (self.total_count.max(1)) as f64,
        }
    }
}
