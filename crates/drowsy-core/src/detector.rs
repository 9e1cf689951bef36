//! Continuous eye-closure detector

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::DetectorConfig;
use crate::eye::{EyeFilter, EyeState, FilterState};
use crate::preprocess::{FramePreprocessor, PreprocessorStats};
use crate::timer::ContinuousTimer;
use crate::DetectorError;

/// Raw per-frame input record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrameInput {
    /// Frame number, monotonically increasing across the session
    pub frame_num: i64,
    /// Left eye openness ratio (0 = fully closed)
    pub left_eye_open: f64,
    /// Right eye openness ratio (0 = fully closed)
    pub right_eye_open: f64,
    /// Face-detection confidence for this frame
    pub face_confidence: f64,
}

impl FrameInput {
    /// Construct a validated frame: non-negative frame number, all ratios
    /// in [0, 1] and not NaN.
    pub fn new(
        frame_num: i64,
        left_eye_open: f64,
        right_eye_open: f64,
        face_confidence: f64,
    ) -> Result<Self, DetectorError> {
        let frame = Self {
            frame_num,
            left_eye_open,
            right_eye_open,
            face_confidence,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Boundary validation, also applied to deserialized records.
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.frame_num < 0 {
            return Err(DetectorError::OutOfRange {
                field: "frame_num",
                value: self.frame_num as f64,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        for (field, value) in [
            ("left_eye_open", self.left_eye_open),
            ("right_eye_open", self.right_eye_open),
            ("face_confidence", self.face_confidence),
        ] {
            if value.is_nan() || !(0.0..=1.0).contains(&value) {
                return Err(DetectorError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: 1.0,
                });
            }
        }
        Ok(())
    }
}

/// Per-frame classification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Drowsiness {
    /// Frame could not be evaluated
    Error,
    /// Eyes open, or closure shorter than the configured duration
    NotDrowsy,
    /// Both eyes continuously closed past the configured duration
    Drowsy,
}

impl From<Drowsiness> for i8 {
    fn from(value: Drowsiness) -> Self {
        match value {
            Drowsiness::Error => -1,
            Drowsiness::NotDrowsy => 0,
            Drowsiness::Drowsy => 1,
        }
    }
}

impl TryFrom<i8> for Drowsiness {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, String> {
        match value {
            -1 => Ok(Drowsiness::Error),
            0 => Ok(Drowsiness::NotDrowsy),
            1 => Ok(Drowsiness::Drowsy),
            other => Err(format!("is_drowsy must be -1, 0, or 1, got {other}")),
        }
    }
}

/// Recoverable per-frame error conditions, carried as data in the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Frame number not strictly greater than the last accepted frame
    InvalidFrameNum,
    /// Face confidence below the configured gate
    LowFaceConfidence,
    /// Unexpected internal failure while evaluating the frame
    InternalError,
}

/// Per-frame verdict record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_drowsy: Drowsiness,
    pub frame_num: i64,
    pub left_eye_closed: bool,
    pub right_eye_closed: bool,
    /// Current continuous closure duration in seconds
    pub continuous_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl Verdict {
    fn error(frame_num: i64, code: ErrorCode) -> Self {
        Self {
            is_drowsy: Drowsiness::Error,
            frame_num,
            left_eye_closed: false,
            right_eye_closed: false,
            continuous_time: 0.0,
            error_code: Some(code),
        }
    }
}

/// Read-only snapshot of detector internals.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DetectorStats {
    pub last_frame_num: i64,
    pub timer_active: bool,
    pub current_continuous_time: f64,
    pub frame_rate: f64,
    pub preprocessor: PreprocessorStats,
    pub left_eye_filter: FilterState,
    pub right_eye_filter: FilterState,
}

/// Detects continuous eye closure across a single frame stream.
///
/// One detector serves one stream; state is mutated in place on every
/// [`update`](Self::update) call. The call itself never fails: recoverable
/// conditions come back as error verdicts so an unattended frame loop is
/// never halted by a bad frame.
pub struct DrowsyDetector {
    config: DetectorConfig,
    left_eye: EyeFilter,
    right_eye: EyeFilter,
    timer: ContinuousTimer,
    preprocessor: FramePreprocessor,
    last_frame_num: i64,
    last_valid_result: Option<Verdict>,
    frame_rate: f64,
}

impl DrowsyDetector {
    /// Create a detector. Fails on any out-of-range config field.
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;

        let left_eye = EyeFilter::new(
            config.left_eye_close_threshold,
            config.enable_ema_filter,
            config.ema_alpha,
        )?;
        let right_eye = EyeFilter::new(
            config.right_eye_close_threshold,
            config.enable_ema_filter,
            config.ema_alpha,
        )?;
        let timer = ContinuousTimer::new(config.continuous_close_time)?;

        info!(?config, "drowsy detector initialized");

        Ok(Self {
            config,
            left_eye,
            right_eye,
            timer,
            preprocessor: FramePreprocessor::new(),
            last_frame_num: -1,
            last_valid_result: None,
            frame_rate: 30.0,
        })
    }

    /// Evaluate one frame. Always returns a verdict; per-frame failures are
    /// reported through `error_code`, never raised.
    pub fn update(&mut self, frame: &FrameInput) -> Verdict {
        if frame.frame_num <= self.last_frame_num {
            warn!(
                frame_num = frame.frame_num,
                last_frame_num = self.last_frame_num,
                "frame number not increasing"
            );
            return Verdict::error(frame.frame_num, ErrorCode::InvalidFrameNum);
        }

        if frame.face_confidence < self.config.face_conf_threshold {
            debug!(
                face_confidence = frame.face_confidence,
                threshold = self.config.face_conf_threshold,
                "face confidence below gate, resetting eye state"
            );
            self.reset_eye_state();
            return Verdict::error(frame.frame_num, ErrorCode::LowFaceConfidence);
        }

        match self.evaluate(frame) {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(frame_num = frame.frame_num, error = %e, "internal failure evaluating frame");
                Verdict::error(frame.frame_num, ErrorCode::InternalError)
            }
        }
    }

    /// Steps after the gates: preprocess, classify both eyes, drive the
    /// timer, record the verdict. Any `Err` here becomes INTERNAL_ERROR and
    /// leaves `last_frame_num` unadvanced.
    fn evaluate(&mut self, frame: &FrameInput) -> Result<Verdict, DetectorError> {
        let processed = self.preprocessor.preprocess(frame)?;

        let left = self.left_eye.update(processed.left_eye_open);
        let right = self.right_eye.update(processed.right_eye_open);

        let verdict = self.evaluate_closure(frame.frame_num, left, right)?;

        self.last_frame_num = frame.frame_num;
        self.last_valid_result = Some(verdict);

        debug!(
            frame_num = frame.frame_num,
            is_drowsy = i8::from(verdict.is_drowsy),
            left_closed = verdict.left_eye_closed,
            right_closed = verdict.right_eye_closed,
            continuous_time = verdict.continuous_time,
            "frame evaluated"
        );

        Ok(verdict)
    }

    fn evaluate_closure(
        &mut self,
        frame_num: i64,
        left: EyeState,
        right: EyeState,
    ) -> Result<Verdict, DetectorError> {
        let both_closed = left.is_closed && right.is_closed;

        let is_drowsy = if both_closed {
            if !self.timer.is_active() {
                self.timer.start();
            }
            self.timer.update(1.0 / self.frame_rate)?;
            if self.timer.is_threshold_exceeded() {
                info!(frame_num, "drowsiness detected");
                Drowsiness::Drowsy
            } else {
                Drowsiness::NotDrowsy
            }
        } else {
            if self.timer.is_active() {
                debug!(frame_num, "eyes opened, closure timer stopped");
            }
            self.timer.stop();
            Drowsiness::NotDrowsy
        };

        Ok(Verdict {
            is_drowsy,
            frame_num,
            left_eye_closed: left.is_closed,
            right_eye_closed: right.is_closed,
            continuous_time: self.timer.current_duration(),
            error_code: None,
        })
    }

    /// Stop the timer and clear both eye filters. Preprocessor counters are
    /// kept: NaN statistics track data quality across the whole session.
    fn reset_eye_state(&mut self) {
        self.timer.stop();
        self.left_eye.reset();
        self.right_eye.reset();
    }

    /// Full reset of all mutable state. Config and frame rate are preserved.
    pub fn reset(&mut self) {
        self.reset_eye_state();
        self.preprocessor.reset();
        self.last_frame_num = -1;
        self.last_valid_result = None;
        info!("drowsy detector reset");
    }

    /// Set the frame rate used to derive per-frame time steps. Fails on
    /// non-positive or NaN fps.
    pub fn set_frame_rate(&mut self, fps: f64) -> Result<(), DetectorError> {
        if fps <= 0.0 || fps.is_nan() {
            return Err(DetectorError::NotPositive {
                field: "fps",
                value: fps,
            });
        }
        self.frame_rate = fps;
        info!(fps, "frame rate set");
        Ok(())
    }

    /// The most recent successfully evaluated verdict, if any.
    pub fn last_valid_result(&self) -> Option<&Verdict> {
        self.last_valid_result.as_ref()
    }

    /// Read-only snapshot of detector internals.
    pub fn get_statistics(&self) -> DetectorStats {
        DetectorStats {
            last_frame_num: self.last_frame_num,
            timer_active: self.timer.is_active(),
            current_continuous_time: self.timer.current_duration(),
            frame_rate: self.frame_rate,
            preprocessor: self.preprocessor.stats(),
            left_eye_filter: self.left_eye.filter_state(),
            right_eye_filter: self.right_eye.filter_state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn detector() -> DrowsyDetector {
        DrowsyDetector::new(DetectorConfig::default()).unwrap()
    }

    fn frame(num: i64, left: f64, right: f64, conf: f64) -> FrameInput {
        FrameInput {
            frame_num: num,
            left_eye_open: left,
            right_eye_open: right,
            face_confidence: conf,
        }
    }

    #[test]
    fn test_input_boundary_validation() {
        assert!(FrameInput::new(0, 0.5, 0.5, 0.9).is_ok());
        assert!(FrameInput::new(-1, 0.5, 0.5, 0.9).is_err());
        assert!(FrameInput::new(0, f64::NAN, 0.5, 0.9).is_err());
        assert!(FrameInput::new(0, 1.5, 0.5, 0.9).is_err());
    }

    #[test]
    fn test_drowsy_after_continuous_closure() {
        // 36 closed frames at 30 fps crosses the 1.0 s threshold
        let mut det = detector();
        let mut last = None;
        for i in 0..36 {
            last = Some(det.update(&frame(i, 0.1, 0.1, 0.95)));
        }
        let verdict = last.unwrap();
        assert_eq!(verdict.is_drowsy, Drowsiness::Drowsy);
        assert!(verdict.continuous_time >= 1.0);
        assert!(verdict.left_eye_closed);
        assert!(verdict.right_eye_closed);
    }

    #[test]
    fn test_timer_resets_on_open_frames() {
        // 10 closed / 10 open cycles: every open frame reports zero closure
        let mut det = detector();
        let mut num = 0;
        for _ in 0..3 {
            for _ in 0..10 {
                det.update(&frame(num, 0.1, 0.1, 0.95));
                num += 1;
            }
            for _ in 0..10 {
                let verdict = det.update(&frame(num, 0.9, 0.9, 0.95));
                assert_eq!(verdict.is_drowsy, Drowsiness::NotDrowsy);
                assert_eq!(verdict.continuous_time, 0.0);
                num += 1;
            }
        }
    }

    #[test]
    fn test_open_eyes_never_drowsy() {
        let mut det = detector();
        for i in 0..120 {
            let verdict = det.update(&frame(i, 0.8, 0.8, 0.95));
            assert_eq!(verdict.is_drowsy, Drowsiness::NotDrowsy);
            assert_eq!(verdict.continuous_time, 0.0);
        }
    }

    #[test]
    fn test_one_eye_closed_is_not_drowsy() {
        let mut det = DrowsyDetector::new(DetectorConfig {
            enable_ema_filter: false,
            ..Default::default()
        })
        .unwrap();
        for i in 0..60 {
            let verdict = det.update(&frame(i, 0.1, 0.8, 0.95));
            assert_eq!(verdict.is_drowsy, Drowsiness::NotDrowsy);
            assert!(verdict.left_eye_closed);
            assert!(!verdict.right_eye_closed);
            assert_eq!(verdict.continuous_time, 0.0);
        }
    }

    #[test]
    fn test_invalid_frame_num_leaves_state_untouched() {
        let mut det = detector();
        det.update(&frame(5, 0.1, 0.1, 0.95));
        let before = det.get_statistics();

        for bad in [5, 4, 0] {
            let verdict = det.update(&frame(bad, 0.1, 0.1, 0.95));
            assert_eq!(verdict.is_drowsy, Drowsiness::Error);
            assert_eq!(verdict.error_code, Some(ErrorCode::InvalidFrameNum));
        }

        let after = det.get_statistics();
        assert_eq!(after.last_frame_num, before.last_frame_num);
        assert_eq!(after.current_continuous_time, before.current_continuous_time);
        assert_eq!(after.preprocessor.total_count, before.preprocessor.total_count);
        assert_eq!(
            after.left_eye_filter.filtered_value,
            before.left_eye_filter.filtered_value
        );

        // The stream continues normally from the next valid frame
        let verdict = det.update(&frame(6, 0.1, 0.1, 0.95));
        assert_eq!(verdict.error_code, None);
    }

    #[test]
    fn test_low_face_confidence_resets_and_recovers() {
        let mut det = detector();
        for i in 0..10 {
            det.update(&frame(i, 0.1, 0.1, 0.95));
        }
        assert!(det.get_statistics().timer_active);

        let verdict = det.update(&frame(10, 0.1, 0.1, 0.5));
        assert_eq!(verdict.is_drowsy, Drowsiness::Error);
        assert_eq!(verdict.error_code, Some(ErrorCode::LowFaceConfidence));

        let stats = det.get_statistics();
        assert!(!stats.timer_active);
        assert!(!stats.left_eye_filter.is_initialized);
        // last_frame_num is not advanced by the rejected frame
        assert_eq!(stats.last_frame_num, 9);
        // Preprocessor statistics survive the reset
        assert_eq!(stats.preprocessor.total_count, 10);

        // A strictly subsequent valid frame is accepted normally
        let verdict = det.update(&frame(11, 0.9, 0.9, 0.95));
        assert_eq!(verdict.is_drowsy, Drowsiness::NotDrowsy);
        assert_eq!(verdict.error_code, None);
    }

    #[test]
    fn test_low_confidence_interrupts_closure_accumulation() {
        let mut det = detector();
        for i in 0..20 {
            det.update(&frame(i, 0.1, 0.1, 0.95));
        }
        det.update(&frame(20, 0.1, 0.1, 0.3));
        let verdict = det.update(&frame(21, 0.1, 0.1, 0.95));
        // Accumulation restarted from the post-reset frame
        assert!(verdict.continuous_time <= 1.0 / 30.0 + 1e-12);
    }

    #[test]
    fn test_nan_mid_stream_is_substituted_not_errored() {
        let mut det = detector();
        det.update(&frame(0, 0.9, 0.9, 0.95));
        let verdict = det.update(&frame(1, f64::NAN, 0.9, 0.95));
        assert_eq!(verdict.error_code, None);
        assert_eq!(det.get_statistics().preprocessor.nan_count, 1);
    }

    #[test]
    fn test_set_frame_rate() {
        let mut det = detector();
        assert!(det.set_frame_rate(0.0).is_err());
        assert!(det.set_frame_rate(-10.0).is_err());
        det.set_frame_rate(10.0).unwrap();

        // At 10 fps each closed frame contributes 0.1 s, so 12 frames are
        // comfortably past the 1.0 s threshold
        let mut last = None;
        for i in 0..12 {
            last = Some(det.update(&frame(i, 0.1, 0.1, 0.95)));
        }
        let verdict = last.unwrap();
        assert_eq!(verdict.is_drowsy, Drowsiness::Drowsy);
        assert!(verdict.continuous_time >= 1.0);
    }

    #[test]
    fn test_reset_preserves_config_and_frame_rate() {
        let mut det = detector();
        det.set_frame_rate(15.0).unwrap();
        for i in 0..5 {
            det.update(&frame(i, 0.1, 0.1, 0.95));
        }
        det.reset();

        let stats = det.get_statistics();
        assert_eq!(stats.last_frame_num, -1);
        assert!(!stats.timer_active);
        assert_eq!(stats.frame_rate, 15.0);
        assert_eq!(stats.preprocessor.total_count, 0);
        assert!(det.last_valid_result().is_none());

        // frame_num 0 is accepted again after the reset
        let verdict = det.update(&frame(0, 0.9, 0.9, 0.95));
        assert_eq!(verdict.error_code, None);
    }

    #[test]
    fn test_last_valid_result_not_updated_on_errors() {
        let mut det = detector();
        det.update(&frame(3, 0.9, 0.9, 0.95));
        det.update(&frame(3, 0.9, 0.9, 0.95)); // rejected
        det.update(&frame(4, 0.9, 0.9, 0.1)); // rejected
        assert_eq!(det.last_valid_result().unwrap().frame_num, 3);
    }

    #[test]
    fn test_ema_filter_delays_closure_classification() {
        // With smoothing on, a single closed frame after open history is not
        // enough to cross the threshold
        let mut det = detector();
        for i in 0..10 {
            det.update(&frame(i, 1.0, 1.0, 0.95));
        }
        let verdict = det.update(&frame(10, 0.0, 0.0, 0.95));
        assert!(!verdict.left_eye_closed);
        assert!(!verdict.right_eye_closed);
    }

    #[test]
    fn test_verdict_wire_format() {
        let mut det = detector();
        let verdict = det.update(&frame(0, 0.9, 0.9, 0.95));
        let json = serde_json::to_value(verdict).unwrap();
        assert_eq!(json["is_drowsy"], 0);
        assert_eq!(json["frame_num"], 0);
        assert_eq!(json["left_eye_closed"], false);
        assert!(json.get("error_code").is_none());

        let verdict = det.update(&frame(0, 0.9, 0.9, 0.95));
        let json = serde_json::to_value(verdict).unwrap();
        assert_eq!(json["is_drowsy"], -1);
        assert_eq!(json["error_code"], "INVALID_FRAME_NUM");

        let verdict = det.update(&frame(1, 0.9, 0.9, 0.1));
        let json = serde_json::to_value(verdict).unwrap();
        assert_eq!(json["error_code"], "LOW_FACE_CONFIDENCE");
    }

    #[test]
    fn test_frame_input_wire_format() {
        let frame: FrameInput = serde_json::from_str(
            r#"{"frame_num": 7, "left_eye_open": 0.8, "right_eye_open": 0.7, "face_confidence": 0.9}"#,
        )
        .unwrap();
        assert_eq!(frame.frame_num, 7);
        assert!(frame.validate().is_ok());
    }

    proptest! {
        #[test]
        fn prop_open_frames_never_drowsy(
            ratios in proptest::collection::vec(0.35f64..=1.0, 1..100),
        ) {
            // Openness strictly above the close threshold with a confident
            // face never accumulates closure time
            let mut det = detector();
            for (i, r) in ratios.iter().enumerate() {
                let verdict = det.update(&frame(i as i64, *r, *r, 0.95));
                prop_assert_eq!(verdict.is_drowsy, Drowsiness::NotDrowsy);
                prop_assert_eq!(verdict.continuous_time, 0.0);
            }
        }

        #[test]
        fn prop_continuous_time_monotone_while_closed(count in 1usize..80) {
            let mut det = detector();
            let mut last = 0.0;
            for i in 0..count {
                let verdict = det.update(&frame(i as i64, 0.0, 0.0, 0.95));
                prop_assert!(verdict.continuous_time >= last);
                last = verdict.continuous_time;
            }
        }
    }
}
