//! Detector configuration

use serde::{Deserialize, Serialize};

use crate::DetectorError;

/// Detector configuration.
///
/// Validated once via [`DetectorConfig::validate`] at detector construction
/// and read-only afterwards. Out-of-range values fail validation rather than
/// being clamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Left eye counts as closed at or below this openness ratio
    pub left_eye_close_threshold: f64,

    /// Right eye counts as closed at or below this openness ratio
    pub right_eye_close_threshold: f64,

    /// Continuous closure duration that triggers the drowsy verdict (seconds)
    pub continuous_close_time: f64,

    /// Minimum face-detection confidence for a frame to be evaluated
    pub face_conf_threshold: f64,

    /// Enable exponential-moving-average smoothing of openness ratios
    pub enable_ema_filter: bool,

    /// EMA smoothing coefficient (weight on the newest sample)
    pub ema_alpha: f64,
}

impl Default for DetectorConfig {
    /// Canonical defaults: eye thresholds 0.30, one second of closure,
    /// face confidence 0.70, EMA enabled with alpha 0.3.
    fn default() -> Self {
        Self {
            left_eye_close_threshold: 0.30,
            right_eye_close_threshold: 0.30,
            continuous_close_time: 1.0,
            face_conf_threshold: 0.70,
            enable_ema_filter: true,
            ema_alpha: 0.3,
        }
    }
}

impl DetectorConfig {
    /// Strict preset: tighter closed-eye thresholds and confidence gate.
    pub fn strict() -> Self {
        Self {
            left_eye_close_threshold: 0.105,
            right_eye_close_threshold: 0.105,
            face_conf_threshold: 0.75,
            ..Default::default()
        }
    }

    /// Lenient preset: tolerates longer closures and noisier faces.
    pub fn lenient() -> Self {
        Self {
            continuous_close_time: 2.5,
            face_conf_threshold: 0.60,
            ..Default::default()
        }
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), DetectorError> {
        Self::check_range("left_eye_close_threshold", self.left_eye_close_threshold, 0.0, 1.0)?;
        Self::check_range("right_eye_close_threshold", self.right_eye_close_threshold, 0.0, 1.0)?;
        Self::check_range("continuous_close_time", self.continuous_close_time, 0.1, 10.0)?;
        Self::check_range("face_conf_threshold", self.face_conf_threshold, 0.0, 1.0)?;
        Self::check_range("ema_alpha", self.ema_alpha, 0.0, 1.0)?;
        Ok(())
    }

    fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), DetectorError> {
        if value.is_nan() || value < min || value > max {
            return Err(DetectorError::OutOfRange {
                field,
                value,
                min,
                max,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(DetectorConfig::default().validate().is_ok());
        assert!(DetectorConfig::strict().validate().is_ok());
        assert!(DetectorConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_threshold_range_enforced() {
        let config = DetectorConfig {
            left_eye_close_threshold: 1.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_continuous_close_time_range() {
        let too_short = DetectorConfig {
            continuous_close_time: 0.05,
            ..Default::default()
        };
        assert!(too_short.validate().is_err());

        let too_long = DetectorConfig {
            continuous_close_time: 10.5,
            ..Default::default()
        };
        assert!(too_long.validate().is_err());

        let boundary = DetectorConfig {
            continuous_close_time: 0.1,
            ..Default::default()
        };
        assert!(boundary.validate().is_ok());
    }

    #[test]
    fn test_nan_rejected() {
        let config = DetectorConfig {
            ema_alpha: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_with_defaults() {
        let config: DetectorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.left_eye_close_threshold, 0.30);
        assert!(config.enable_ema_filter);

        let partial: DetectorConfig =
            serde_json::from_str(r#"{"continuous_close_time": 2.0}"#).unwrap();
        assert_eq!(partial.continuous_close_time, 2.0);
        assert_eq!(partial.face_conf_threshold, 0.70);
    }
}
