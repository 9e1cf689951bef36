//! Per-eye smoothing and open/closed classification

use serde::{Deserialize, Serialize};

use crate::DetectorError;

/// Eye state for a single frame
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EyeState {
    /// Whether the eye is classified closed
    pub is_closed: bool,
    /// Clamped raw openness ratio (0 = fully closed)
    pub open_ratio: f64,
    /// Openness ratio after smoothing
    pub filtered_open_ratio: f64,
}

/// Internal smoothing state (exposed read-only via statistics)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FilterState {
    /// Whether the filter has seen its first sample
    pub is_initialized: bool,
    /// Current smoothed value, if initialized
    pub filtered_value: Option<f64>,
    /// EMA smoothing coefficient
    pub alpha: f64,
}

/// Smooths one eye's openness stream and classifies open/closed.
///
/// Smoothing is an exponential moving average: the first sample initializes
/// the filtered value directly, each later sample blends as
/// `alpha * new + (1 - alpha) * previous`. With filtering disabled the
/// clamped raw value passes through unchanged.
pub struct EyeFilter {
    close_threshold: f64,
    enable_filter: bool,
    alpha: f64,
    filtered_value: Option<f64>,
}

impl EyeFilter {
    /// Create a filter; fails if `close_threshold` or `alpha` is outside [0, 1].
    pub fn new(close_threshold: f64, enable_filter: bool, alpha: f64) -> Result<Self, DetectorError> {
        if !(0.0..=1.0).contains(&close_threshold) {
            return Err(DetectorError::OutOfRange {
                field: "close_threshold",
                value: close_threshold,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(0.0..=1.0).contains(&alpha) {
            return Err(DetectorError::OutOfRange {
                field: "alpha",
                value: alpha,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self {
            close_threshold,
            enable_filter,
            alpha,
            filtered_value: None,
        })
    }

    /// Update with a new openness ratio and classify.
    ///
    /// The input is clamped to [0, 1]. The closed classification is
    /// inclusive: a filtered ratio exactly at the threshold counts as closed.
    pub fn update(&mut self, open_ratio: f64) -> EyeState {
        let normalized = open_ratio.clamp(0.0, 1.0);

        let filtered = if self.enable_filter {
            let value = match self.filtered_value {
                None => normalized,
                Some(prev) => self.alpha * normalized + (1.0 - self.alpha) * prev,
            };
            self.filtered_value = Some(value);
            value
        } else {
            normalized
        };

        EyeState {
            is_closed: filtered <= self.close_threshold,
            open_ratio: normalized,
            filtered_open_ratio: filtered,
        }
    }

    /// Clear the smoothing history; the next sample initializes the filter anew.
    pub fn reset(&mut self) {
        self.filtered_value = None;
    }

    /// Snapshot of the smoothing state.
    pub fn filter_state(&self) -> FilterState {
        FilterState {
            is_initialized: self.filtered_value.is_some(),
            filtered_value: self.filtered_value,
            alpha: self.alpha,
        }
    }
}
