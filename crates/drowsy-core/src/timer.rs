//! Continuous-duration timer

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::DetectorError;

/// Timer state (exposed read-only via statistics)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TimerState {
    /// Whether the timer is currently accumulating
    pub is_active: bool,
    /// Accumulated uninterrupted duration in seconds
    pub current_duration: f64,
}

/// Accumulates uninterrupted duration against a threshold.
///
/// The timer has no notion of wall-clock time: duration advances only by
/// caller-supplied `dt`, keeping the algorithm frame-rate-driven and
/// deterministic under test.
pub struct ContinuousTimer {
    threshold: f64,
    state: TimerState,
}

impl ContinuousTimer {
    /// Create a timer with the given threshold in seconds.
    pub fn new(threshold: f64) -> Result<Self, DetectorError> {
        if threshold <= 0.0 || threshold.is_nan() {
            return Err(DetectorError::NotPositive {
                field: "threshold",
                value: threshold,
            });
        }
        Ok(Self {
            threshold,
            state: TimerState::default(),
        })
    }

    /// Start accumulating, discarding any prior accumulation.
    pub fn start(&mut self) {
        self.state.is_active = true;
        self.state.current_duration = 0.0;
        debug!("timer started");
    }

    /// Stop the timer. Stopping is a full reset, not a pause; idempotent.
    pub fn stop(&mut self) {
        self.state.is_active = false;
        self.state.current_duration = 0.0;
    }

    /// Advance the timer by `dt` seconds and return the new duration.
    ///
    /// Returns 0.0 without mutation when inactive; fails on negative `dt`.
    pub fn update(&mut self, dt: f64) -> Result<f64, DetectorError> {
        if !self.state.is_active {
            return Ok(0.0);
        }
        if dt < 0.0 || dt.is_nan() {
            return Err(DetectorError::OutOfRange {
                field: "dt",
                value: dt,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        self.state.current_duration += dt;
        Ok(self.state.current_duration)
    }

    /// Whether the accumulated duration has reached the threshold (inclusive).
    pub fn is_threshold_exceeded(&self) -> bool {
        self.state.current_duration >= self.threshold
    }

    /// Seconds until the threshold is reached; the full threshold when inactive.
    pub fn remaining_time(&self) -> f64 {
        if !self.state.is_active {
            return self.threshold;
        }
        (self.threshold - self.state.current_duration).max(0.0)
    }

    /// Current accumulated duration in seconds.
    pub fn current_duration(&self) -> f64 {
        self.state.current_duration
    }

    /// Whether the timer is accumulating.
    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    /// Snapshot of the timer state.
    pub fn state(&self) -> TimerState {
        self.state
    }
}
