//! Repeating distance milestones

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertStatus {
    /// A milestone was crossed; carries the threshold that fired
    Fired { threshold_meters: f64 },
    Pending,
}

/// Milestone schedule; the next threshold only ever moves up by one interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    pub interval_meters: f64,
    pub next_threshold_meters: f64,
}

/// Fires once per interval crossed, independent of the session goal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertScheduler {
    state: Option<AlertState>,
}

impl AlertScheduler {
    /// A missing, zero or non-finite interval disables alerts entirely
    pub fn new(interval_meters: Option<f64>) -> Self {
        let state = interval_meters
            .filter(|interval| interval.is_finite() && *interval > 0.0)
            .map(|interval| AlertState {
                interval_meters: interval,
                next_threshold_meters: interval,
            });
        Self { state }
    }

    pub fn state(&self) -> Option<&AlertState> {
        self.state.as_ref()
    }

    /// Fire at most one milestone per call; a jump across several
    /// thresholds is caught up on subsequent calls.
    pub fn evaluate(&mut self, distance_meters: f64) -> AlertStatus {
        let Some(state) = self.state.as_mut() else {
            return AlertStatus::Pending;
        };

        if distance_meters < state.next_threshold_meters {
            return AlertStatus::Pending;
        }

        let threshold_meters = state.next_threshold_meters;
        state.next_threshold_meters += state.interval_meters;
        AlertStatus::Fired { threshold_meters }
    }
}
