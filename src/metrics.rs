//! Cumulative metrics for the active session
//!
//! Every counter here only moves forward while a session is active:
//! distance, steps and duration never decrease, and elevation gain/loss
//! only grow once a change clears the altimeter dead-band.

use crate::models::{PositionFix, Timestamp};
use serde::{Deserialize, Serialize};

/// Altitude changes within this band are treated as altimeter noise
pub const DEFAULT_ELEVATION_DEAD_BAND_METERS: f64 = 1.0;

/// Running totals for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsAccumulator {
    started_at: Timestamp,
    elevation_dead_band: f64,

    pub distance_meters: f64,
    pub duration_ms: i64,
    pub step_count: u32,
    pub max_speed_mps: f64,
    /// Speed over the most recent accepted movement
    pub current_speed_mps: Option<f64>,
    pub min_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
    pub elevation_gain_meters: f64,
    pub elevation_loss_meters: f64,

    step_baseline: Option<u64>,
    /// Steps counted before the device counter last went backwards
    carried_steps: u64,
}

impl MetricsAccumulator {
    /// `step_baseline` of `None` captures the baseline from the first step event
    pub fn new(started_at: Timestamp, elevation_dead_band: f64, step_baseline: Option<u64>) -> Self {
        Self {
            started_at,
            elevation_dead_band: elevation_dead_band.abs(),
            distance_meters: 0.0,
            duration_ms: 0,
            step_count: 0,
            max_speed_mps: 0.0,
            current_speed_mps: None,
            min_elevation: None,
            max_elevation: None,
            elevation_gain_meters: 0.0,
            elevation_loss_meters: 0.0,
            step_baseline,
            carried_steps: 0,
        }
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Add an accepted movement; a zero delta is used for the first point
    pub fn on_accepted(&mut self, delta_meters: f64, fix: &PositionFix) {
        if delta_meters.is_finite() && delta_meters > 0.0 {
            self.distance_meters += delta_meters;
        }
        if let Some(speed) = fix.usable_speed() {
            if speed > self.max_speed_mps {
                self.max_speed_mps = speed;
            }
        }
    }

    /// Record the speed of the latest movement; `None` keeps the previous value
    pub fn on_step_speed(&mut self, speed_mps: Option<f64>) {
        if let Some(speed) = speed_mps.filter(|s| s.is_finite()) {
            self.current_speed_mps = Some(speed);
        }
    }

    pub fn on_elevation(&mut self, altitude: f64, previous_altitude: Option<f64>) {
        if !altitude.is_finite() {
            return;
        }

        self.min_elevation = Some(self.min_elevation.map_or(altitude, |min| min.min(altitude)));
        self.max_elevation = Some(self.max_elevation.map_or(altitude, |max| max.max(altitude)));

        if let Some(previous) = previous_altitude.filter(|p| p.is_finite()) {
            let change = altitude - previous;
            if change > self.elevation_dead_band {
                self.elevation_gain_meters += change;
            } else if change < -self.elevation_dead_band {
                self.elevation_loss_meters += change.abs();
            }
        }
    }

    /// Update the session step count from the device's cumulative counter
    pub fn on_step_tick(&mut self, cumulative_device_steps: u64) {
        let baseline = *self.step_baseline.get_or_insert(cumulative_device_steps);

        if cumulative_device_steps < baseline {
            // Device counter reset (e.g. daily rollover); keep what was counted
            self.carried_steps = u64::from(self.step_count);
            self.step_baseline = Some(cumulative_device_steps);
            return;
        }

        let session_steps = self.carried_steps + (cumulative_device_steps - baseline);
        let session_steps = u32::try_from(session_steps).unwrap_or(u32::MAX);
        self.step_count = self.step_count.max(session_steps);
    }

    /// Sample elapsed time; earlier clock readings never shrink the duration
    pub fn on_timer_tick(&mut self, now: Timestamp) {
        let elapsed = now.saturating_sub(self.started_at).max(0);
        self.duration_ms = self.duration_ms.max(elapsed);
    }

    /// Mean speed over the whole session, zero until time has elapsed
    pub fn average_speed_mps(&self) -> f64 {
        if self.duration_ms <= 0 {
            return 0.0;
        }
        self.distance_meters / (self.duration_ms as f64 / 1000.0)
    }
}
