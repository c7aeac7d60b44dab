//! Position fix validation and great-circle distance
//!
//! Incoming GPS fixes are checked against the previous reference point and
//! classified before anything reaches the metric accumulators. Stationary
//! jitter below the noise floor is dropped without moving the reference.

use crate::models::PositionFix;
use tracing::trace;

/// Mean earth radius used for the spherical approximation
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Movements at or below this distance are treated as receiver jitter
pub const DEFAULT_NOISE_FLOOR_METERS: f64 = 2.0;

/// Great-circle distance in meters between two coordinates in degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Why a fix was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Out of range, non-finite, or the (0, 0) placeholder
    Coordinates,
    /// Older than the current reference point
    NonMonotonicTimestamp,
}

/// Classification of a fix relative to the current reference point
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOutcome {
    /// Dropped; must not touch session state
    Invalid(RejectReason),
    /// No reference yet; becomes the reference with zero distance
    FirstPoint(PositionFix),
    /// Within the noise floor; the reference is unchanged
    Noise { distance_meters: f64 },
    /// Real movement; the fix becomes the new reference
    Accepted {
        distance_meters: f64,
        fix: PositionFix,
        /// `distance / Δt`, absent when no time elapsed between the fixes
        speed_mps: Option<f64>,
    },
}

impl FilterOutcome {
    /// The fix that should replace the reference point, if any
    pub fn reference(&self) -> Option<PositionFix> {
        match self {
            FilterOutcome::FirstPoint(fix) | FilterOutcome::Accepted { fix, .. } => Some(*fix),
            FilterOutcome::Invalid(_) | FilterOutcome::Noise { .. } => None,
        }
    }
}

/// Stateless fix classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFilter {
    noise_floor_meters: f64,
}

impl Default for GeoFilter {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_FLOOR_METERS)
    }
}

impl GeoFilter {
    pub fn new(noise_floor_meters: f64) -> Self {
        let noise_floor_meters = if noise_floor_meters.is_finite() && noise_floor_meters >= 0.0 {
            noise_floor_meters
        } else {
            DEFAULT_NOISE_FLOOR_METERS
        };
        Self { noise_floor_meters }
    }

    pub fn noise_floor_meters(&self) -> f64 {
        self.noise_floor_meters
    }

    /// Classify `fix` against the current reference point
    pub fn accept(&self, fix: PositionFix, previous: Option<&PositionFix>) -> FilterOutcome {
        if !fix.has_valid_coordinates() {
            trace!(lat = fix.latitude, lon = fix.longitude, "Rejected fix coordinates");
            return FilterOutcome::Invalid(RejectReason::Coordinates);
        }

        let Some(previous) = previous else {
            return FilterOutcome::FirstPoint(fix);
        };

        if fix.timestamp < previous.timestamp {
            trace!(
                timestamp = fix.timestamp,
                reference = previous.timestamp,
                "Rejected out-of-order fix"
            );
            return FilterOutcome::Invalid(RejectReason::NonMonotonicTimestamp);
        }

        let distance_meters = haversine_distance(
            previous.latitude,
            previous.longitude,
            fix.latitude,
            fix.longitude,
        );

        if distance_meters <= self.noise_floor_meters {
            return FilterOutcome::Noise { distance_meters };
        }

        let elapsed_ms = fix.timestamp - previous.timestamp;
        let speed_mps = (elapsed_ms > 0).then(|| distance_meters / (elapsed_ms as f64 / 1000.0));

        FilterOutcome::Accepted {
            distance_meters,
            fix,
            speed_mps,
        }
    }
}
