//! Immutable session snapshot handed to persistence and sync
//!
//! Field names follow the on-device run files so records written by the
//! first schema (start time, distance, duration, steps, coordinates) still
//! deserialize. Fields introduced later all carry serde defaults; fields
//! are only ever added, never renamed or retyped.

use crate::models::{Goal, GoalKind, PositionFix, SessionId, Split, Timestamp};
use serde::{Deserialize, Serialize};

/// Schema version written by this crate
pub const RECORD_VERSION: &str = "2.0";

/// Version assumed for records that predate the version field
pub const LEGACY_RECORD_VERSION: &str = "1.0";

fn legacy_version() -> String {
    LEGACY_RECORD_VERSION.to_string()
}

/// One stored point of the session track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub alt: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    pub time: Timestamp,
}

impl From<&PositionFix> for TrackPoint {
    fn from(fix: &PositionFix) -> Self {
        Self {
            lat: fix.latitude,
            lon: fix.longitude,
            alt: fix.usable_altitude(),
            speed: fix.usable_speed(),
            time: fix.timestamp,
        }
    }
}

/// Persisted form of a completed (or in-progress, for sync) session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default = "legacy_version")]
    pub version: String,

    #[serde(default)]
    pub id: Option<SessionId>,

    #[serde(rename = "startTime")]
    pub started_at: Timestamp,

    #[serde(rename = "stopTime", default)]
    pub stopped_at: Option<Timestamp>,

    #[serde(rename = "duration", default)]
    pub duration_ms: i64,

    #[serde(rename = "distance", default)]
    pub distance_meters: f64,

    #[serde(rename = "steps", default)]
    pub step_count: u32,

    #[serde(rename = "gpsCoords", default)]
    pub track: Vec<TrackPoint>,

    #[serde(rename = "goalType", default)]
    pub goal_kind: GoalKind,

    #[serde(rename = "goalValue", default)]
    pub goal_target: f64,

    #[serde(default)]
    pub goal_completed: bool,

    #[serde(default)]
    pub splits: Vec<Split>,

    #[serde(rename = "maxSpeed", default)]
    pub max_speed_mps: f64,

    #[serde(default)]
    pub min_elevation: Option<f64>,

    #[serde(default)]
    pub max_elevation: Option<f64>,

    #[serde(rename = "totalAscent", default)]
    pub elevation_gain_meters: f64,

    #[serde(rename = "totalDescent", default)]
    pub elevation_loss_meters: f64,

    /// Set once a sync client has fetched this run
    #[serde(default)]
    pub synced: bool,
}

impl SessionRecord {
    /// Session token; older records derive it from the start time
    pub fn session_id(&self) -> SessionId {
        self.id
            .clone()
            .unwrap_or_else(|| SessionId::from_start(self.started_at))
    }

    pub fn goal(&self) -> Goal {
        Goal::from_parts(self.goal_kind, self.goal_target)
    }

    /// Distance as carried over the sync transport
    pub fn rounded_distance_meters(&self) -> u64 {
        if self.distance_meters.is_finite() && self.distance_meters > 0.0 {
            self.distance_meters.round() as u64
        } else {
            0
        }
    }

    pub fn average_speed_mps(&self) -> f64 {
        if self.duration_ms <= 0 {
            return 0.0;
        }
        self.distance_meters / (self.duration_ms as f64 / 1000.0)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
