//! Sync transport contract
//!
//! A phone reads the most recent run as one flat JSON document. There is no
//! streaming or partial transfer: every read returns the complete document,
//! and repeated reads after completion return identical text.

use crate::models::{GoalKind, Split, Timestamp};
use crate::record::SessionRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Document served when no run has been published yet
pub const NO_RUN_DATA: &str = r#"{"status":"no_run_data"}"#;

pub const DEFAULT_DEVICE_NAME: &str = "TrackRS wearable";

/// Track point as sent over the wire; missing readings become zero
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncCoordinate {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub speed: f64,
    pub time: Timestamp,
}

/// Flat document sent to the sync client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDocument {
    pub start_time: Timestamp,
    pub duration: i64,
    /// Whole meters
    pub distance: u64,
    pub steps: u32,
    pub gps_coordinates: Vec<SyncCoordinate>,
    pub device: String,
    pub goal_type: GoalKind,
    pub goal_value: f64,
    pub goal_completed: bool,
    pub splits: Vec<Split>,
    pub max_speed: f64,
    pub elevation_gain: f64,
}

impl SyncDocument {
    pub fn from_record(record: &SessionRecord, device: &str) -> Self {
        Self {
            start_time: record.started_at,
            duration: record.duration_ms,
            distance: record.rounded_distance_meters(),
            steps: record.step_count,
            gps_coordinates: record
                .track
                .iter()
                .map(|point| SyncCoordinate {
                    lat: point.lat,
                    lon: point.lon,
                    alt: point.alt.unwrap_or(0.0),
                    speed: point.speed.unwrap_or(0.0),
                    time: point.time,
                })
                .collect(),
            device: device.to_string(),
            goal_type: record.goal_kind,
            goal_value: record.goal_target,
            goal_completed: record.goal_completed,
            splits: record.splits.clone(),
            max_speed: record.max_speed_mps,
            elevation_gain: record.elevation_gain_meters,
        }
    }
}

/// Serves the latest published run to sync clients
#[derive(Debug, Clone)]
pub struct SyncService {
    device: String,
    /// Serialized once at publish time so every read is byte-identical
    document: Option<String>,
    reads: u64,
}

impl Default for SyncService {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_NAME)
    }
}

impl SyncService {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            document: None,
            reads: 0,
        }
    }

    /// Replace the served document with `record`
    pub fn publish(&mut self, record: &SessionRecord) -> serde_json::Result<()> {
        let document = SyncDocument::from_record(record, &self.device);
        self.document = Some(serde_json::to_string(&document)?);
        info!(
            session = %record.session_id(),
            distance = document.distance,
            points = document.gps_coordinates.len(),
            "Run published for sync"
        );
        Ok(())
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    /// Number of reads served since construction
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Full document text, or the no-data status
    pub fn read(&mut self) -> &str {
        self.reads += 1;
        debug!(reads = self.reads, "Sync document read");
        self.document.as_deref().unwrap_or(NO_RUN_DATA)
    }

    /// A client wrote to the data characteristic to request a transfer
    pub fn on_write_request(&mut self) -> &str {
        debug!("Sync transfer requested");
        self.read()
    }
}
