//! Recorded sensor logs replayed through a session controller
//!
//! Lets a finished activity be recomputed off-device: a CSV event log or a
//! GPX track is turned into timed sensor events, periodic clock ticks are
//! interleaved at the device cadence, and the whole stream is driven through
//! a `SessionController` from start to stop.

use chrono::DateTime;
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{ReplayError, TrackRsError};
use crate::models::{GpsSample, Goal, PositionFix, Timestamp};
use crate::record::SessionRecord;
use crate::session::{SensorEvent, SessionController, SessionOutput};

/// Sensor event with the device time it was delivered at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedEvent {
    pub at: Timestamp,
    pub event: SensorEvent,
}

/// Source of recorded sensor events
pub trait ReplaySource {
    /// Check if this source can read the given file
    fn can_read(&self, path: &Path) -> bool;

    /// Read all events, in delivery order
    fn read_events(&self, path: &Path) -> Result<Vec<TimedEvent>, ReplayError>;

    /// Get the format name for this source
    fn format_name(&self) -> &'static str;
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

/// One row of a CSV event log: `kind,time,lat,lon,alt,speed,fix,steps`
#[derive(Debug, Deserialize)]
struct EventRow {
    kind: String,
    time: Timestamp,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    alt: Option<f64>,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    fix: Option<bool>,
    #[serde(default)]
    steps: Option<u64>,
}

impl EventRow {
    fn into_event(self) -> Result<TimedEvent, String> {
        let event = match self.kind.to_lowercase().as_str() {
            "gps" | "fix" | "position" => {
                let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
                    return Err("gps row needs lat and lon".to_string());
                };
                let position = PositionFix {
                    latitude: lat,
                    longitude: lon,
                    altitude: self.alt,
                    speed: self.speed,
                    timestamp: self.time,
                };
                SensorEvent::Gps(GpsSample {
                    has_fix: self.fix.unwrap_or(true),
                    position,
                })
            }
            "step" | "steps" => {
                let steps = self.steps.ok_or_else(|| "step row needs steps".to_string())?;
                SensorEvent::Steps(steps)
            }
            "tick" | "clock" => SensorEvent::ClockTick(self.time),
            other => return Err(format!("unknown event kind '{}'", other)),
        };

        Ok(TimedEvent {
            at: self.time,
            event,
        })
    }
}

/// CSV event log reader
pub struct CsvEventSource;

impl CsvEventSource {
    pub fn new() -> Self {
        Self
    }

    /// Parse an event log; malformed rows are skipped with a warning
    pub fn parse<R: Read>(&self, reader: R) -> Result<Vec<TimedEvent>, ReplayError> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut events = Vec::new();
        for (index, row) in csv_reader.deserialize::<EventRow>().enumerate() {
            // Header is line 1
            let line = index + 2;
            let parsed = row
                .map_err(|e| e.to_string())
                .and_then(EventRow::into_event);

            match parsed {
                Ok(event) => events.push(event),
                Err(reason) => warn!(line, %reason, "Skipping malformed event row"),
            }
        }

        Ok(events)
    }
}

impl Default for CsvEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplaySource for CsvEventSource {
    fn can_read(&self, path: &Path) -> bool {
        has_extension(path, "csv")
    }

    fn read_events(&self, path: &Path) -> Result<Vec<TimedEvent>, ReplayError> {
        let file = File::open(path)?;
        self.parse(BufReader::new(file))
    }

    fn format_name(&self) -> &'static str {
        "CSV"
    }
}

/// GPX track reader; every track point becomes a valid GPS fix
pub struct GpxTrackSource {
    /// Spacing assumed for points without a timestamp
    untimed_step_ms: i64,
}

impl GpxTrackSource {
    pub fn new() -> Self {
        Self {
            untimed_step_ms: 1000,
        }
    }

    pub fn parse<R: Read>(&self, reader: R, location: &str) -> Result<Vec<TimedEvent>, ReplayError> {
        let gpx = gpx::read(reader).map_err(|e| ReplayError::Parse {
            format: "GPX",
            location: location.to_string(),
            reason: e.to_string(),
        })?;

        let mut events = Vec::new();
        let mut last_time: Option<Timestamp> = None;

        for track in &gpx.tracks {
            for segment in &track.segments {
                for waypoint in &segment.points {
                    let recorded = waypoint
                        .time
                        .as_ref()
                        .and_then(|time| time.format().ok())
                        .and_then(|text| DateTime::parse_from_rfc3339(&text).ok())
                        .map(|dt| dt.timestamp_millis());
                    let at = recorded
                        .unwrap_or_else(|| last_time.map_or(0, |t| t + self.untimed_step_ms));
                    last_time = Some(at);

                    let point = waypoint.point();
                    let position = PositionFix {
                        latitude: point.y(),
                        longitude: point.x(),
                        altitude: waypoint.elevation,
                        speed: waypoint.speed,
                        timestamp: at,
                    };
                    events.push(TimedEvent {
                        at,
                        event: SensorEvent::Position(position),
                    });
                }
            }
        }

        debug!(points = events.len(), tracks = gpx.tracks.len(), "Parsed GPX track");
        Ok(events)
    }
}

impl Default for GpxTrackSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplaySource for GpxTrackSource {
    fn can_read(&self, path: &Path) -> bool {
        has_extension(path, "gpx")
    }

    fn read_events(&self, path: &Path) -> Result<Vec<TimedEvent>, ReplayError> {
        let file = File::open(path)?;
        self.parse(BufReader::new(file), &path.display().to_string())
    }

    fn format_name(&self) -> &'static str {
        "GPX"
    }
}

/// Picks a replay source by file extension
pub struct ReplayManager {
    sources: Vec<Box<dyn ReplaySource>>,
}

impl Default for ReplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayManager {
    pub fn new() -> Self {
        let sources: Vec<Box<dyn ReplaySource>> = vec![
            Box::new(CsvEventSource::new()),
            Box::new(GpxTrackSource::new()),
        ];
        Self { sources }
    }

    pub fn read_events(&self, path: &Path) -> Result<Vec<TimedEvent>, ReplayError> {
        let source = self
            .sources
            .iter()
            .find(|source| source.can_read(path))
            .ok_or_else(|| ReplayError::UnsupportedFormat {
                format: path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            })?;

        info!(path = %path.display(), format = source.format_name(), "Reading sensor log");
        let events = source.read_events(path)?;
        if events.is_empty() {
            return Err(ReplayError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(events)
    }
}

/// Interleave clock ticks every `interval_ms`, as the device timer would.
///
/// Ticks start one interval after the first event and a final tick is
/// placed at the last event time so the session ends with fresh metrics.
pub fn synthesize_ticks(events: &[TimedEvent], interval_ms: i64) -> Vec<TimedEvent> {
    let (Some(first), Some(last)) = (events.first(), events.last()) else {
        return Vec::new();
    };
    if interval_ms <= 0 {
        return events.to_vec();
    }

    let mut timeline = Vec::with_capacity(events.len() + ((last.at - first.at) / interval_ms).max(0) as usize + 1);
    let mut next_tick = first.at + interval_ms;

    for event in events {
        while next_tick <= event.at {
            timeline.push(TimedEvent {
                at: next_tick,
                event: SensorEvent::ClockTick(next_tick),
            });
            next_tick += interval_ms;
        }
        timeline.push(*event);
    }

    let ends_with_tick = matches!(timeline.last(), Some(TimedEvent { event: SensorEvent::ClockTick(t), .. }) if *t == last.at);
    if !ends_with_tick {
        timeline.push(TimedEvent {
            at: last.at,
            event: SensorEvent::ClockTick(last.at),
        });
    }

    timeline
}

/// Result of driving a recorded log through a session
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub record: SessionRecord,
    pub outputs: Vec<SessionOutput>,
}

impl ReplayOutcome {
    pub fn milestones(&self) -> usize {
        self.outputs
            .iter()
            .filter(|o| matches!(o, SessionOutput::MilestoneReached { .. }))
            .count()
    }
}

/// Run a whole session over `timeline`, starting at the first event
pub fn run_session(
    controller: &mut SessionController,
    timeline: &[TimedEvent],
    goal: Goal,
    alert_interval_meters: Option<f64>,
) -> Result<ReplayOutcome, TrackRsError> {
    let (Some(first), Some(last)) = (timeline.first(), timeline.last()) else {
        return Err(TrackRsError::Validation("nothing to replay".to_string()));
    };

    let mut outputs = controller.start(first.at, goal, alert_interval_meters, None)?;
    for timed in timeline {
        outputs.extend(controller.handle_event(timed.event));
    }
    let record = controller.stop(last.at)?;

    Ok(ReplayOutcome { record, outputs })
}
