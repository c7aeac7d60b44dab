use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Milliseconds since the Unix epoch, as delivered by the device clock
pub type Timestamp = i64;

/// A single geolocation sample delivered by the GPS receiver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// Latitude in degrees, [-90, 90]
    pub latitude: f64,

    /// Longitude in degrees, [-180, 180]
    pub longitude: f64,

    /// Altitude in meters above sea level
    pub altitude: Option<f64>,

    /// Ground speed in meters per second
    pub speed: Option<f64>,

    /// Device time of the sample
    pub timestamp: Timestamp,
}

impl PositionFix {
    pub fn new(latitude: f64, longitude: f64, timestamp: Timestamp) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            speed: None,
            timestamp,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Coordinates are finite, in range, and not the receiver's (0, 0) placeholder
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && !(self.latitude == 0.0 && self.longitude == 0.0)
    }

    /// Altitude, if the receiver reported a usable one
    pub fn usable_altitude(&self) -> Option<f64> {
        self.altitude.filter(|alt| alt.is_finite())
    }

    /// Speed, if the receiver reported a usable one
    pub fn usable_speed(&self) -> Option<f64> {
        self.speed.filter(|s| s.is_finite() && *s >= 0.0)
    }
}

/// Raw receiver output: a position plus the receiver's fix-valid flag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsSample {
    pub has_fix: bool,
    pub position: PositionFix,
}

impl GpsSample {
    /// The position, if the receiver claims a fix
    pub fn fix(&self) -> Option<PositionFix> {
        self.has_fix.then_some(self.position)
    }
}

/// Goal categories, as stored in session records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalKind {
    #[default]
    None,
    Distance,
    Time,
    Steps,
}

impl fmt::Display for GoalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalKind::None => write!(f, "none"),
            GoalKind::Distance => write!(f, "distance"),
            GoalKind::Time => write!(f, "time"),
            GoalKind::Steps => write!(f, "steps"),
        }
    }
}

impl std::str::FromStr for GoalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(GoalKind::None),
            "distance" => Ok(GoalKind::Distance),
            "time" => Ok(GoalKind::Time),
            "steps" => Ok(GoalKind::Steps),
            _ => Err(format!("Invalid goal kind: {}", s)),
        }
    }
}

/// Target condition for a session, fixed when the session starts
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Goal {
    #[default]
    None,
    /// Target distance in meters
    Distance(f64),
    /// Target elapsed time
    Time(Duration),
    /// Target step count
    Steps(u32),
}

impl Goal {
    pub fn kind(&self) -> GoalKind {
        match self {
            Goal::None => GoalKind::None,
            Goal::Distance(_) => GoalKind::Distance,
            Goal::Time(_) => GoalKind::Time,
            Goal::Steps(_) => GoalKind::Steps,
        }
    }

    /// Target in the record's unit: meters, milliseconds or steps
    pub fn target_value(&self) -> f64 {
        match self {
            Goal::None => 0.0,
            Goal::Distance(meters) => *meters,
            Goal::Time(duration) => duration.as_millis() as f64,
            Goal::Steps(steps) => f64::from(*steps),
        }
    }

    /// Rebuild a goal from its stored kind and target value
    pub fn from_parts(kind: GoalKind, value: f64) -> Self {
        let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
        match kind {
            GoalKind::None => Goal::None,
            GoalKind::Distance => Goal::Distance(value),
            GoalKind::Time => Goal::Time(Duration::from_millis(value.round() as u64)),
            GoalKind::Steps => Goal::Steps(value.round().min(f64::from(u32::MAX)) as u32),
        }
    }
}

impl std::str::FromStr for Goal {
    type Err = String;

    /// Parses `none`, `distance:5000`, `time:1800000`, `steps:8000`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = match s.split_once(':') {
            Some((kind, value)) => (kind, Some(value)),
            None => (s, None),
        };
        let kind: GoalKind = kind.trim().parse()?;
        if kind == GoalKind::None {
            return Ok(Goal::None);
        }

        let value: f64 = value
            .ok_or_else(|| format!("Goal '{}' needs a target value", s))?
            .trim()
            .parse()
            .map_err(|_| format!("Invalid goal target in '{}'", s))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(format!("Goal target must be positive, got {}", value));
        }

        Ok(Goal::from_parts(kind, value))
    }
}

/// A checkpoint recorded each time the session covers another split interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// Session distance at the split boundary
    #[serde(rename = "distance")]
    pub cumulative_distance_meters: f64,

    /// Session elapsed time at the split boundary
    #[serde(rename = "time")]
    pub cumulative_duration_ms: i64,

    /// Speed over this split only
    #[serde(rename = "pace")]
    pub pace_meters_per_second: f64,
}

/// Lifecycle states of the session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Active,
    Completed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Active => write!(f, "Active"),
            SessionState::Completed => write!(f, "Completed"),
        }
    }
}

/// Opaque session token derived from the start time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn from_start(started_at: Timestamp) -> Self {
        Self(format!("run.{}", started_at))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Presentation units; stored metrics are always meters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl std::str::FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" | "km" => Ok(Units::Metric),
            "imperial" | "mi" => Ok(Units::Imperial),
            _ => Err(format!("Invalid units: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(PositionFix::new(51.5, -0.12, 0).has_valid_coordinates());
        assert!(!PositionFix::new(0.0, 0.0, 0).has_valid_coordinates());
        assert!(!PositionFix::new(91.0, 10.0, 0).has_valid_coordinates());
        assert!(!PositionFix::new(45.0, -180.5, 0).has_valid_coordinates());
        assert!(!PositionFix::new(f64::NAN, 10.0, 0).has_valid_coordinates());

        // Only the exact (0, 0) pair is the placeholder
        assert!(PositionFix::new(0.0, 12.5, 0).has_valid_coordinates());
    }

    #[test]
    fn test_unusable_sensor_fields() {
        let fix = PositionFix::new(51.5, -0.12, 0)
            .with_altitude(f64::NAN)
            .with_speed(-1.0);
        assert_eq!(fix.usable_altitude(), None);
        assert_eq!(fix.usable_speed(), None);
    }

    #[test]
    fn test_gps_sample_without_fix() {
        let sample = GpsSample {
            has_fix: false,
            position: PositionFix::new(51.5, -0.12, 0),
        };
        assert!(sample.fix().is_none());
    }

    #[test]
    fn test_goal_parsing() {
        assert_eq!("none".parse::<Goal>().unwrap(), Goal::None);
        assert_eq!("distance:5000".parse::<Goal>().unwrap(), Goal::Distance(5000.0));
        assert_eq!(
            "time:1800000".parse::<Goal>().unwrap(),
            Goal::Time(Duration::from_secs(1800))
        );
        assert_eq!("steps:8000".parse::<Goal>().unwrap(), Goal::Steps(8000));
        assert!("distance".parse::<Goal>().is_err());
        assert!("distance:-5".parse::<Goal>().is_err());
        assert!("laps:3".parse::<Goal>().is_err());
    }

    #[test]
    fn test_goal_parts() {
        let goal = Goal::Time(Duration::from_secs(600));
        assert_eq!(goal.kind(), GoalKind::Time);
        assert_eq!(goal.target_value(), 600_000.0);
        assert_eq!(Goal::from_parts(goal.kind(), goal.target_value()), goal);
        assert_eq!(Goal::from_parts(GoalKind::None, 1234.0), Goal::None);
    }

    #[test]
    fn test_session_id_from_start() {
        assert_eq!(SessionId::from_start(1_700_000_000_000).as_str(), "run.1700000000000");
    }
}
