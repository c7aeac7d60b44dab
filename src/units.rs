//! Display formatting for distances, durations and paces
//!
//! Stored metrics are always meters, milliseconds and meters per second;
//! `Units` only changes how they are shown.

use crate::models::Units;

pub const METERS_PER_MILE: f64 = 1609.344;
pub const METERS_PER_KILOMETER: f64 = 1000.0;

impl Units {
    /// Length of one display distance unit in meters
    pub fn meters_per_unit(&self) -> f64 {
        match self {
            Units::Metric => METERS_PER_KILOMETER,
            Units::Imperial => METERS_PER_MILE,
        }
    }

    pub fn distance_label(&self) -> &'static str {
        match self {
            Units::Metric => "km",
            Units::Imperial => "mi",
        }
    }

    pub fn speed_label(&self) -> &'static str {
        match self {
            Units::Metric => "km/h",
            Units::Imperial => "mph",
        }
    }

    /// Default milestone interval: one kilometer or one mile
    pub fn default_alert_interval_meters(&self) -> f64 {
        match self {
            Units::Metric => 1000.0,
            Units::Imperial => 1609.0,
        }
    }
}

/// `12.35 km` / `7.67 mi`
pub fn format_distance(meters: f64, units: Units) -> String {
    let value = if meters.is_finite() { meters.max(0.0) } else { 0.0 };
    format!("{:.2} {}", value / units.meters_per_unit(), units.distance_label())
}

/// `m:ss` below an hour, `h:mm:ss` above
pub fn format_duration(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Pace as time per display unit, `--:--` when not moving
pub fn format_pace(meters_per_second: f64, units: Units) -> String {
    if !meters_per_second.is_finite() || meters_per_second <= 0.0 {
        return format!("--:--/{}", units.distance_label());
    }

    let seconds_per_unit = (units.meters_per_unit() / meters_per_second).round() as u64;
    format!(
        "{}:{:02}/{}",
        seconds_per_unit / 60,
        seconds_per_unit % 60,
        units.distance_label()
    )
}

/// Speed in km/h or mph with one decimal
pub fn format_speed(meters_per_second: f64, units: Units) -> String {
    let mps = if meters_per_second.is_finite() { meters_per_second.max(0.0) } else { 0.0 };
    let per_hour = mps * 3600.0 / units.meters_per_unit();
    format!("{:.1} {}", per_hour, units.speed_label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(12_345.0, Units::Metric), "12.35 km");
        assert_eq!(format_distance(1609.344, Units::Imperial), "1.00 mi");
        assert_eq!(format_distance(-4.0, Units::Metric), "0.00 km");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65_000), "1:05");
        assert_eq!(format_duration(3_725_000), "1:02:05");
    }

    #[test]
    fn test_format_pace() {
        // 5:00 per kilometer
        assert_eq!(format_pace(1000.0 / 300.0, Units::Metric), "5:00/km");
        assert_eq!(format_pace(0.0, Units::Metric), "--:--/km");
        assert_eq!(format_pace(f64::NAN, Units::Imperial), "--:--/mi");
        assert_eq!(format_pace(METERS_PER_MILE / 480.0, Units::Imperial), "8:00/mi");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(10.0, Units::Metric), "36.0 km/h");
        assert_eq!(format_speed(METERS_PER_MILE / 3600.0 * 6.0, Units::Imperial), "6.0 mph");
    }
}
