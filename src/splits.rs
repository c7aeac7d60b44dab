//! Distance-interval split detection

use crate::models::Split;

/// Cumulative progress sampled when a split is checked
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitProgress {
    pub distance_meters: f64,
    pub duration_ms: i64,
}

/// Emits a split each time another full interval has been covered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitTracker {
    interval_meters: f64,
}

impl SplitTracker {
    /// A zero, negative or non-finite interval disables splits
    pub fn new(interval_meters: f64) -> Self {
        let interval_meters = if interval_meters.is_finite() && interval_meters > 0.0 {
            interval_meters
        } else {
            0.0
        };
        Self { interval_meters }
    }

    pub fn is_enabled(&self) -> bool {
        self.interval_meters > 0.0
    }

    pub fn interval_meters(&self) -> f64 {
        self.interval_meters
    }

    /// Check whether `current` closes a new split after `previous`.
    ///
    /// The split pace covers only the stretch since the previous boundary
    /// (or session start). A split is withheld until elapsed time has moved
    /// past the previous boundary, so splits stay strictly increasing in
    /// both distance and time.
    pub fn maybe_split(&self, current: SplitProgress, previous: Option<&Split>) -> Option<Split> {
        if !self.is_enabled() {
            return None;
        }

        let (base_distance, base_duration) = previous
            .map(|split| (split.cumulative_distance_meters, split.cumulative_duration_ms))
            .unwrap_or((0.0, 0));

        let covered = current.distance_meters - base_distance;
        if covered < self.interval_meters {
            return None;
        }

        let elapsed_ms = current.duration_ms - base_duration;
        if elapsed_ms <= 0 {
            return None;
        }

        Some(Split {
            cumulative_distance_meters: current.distance_meters,
            cumulative_duration_ms: current.duration_ms,
            pace_meters_per_second: covered / (elapsed_ms as f64 / 1000.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn progress(distance_meters: f64, duration_ms: i64) -> SplitProgress {
        SplitProgress {
            distance_meters,
            duration_ms,
        }
    }

    #[test]
    fn test_first_split() {
        let tracker = SplitTracker::new(1000.0);
        assert_eq!(tracker.maybe_split(progress(999.9, 290_000), None), None);

        let split = tracker.maybe_split(progress(1000.0, 300_000), None).unwrap();
        assert_eq!(split.cumulative_distance_meters, 1000.0);
        assert_eq!(split.cumulative_duration_ms, 300_000);
        assert!((split.pace_meters_per_second - 1000.0 / 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_pace_only_counts_since_last_split() {
        let tracker = SplitTracker::new(1000.0);
        let first = tracker.maybe_split(progress(1010.0, 300_000), None).unwrap();

        assert_eq!(tracker.maybe_split(progress(2000.0, 500_000), Some(&first)), None);

        let second = tracker
            .maybe_split(progress(2010.0, 550_000), Some(&first))
            .unwrap();
        assert!((second.pace_meters_per_second - 1000.0 / 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_split_without_elapsed_time() {
        let tracker = SplitTracker::new(100.0);
        let first = tracker.maybe_split(progress(100.0, 10_000), None).unwrap();
        assert_eq!(tracker.maybe_split(progress(250.0, 10_000), Some(&first)), None);
        assert!(tracker.maybe_split(progress(150.0, 0), None).is_none());
    }

    #[test]
    fn test_disabled_tracker() {
        let tracker = SplitTracker::new(0.0);
        assert!(!tracker.is_enabled());
        assert_eq!(tracker.maybe_split(progress(5000.0, 60_000), None), None);
        assert!(!SplitTracker::new(f64::NAN).is_enabled());
    }

    proptest! {
        #[test]
        fn test_splits_strictly_increase(
            steps in prop::collection::vec((0.0f64..400.0, 0i64..120_000), 1..200),
        ) {
            let tracker = SplitTracker::new(500.0);
            let mut splits: Vec<Split> = Vec::new();
            let (mut distance, mut duration) = (0.0, 0i64);

            for (delta_d, delta_t) in steps {
                distance += delta_d;
                duration += delta_t;
                if let Some(split) = tracker.maybe_split(progress(distance, duration), splits.last()) {
                    splits.push(split);
                }
            }

            for pair in splits.windows(2) {
                prop_assert!(pair[1].cumulative_distance_meters - pair[0].cumulative_distance_meters >= 500.0);
                prop_assert!(pair[1].cumulative_duration_ms > pair[0].cumulative_duration_ms);
            }
            for split in &splits {
                prop_assert!(split.pace_meters_per_second.is_finite());
            }
        }
    }
}
