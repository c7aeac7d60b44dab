//! Activity session state machine
//!
//! `SessionController` owns the single session a device tracks at a time and
//! walks it through Idle -> Active -> Completed -> Idle. Sensor and clock
//! events are routed through the geo filter, metric accumulators, split
//! tracker, goal evaluator and milestone scheduler; the controller answers
//! each event with the side effects the presentation layer should perform.
//!
//! Calling a lifecycle operation from the wrong state is a caller bug and is
//! reported as [`SessionError::InvalidTransition`] without touching state.
//! Sensor noise, on the other hand, is silently absorbed.

use crate::alerts::{AlertScheduler, AlertState, AlertStatus};
use crate::error::SessionError;
use crate::geo::{FilterOutcome, GeoFilter, DEFAULT_NOISE_FLOOR_METERS};
use crate::goals::{GoalEvaluator, GoalProgress, GoalStatus};
use crate::metrics::{MetricsAccumulator, DEFAULT_ELEVATION_DEAD_BAND_METERS};
use crate::models::{GpsSample, Goal, PositionFix, SessionId, SessionState, Split, Timestamp};
use crate::record::{SessionRecord, TrackPoint, RECORD_VERSION};
use crate::splits::{SplitProgress, SplitTracker};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// When the step counter baseline is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepBaselineMode {
    /// First step event after start; guards against a stale read at start
    #[default]
    FirstEvent,
    /// Counter value supplied to `start()`, falling back to the first event
    AtStart,
}

/// Tuning that stays fixed for the lifetime of a controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub noise_floor_meters: f64,
    /// `None` or zero disables splits
    pub split_interval_meters: Option<f64>,
    pub elevation_dead_band_meters: f64,
    pub step_baseline: StepBaselineMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            noise_floor_meters: DEFAULT_NOISE_FLOOR_METERS,
            split_interval_meters: Some(1000.0),
            elevation_dead_band_meters: DEFAULT_ELEVATION_DEAD_BAND_METERS,
            step_baseline: StepBaselineMode::FirstEvent,
        }
    }
}

/// Inputs delivered by sensors and the periodic timer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorEvent {
    /// Raw receiver output including its fix-valid flag
    Gps(GpsSample),
    /// Position already known to come from a valid fix
    Position(PositionFix),
    /// Cumulative device step counter
    Steps(u64),
    ClockTick(Timestamp),
}

/// Side effects for the presentation and haptic layers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionOutput {
    RedrawNeeded,
    GoalCompleted { goal: Goal },
    MilestoneReached { threshold_meters: f64, distance_meters: f64 },
    SplitRecorded(Split),
}

/// State of one activity session
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    started_at: Timestamp,
    stopped_at: Option<Timestamp>,
    metrics: MetricsAccumulator,
    track: Vec<PositionFix>,
    splits: Vec<Split>,
    goal: GoalEvaluator,
    alerts: AlertScheduler,
    /// Last fix that moved the session; distances are measured from here
    reference: Option<PositionFix>,
}

impl Session {
    fn new(
        started_at: Timestamp,
        goal: Goal,
        alert_interval_meters: Option<f64>,
        step_baseline: Option<u64>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            id: SessionId::from_start(started_at),
            state: SessionState::Active,
            started_at,
            stopped_at: None,
            metrics: MetricsAccumulator::new(
                started_at,
                config.elevation_dead_band_meters,
                step_baseline,
            ),
            track: Vec::new(),
            splits: Vec::new(),
            goal: GoalEvaluator::new(goal),
            alerts: AlertScheduler::new(alert_interval_meters),
            reference: None,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn stopped_at(&self) -> Option<Timestamp> {
        self.stopped_at
    }

    pub fn metrics(&self) -> &MetricsAccumulator {
        &self.metrics
    }

    pub fn distance_meters(&self) -> f64 {
        self.metrics.distance_meters
    }

    pub fn duration_ms(&self) -> i64 {
        self.metrics.duration_ms
    }

    pub fn step_count(&self) -> u32 {
        self.metrics.step_count
    }

    pub fn track(&self) -> &[PositionFix] {
        &self.track
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    pub fn goal(&self) -> Goal {
        self.goal.goal()
    }

    pub fn goal_completed(&self) -> bool {
        self.goal.is_completed()
    }

    /// Fraction of the goal target reached, `None` without a goal
    pub fn goal_progress(&self) -> Option<f64> {
        self.goal.progress_fraction(&self.goal_inputs())
    }

    pub fn alert_state(&self) -> Option<&AlertState> {
        self.alerts.state()
    }

    fn goal_inputs(&self) -> GoalProgress {
        GoalProgress {
            distance_meters: self.metrics.distance_meters,
            duration_ms: self.metrics.duration_ms,
            step_count: self.metrics.step_count,
        }
    }

    /// Apply one sensor event to an active session
    pub fn apply(
        &mut self,
        event: SensorEvent,
        filter: &GeoFilter,
        split_tracker: &SplitTracker,
    ) -> Vec<SessionOutput> {
        if self.state != SessionState::Active {
            return Vec::new();
        }

        match event {
            SensorEvent::Gps(sample) => match sample.fix() {
                Some(fix) => self.apply_fix(fix, filter, split_tracker),
                None => {
                    debug!(session = %self.id, "GPS sample without fix");
                    Vec::new()
                }
            },
            SensorEvent::Position(fix) => self.apply_fix(fix, filter, split_tracker),
            SensorEvent::Steps(cumulative) => {
                self.metrics.on_step_tick(cumulative);
                Vec::new()
            }
            SensorEvent::ClockTick(now) => self.apply_tick(now),
        }
    }

    fn apply_fix(
        &mut self,
        fix: PositionFix,
        filter: &GeoFilter,
        split_tracker: &SplitTracker,
    ) -> Vec<SessionOutput> {
        let outcome = filter.accept(fix, self.reference.as_ref());
        let mut outputs = Vec::new();

        match outcome {
            FilterOutcome::Invalid(reason) => {
                debug!(session = %self.id, ?reason, "Dropped invalid fix");
            }
            FilterOutcome::Noise { distance_meters } => {
                debug!(session = %self.id, distance_meters, "Fix within noise floor");
            }
            FilterOutcome::FirstPoint(fix) => {
                self.metrics.on_accepted(0.0, &fix);
                if let Some(altitude) = fix.usable_altitude() {
                    self.metrics.on_elevation(altitude, None);
                }
                self.track.push(fix);
                self.reference = Some(fix);
                debug!(session = %self.id, lat = fix.latitude, lon = fix.longitude, "First fix");
            }
            FilterOutcome::Accepted {
                distance_meters,
                fix,
                speed_mps,
            } => {
                let previous_altitude = self.reference.and_then(|r| r.usable_altitude());

                self.metrics.on_accepted(distance_meters, &fix);
                self.metrics.on_step_speed(speed_mps);
                if let Some(altitude) = fix.usable_altitude() {
                    self.metrics.on_elevation(altitude, previous_altitude);
                }
                self.track.push(fix);
                self.reference = Some(fix);

                // Split time comes from the device clock, never the receiver's
                let progress = SplitProgress {
                    distance_meters: self.metrics.distance_meters,
                    duration_ms: self.metrics.duration_ms,
                };
                if let Some(split) = split_tracker.maybe_split(progress, self.splits.last()) {
                    info!(
                        session = %self.id,
                        split = self.splits.len() + 1,
                        distance_meters = split.cumulative_distance_meters,
                        pace_mps = split.pace_meters_per_second,
                        "Split recorded"
                    );
                    self.splits.push(split);
                    outputs.push(SessionOutput::SplitRecorded(split));
                }

                outputs.push(SessionOutput::RedrawNeeded);
            }
        }

        outputs
    }

    fn apply_tick(&mut self, now: Timestamp) -> Vec<SessionOutput> {
        self.metrics.on_timer_tick(now);
        let mut outputs = Vec::new();

        if self.goal.evaluate(&self.goal_inputs()) == GoalStatus::Completed {
            info!(session = %self.id, goal = ?self.goal.goal(), "Goal completed");
            outputs.push(SessionOutput::GoalCompleted {
                goal: self.goal.goal(),
            });
        }

        if let AlertStatus::Fired { threshold_meters } =
            self.alerts.evaluate(self.metrics.distance_meters)
        {
            info!(session = %self.id, threshold_meters, "Milestone reached");
            outputs.push(SessionOutput::MilestoneReached {
                threshold_meters,
                distance_meters: self.metrics.distance_meters,
            });
        }

        outputs.push(SessionOutput::RedrawNeeded);
        outputs
    }

    /// Immutable snapshot of the session in its persisted shape
    pub fn to_record(&self) -> SessionRecord {
        let goal = self.goal.goal();
        SessionRecord {
            version: RECORD_VERSION.to_string(),
            id: Some(self.id.clone()),
            started_at: self.started_at,
            stopped_at: self.stopped_at,
            duration_ms: self.metrics.duration_ms,
            distance_meters: self.metrics.distance_meters,
            step_count: self.metrics.step_count,
            track: self.track.iter().map(TrackPoint::from).collect(),
            goal_kind: goal.kind(),
            goal_target: goal.target_value(),
            goal_completed: self.goal.is_completed(),
            splits: self.splits.clone(),
            max_speed_mps: self.metrics.max_speed_mps,
            min_elevation: self.metrics.min_elevation,
            max_elevation: self.metrics.max_elevation,
            elevation_gain_meters: self.metrics.elevation_gain_meters,
            elevation_loss_meters: self.metrics.elevation_loss_meters,
            synced: false,
        }
    }
}

/// Owner of the device's single activity session
#[derive(Debug, Clone)]
pub struct SessionController {
    config: EngineConfig,
    filter: GeoFilter,
    split_tracker: SplitTracker,
    session: Option<Session>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SessionController {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            filter: GeoFilter::new(config.noise_floor_meters),
            split_tracker: SplitTracker::new(config.split_interval_meters.unwrap_or(0.0)),
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Idle, |session| session.state)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        let err = SessionError::InvalidTransition {
            operation,
            state: self.state(),
        };
        error!(%err, "Session lifecycle violation");
        err
    }

    /// Begin a new session; allowed from Idle or Completed
    pub fn start(
        &mut self,
        now: Timestamp,
        goal: Goal,
        alert_interval_meters: Option<f64>,
        initial_step_baseline: Option<u64>,
    ) -> Result<Vec<SessionOutput>, SessionError> {
        if self.state() == SessionState::Active {
            return Err(self.invalid("start"));
        }

        let baseline = match self.config.step_baseline {
            StepBaselineMode::FirstEvent => None,
            StepBaselineMode::AtStart => initial_step_baseline,
        };

        let session = Session::new(now, goal, alert_interval_meters, baseline, &self.config);
        info!(
            session = %session.id,
            goal = ?goal,
            alert_interval_meters = ?alert_interval_meters,
            "Session started"
        );
        self.session = Some(session);

        Ok(vec![SessionOutput::RedrawNeeded])
    }

    /// Route any sensor or clock event; ignored unless a session is active
    pub fn handle_event(&mut self, event: SensorEvent) -> Vec<SessionOutput> {
        match self.session.as_mut() {
            Some(session) => session.apply(event, &self.filter, &self.split_tracker),
            None => Vec::new(),
        }
    }

    pub fn on_gps_sample(&mut self, sample: GpsSample) -> Vec<SessionOutput> {
        self.handle_event(SensorEvent::Gps(sample))
    }

    pub fn on_position_fix(&mut self, fix: PositionFix) -> Vec<SessionOutput> {
        self.handle_event(SensorEvent::Position(fix))
    }

    pub fn on_step_event(&mut self, cumulative_steps: u64) -> Vec<SessionOutput> {
        self.handle_event(SensorEvent::Steps(cumulative_steps))
    }

    pub fn on_clock_tick(&mut self, now: Timestamp) -> Vec<SessionOutput> {
        self.handle_event(SensorEvent::ClockTick(now))
    }

    /// Finish the active session and hand back its record for persistence
    pub fn stop(&mut self, now: Timestamp) -> Result<SessionRecord, SessionError> {
        let session = match self.session.as_mut() {
            Some(session) if session.state == SessionState::Active => session,
            _ => return Err(self.invalid("stop")),
        };

        session.metrics.on_timer_tick(now);
        session.stopped_at = Some(now);
        session.state = SessionState::Completed;

        let record = session.to_record();
        info!(
            session = %session.id,
            distance_meters = record.distance_meters,
            duration_ms = record.duration_ms,
            steps = record.step_count,
            goal_completed = record.goal_completed,
            "Session completed"
        );
        Ok(record)
    }

    /// Release a completed session and return to Idle
    pub fn discard(&mut self) -> Result<(), SessionError> {
        if self.state() != SessionState::Completed {
            return Err(self.invalid("discard"));
        }

        if let Some(session) = self.session.take() {
            info!(session = %session.id, "Session discarded");
        }
        Ok(())
    }

    /// Current record of an active or completed session
    pub fn snapshot(&self) -> Option<SessionRecord> {
        self.session.as_ref().map(Session::to_record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::EARTH_RADIUS_METERS;
    use proptest::prelude::*;
    use std::time::Duration;

    const START: Timestamp = 1_700_000_000_000;

    fn north(meters: f64) -> f64 {
        (meters / EARTH_RADIUS_METERS).to_degrees()
    }

    fn fix_at(meters_north: f64, at: Timestamp) -> PositionFix {
        PositionFix::new(45.0 + north(meters_north), 7.0, at)
    }

    fn active_controller(goal: Goal, alert_interval: Option<f64>) -> SessionController {
        let mut controller = SessionController::default();
        controller.start(START, goal, alert_interval, None).unwrap();
        controller
    }

    #[test]
    fn test_start_emits_redraw() {
        let mut controller = SessionController::default();
        let outputs = controller.start(START, Goal::None, None, None).unwrap();
        assert_eq!(outputs, vec![SessionOutput::RedrawNeeded]);
        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(controller.session().unwrap().id().as_str(), "run.1700000000000");
    }

    #[test]
    fn test_two_fixes_hundred_meters_apart() {
        let mut controller = active_controller(Goal::None, None);

        let first = controller.on_position_fix(fix_at(0.0, START));
        assert!(first.is_empty());

        let second = controller.on_position_fix(fix_at(100.0, START + 1_000));
        assert_eq!(second, vec![SessionOutput::RedrawNeeded]);

        let session = controller.session().unwrap();
        assert!((session.distance_meters() - 100.0).abs() < 0.01);
        assert!((session.metrics().current_speed_mps.unwrap() - 10.0).abs() < 0.001);
        assert_eq!(session.track().len(), 2);
    }

    #[test]
    fn test_noise_and_invalid_fixes_do_not_redraw() {
        let mut controller = active_controller(Goal::None, None);
        controller.on_position_fix(fix_at(0.0, START));

        assert!(controller.on_position_fix(fix_at(1.0, START + 1_000)).is_empty());
        assert!(controller
            .on_position_fix(PositionFix::new(0.0, 0.0, START + 2_000))
            .is_empty());
        assert!(controller.on_position_fix(fix_at(50.0, START - 5_000)).is_empty());

        let session = controller.session().unwrap();
        assert_eq!(session.distance_meters(), 0.0);
        assert_eq!(session.track().len(), 1);
    }

    #[test]
    fn test_gps_sample_without_fix_is_ignored() {
        let mut controller = active_controller(Goal::None, None);
        let outputs = controller.on_gps_sample(GpsSample {
            has_fix: false,
            position: fix_at(0.0, START),
        });
        assert!(outputs.is_empty());
        assert!(controller.session().unwrap().track().is_empty());
    }

    #[test]
    fn test_distance_goal_fires_once() {
        let mut controller = active_controller(Goal::Distance(1000.0), None);

        for i in 0..=10 {
            let at = START + i * 30_000;
            controller.on_position_fix(fix_at(101.0 * i as f64, at));
        }

        let outputs = controller.on_clock_tick(START + 300_000);
        assert!(outputs.contains(&SessionOutput::GoalCompleted {
            goal: Goal::Distance(1000.0)
        }));
        assert!(controller.session().unwrap().goal_completed());

        for i in 1..5 {
            let outputs = controller.on_clock_tick(START + 300_000 + i * 2_000);
            assert!(!outputs
                .iter()
                .any(|o| matches!(o, SessionOutput::GoalCompleted { .. })));
        }
        assert!(controller.session().unwrap().goal_completed());
    }

    #[test]
    fn test_time_goal_and_milestones() {
        let mut controller =
            active_controller(Goal::Time(Duration::from_secs(120)), Some(200.0));

        controller.on_position_fix(fix_at(0.0, START));
        controller.on_position_fix(fix_at(250.0, START + 60_000));

        let outputs = controller.on_clock_tick(START + 60_000);
        assert_eq!(
            outputs,
            vec![
                SessionOutput::MilestoneReached {
                    threshold_meters: 200.0,
                    distance_meters: controller.session().unwrap().distance_meters(),
                },
                SessionOutput::RedrawNeeded,
            ]
        );

        let outputs = controller.on_clock_tick(START + 120_000);
        assert_eq!(outputs[0], SessionOutput::GoalCompleted {
            goal: Goal::Time(Duration::from_secs(120))
        });
        assert_eq!(
            controller.session().unwrap().alert_state().unwrap().next_threshold_meters,
            400.0
        );
    }

    #[test]
    fn test_splits_recorded_on_fixes() {
        let mut controller = SessionController::new(EngineConfig {
            split_interval_meters: Some(500.0),
            ..EngineConfig::default()
        });
        controller.start(START, Goal::None, None, None).unwrap();

        controller.on_position_fix(fix_at(0.0, START));
        let mut recorded = 0;
        for i in 1..=12 {
            controller.on_clock_tick(START + i * 20_000);
            let outputs = controller.on_position_fix(fix_at(101.0 * i as f64, START + i * 20_000));
            recorded += outputs
                .iter()
                .filter(|o| matches!(o, SessionOutput::SplitRecorded(_)))
                .count();
        }

        let splits = controller.session().unwrap().splits();
        assert_eq!(recorded, 2);
        assert_eq!(splits.len(), 2);
        assert!(splits[1].cumulative_distance_meters > splits[0].cumulative_distance_meters);
        assert!(splits[1].cumulative_duration_ms > splits[0].cumulative_duration_ms);
        assert!((splits[0].pace_meters_per_second - 5.05).abs() < 0.01);
    }

    #[test]
    fn test_split_waits_for_clock_to_advance() {
        let mut controller = SessionController::new(EngineConfig {
            split_interval_meters: Some(100.0),
            ..EngineConfig::default()
        });
        controller.start(START, Goal::None, None, None).unwrap();
        controller.on_position_fix(fix_at(0.0, START));

        // No tick yet: the receiver clock alone cannot time a split
        let outputs = controller.on_position_fix(fix_at(150.0, START + 30_000));
        assert_eq!(outputs, vec![SessionOutput::RedrawNeeded]);
        assert!(controller.session().unwrap().splits().is_empty());

        controller.on_clock_tick(START + 40_000);
        let outputs = controller.on_position_fix(fix_at(160.0, START + 41_000));
        assert!(matches!(outputs[0], SessionOutput::SplitRecorded(_)));

        let split = controller.session().unwrap().splits()[0];
        assert_eq!(split.cumulative_duration_ms, 40_000);
        assert!((split.pace_meters_per_second - 4.0).abs() < 0.01);
    }

    #[test]
    fn test_skewed_gps_clock_does_not_move_duration() {
        let mut controller = active_controller(Goal::Time(Duration::from_secs(1800)), None);

        controller.on_position_fix(fix_at(0.0, START + 3_600_000));
        let outputs = controller.on_position_fix(fix_at(50.0, START + 3_610_000));
        assert_eq!(outputs, vec![SessionOutput::RedrawNeeded]);
        assert_eq!(controller.session().unwrap().duration_ms(), 0);

        let outputs = controller.on_clock_tick(START + 10_000);
        assert_eq!(outputs, vec![SessionOutput::RedrawNeeded]);
        assert_eq!(controller.session().unwrap().duration_ms(), 10_000);
        assert!(!controller.session().unwrap().goal_completed());

        let record = controller.stop(START + 20_000).unwrap();
        assert_eq!(record.duration_ms, 20_000);
        assert_eq!(Some(record.duration_ms), record.stopped_at.map(|t| t - record.started_at));
        assert!(!record.goal_completed);
        assert!((record.distance_meters - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_lazy_step_baseline() {
        let mut controller = active_controller(Goal::Steps(100), None);
        controller.on_step_event(12_000);
        controller.on_step_event(12_060);
        assert_eq!(controller.session().unwrap().step_count(), 60);

        controller.on_step_event(12_100);
        let outputs = controller.on_clock_tick(START + 1_000);
        assert_eq!(outputs[0], SessionOutput::GoalCompleted { goal: Goal::Steps(100) });
    }

    #[test]
    fn test_at_start_step_baseline() {
        let mut controller = SessionController::new(EngineConfig {
            step_baseline: StepBaselineMode::AtStart,
            ..EngineConfig::default()
        });
        controller.start(START, Goal::None, None, Some(11_950)).unwrap();
        controller.on_step_event(12_000);
        assert_eq!(controller.session().unwrap().step_count(), 50);
    }

    #[test]
    fn test_elevation_tracked_from_reference() {
        let mut controller = active_controller(Goal::None, None);
        controller.on_position_fix(fix_at(0.0, START).with_altitude(100.0));
        // Jitter with a large altitude swing must not count
        controller.on_position_fix(fix_at(0.5, START + 1_000).with_altitude(150.0));
        controller.on_position_fix(fix_at(100.0, START + 30_000).with_altitude(104.0));
        controller.on_position_fix(fix_at(200.0, START + 60_000).with_altitude(101.0));

        let metrics = controller.session().unwrap().metrics();
        assert_eq!(metrics.elevation_gain_meters, 4.0);
        assert_eq!(metrics.elevation_loss_meters, 3.0);
        assert_eq!(metrics.min_elevation, Some(100.0));
        assert_eq!(metrics.max_elevation, Some(104.0));
    }

    #[test]
    fn test_events_ignored_unless_active() {
        let mut controller = SessionController::default();
        assert!(controller.on_position_fix(fix_at(0.0, START)).is_empty());
        assert!(controller.on_clock_tick(START).is_empty());
        assert!(controller.session().is_none());

        controller.start(START, Goal::None, None, None).unwrap();
        controller.stop(START + 10_000).unwrap();
        assert!(controller.on_step_event(500).is_empty());
        assert!(controller.on_clock_tick(START + 20_000).is_empty());
        assert_eq!(controller.session().unwrap().duration_ms(), 10_000);
    }

    #[test]
    fn test_stop_from_idle_is_an_error() {
        let mut controller = SessionController::default();
        let err = controller.stop(START).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                operation: "stop",
                state: SessionState::Idle
            }
        );
        assert!(controller.session().is_none());
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut controller = SessionController::default();
        assert!(controller.discard().is_err());

        controller.start(START, Goal::None, None, None).unwrap();
        assert!(controller.start(START + 1, Goal::None, None, None).is_err());
        assert!(controller.discard().is_err());
        assert_eq!(controller.session().unwrap().started_at(), START);

        controller.stop(START + 5_000).unwrap();
        assert!(controller.stop(START + 6_000).is_err());
    }

    #[test]
    fn test_full_lifecycle() {
        let mut controller = active_controller(Goal::Distance(150.0), Some(1000.0));
        controller.on_position_fix(fix_at(0.0, START + 1_000));
        controller.on_position_fix(fix_at(160.0, START + 61_000));
        controller.on_clock_tick(START + 62_000);

        let record = controller.stop(START + 65_000).unwrap();
        assert_eq!(controller.state(), SessionState::Completed);
        assert_eq!(record.stopped_at, Some(START + 65_000));
        assert_eq!(record.duration_ms, 65_000);
        assert!(record.goal_completed);
        assert_eq!(record.track.len(), 2);
        assert_eq!(controller.snapshot(), Some(record.clone()));

        controller.discard().unwrap();
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.snapshot().is_none());

        // A completed session may be replaced directly by a new one
        controller.start(START + 100_000, Goal::None, None, None).unwrap();
        controller.stop(START + 110_000).unwrap();
        controller.start(START + 120_000, Goal::None, None, None).unwrap();
        assert_eq!(controller.session().unwrap().distance_meters(), 0.0);
    }

    proptest! {
        #[test]
        fn test_distance_is_sum_of_accepted_deltas(
            moves in prop::collection::vec((-300.0f64..300.0, -300.0f64..300.0, 0i64..20_000), 1..60),
        ) {
            let mut controller = active_controller(Goal::None, None);
            let filter = GeoFilter::default();
            let mut reference: Option<PositionFix> = None;
            let mut expected = 0.0;
            let mut last_distance = 0.0;
            let (mut north_m, mut east_m, mut at) = (0.0f64, 0.0f64, START);

            for (dn, de, dt) in moves {
                north_m += dn;
                east_m += de;
                at += dt;
                let fix = PositionFix::new(
                    45.0 + north(north_m),
                    7.0 + north(east_m) / 45.0f64.to_radians().cos(),
                    at,
                );

                let outcome = filter.accept(fix, reference.as_ref());
                if let FilterOutcome::Accepted { distance_meters, .. } = outcome {
                    expected += distance_meters;
                }
                if let Some(next) = outcome.reference() {
                    reference = Some(next);
                }

                controller.on_position_fix(fix);
                let distance = controller.session().unwrap().distance_meters();
                prop_assert!(distance >= last_distance);
                last_distance = distance;
            }

            prop_assert!((last_distance - expected).abs() < 1e-6);
        }
    }
}
