//! One-shot goal completion

use crate::models::Goal;

/// Metrics a goal can be measured against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalProgress {
    pub distance_meters: f64,
    pub duration_ms: i64,
    pub step_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalStatus {
    /// The goal was reached by this evaluation
    Completed,
    Pending,
}

/// Tracks a single goal; completion is latched for the rest of the session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalEvaluator {
    goal: Goal,
    completed: bool,
}

impl GoalEvaluator {
    pub fn new(goal: Goal) -> Self {
        Self {
            goal,
            completed: false,
        }
    }

    pub fn goal(&self) -> Goal {
        self.goal
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Returns `Completed` exactly once, on the evaluation that crosses the target
    pub fn evaluate(&mut self, progress: &GoalProgress) -> GoalStatus {
        if self.completed {
            return GoalStatus::Pending;
        }

        let reached = match self.goal {
            Goal::None => false,
            Goal::Distance(target) => progress.distance_meters >= target,
            Goal::Time(target) => {
                u128::try_from(progress.duration_ms).map_or(false, |ms| ms >= target.as_millis())
            }
            Goal::Steps(target) => progress.step_count >= target,
        };

        if reached {
            self.completed = true;
            GoalStatus::Completed
        } else {
            GoalStatus::Pending
        }
    }

    /// Fraction of the target reached, `None` without a goal
    pub fn progress_fraction(&self, progress: &GoalProgress) -> Option<f64> {
        let target = self.goal.target_value();
        if self.goal == Goal::None || target <= 0.0 {
            return None;
        }

        let current = match self.goal {
            Goal::None => return None,
            Goal::Distance(_) => progress.distance_meters,
            Goal::Time(_) => progress.duration_ms as f64,
            Goal::Steps(_) => f64::from(progress.step_count),
        };
        Some(current / target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn progress(distance_meters: f64, duration_ms: i64, step_count: u32) -> GoalProgress {
        GoalProgress {
            distance_meters,
            duration_ms,
            step_count,
        }
    }

    #[test]
    fn test_distance_goal_fires_once() {
        let mut evaluator = GoalEvaluator::new(Goal::Distance(1000.0));
        assert_eq!(evaluator.evaluate(&progress(999.0, 0, 0)), GoalStatus::Pending);
        assert_eq!(evaluator.evaluate(&progress(1000.0, 0, 0)), GoalStatus::Completed);
        assert!(evaluator.is_completed());

        for _ in 0..5 {
            assert_eq!(evaluator.evaluate(&progress(1500.0, 0, 0)), GoalStatus::Pending);
        }
        assert!(evaluator.is_completed());
    }

    #[test]
    fn test_time_and_step_goals() {
        let mut time_goal = GoalEvaluator::new(Goal::Time(Duration::from_secs(60)));
        assert_eq!(time_goal.evaluate(&progress(0.0, 59_999, 0)), GoalStatus::Pending);
        assert_eq!(time_goal.evaluate(&progress(0.0, 60_000, 0)), GoalStatus::Completed);

        let mut step_goal = GoalEvaluator::new(Goal::Steps(500));
        assert_eq!(step_goal.evaluate(&progress(0.0, 0, 499)), GoalStatus::Pending);
        assert_eq!(step_goal.evaluate(&progress(0.0, 0, 500)), GoalStatus::Completed);
    }

    #[test]
    fn test_no_goal_never_completes() {
        let mut evaluator = GoalEvaluator::new(Goal::None);
        assert_eq!(
            evaluator.evaluate(&progress(1e9, i64::MAX, u32::MAX)),
            GoalStatus::Pending
        );
        assert_eq!(evaluator.progress_fraction(&progress(10.0, 0, 0)), None);
    }

    #[test]
    fn test_progress_fraction() {
        let evaluator = GoalEvaluator::new(Goal::Distance(2000.0));
        assert_eq!(evaluator.progress_fraction(&progress(500.0, 0, 0)), Some(0.25));
    }
}
