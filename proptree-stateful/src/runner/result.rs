//! Outcomes of stateful runs

use std::fmt;
use std::time::Duration;

use proptree::PropertyError;

use crate::operations::{Action, action_names};

/// Information about a passing stateful run
#[derive(Debug, Clone)]
pub struct StatefulSuccess {
    pub runs_executed: usize,
    /// Total actions applied across all runs
    pub actions_executed: usize,
    pub seed: u64,
    pub duration: Duration,
}

/// Information about a failing stateful run
#[derive(Debug, Clone)]
pub struct StatefulFailure<S, M = ()> {
    /// Initial state of the failing run; absent when nothing was generated
    pub initial_state: Option<S>,
    /// Actions applied in the failing run, up to and including the failing one
    pub action_sequence: Vec<Action<S, M>>,
    pub shrunk_initial_state: Option<S>,
    pub shrunk_sequence: Vec<Action<S, M>>,
    /// Index of the failing action within `shrunk_sequence`
    pub failing_step_index: Option<usize>,
    /// Error reported for the shrunk run
    pub error: PropertyError,
    pub seed: u64,
    pub runs_executed: usize,
    pub shrink_steps: usize,
    /// False when the shrink budget ran out before the search converged
    pub shrink_completed: bool,
    pub test_duration: Duration,
}

/// Result of [`crate::StatefulProperty::run`]
pub type StatefulTestResult<S, M = ()> = Result<StatefulSuccess, StatefulFailure<S, M>>;

impl<S, M> StatefulFailure<S, M> {
    /// A failure raised before any action ran
    pub(crate) fn before_actions(error: PropertyError, seed: u64, runs_executed: usize) -> Self {
        Self {
            initial_state: None,
            action_sequence: Vec::new(),
            shrunk_initial_state: None,
            shrunk_sequence: Vec::new(),
            failing_step_index: None,
            error,
            seed,
            runs_executed,
            shrink_steps: 0,
            shrink_completed: true,
            test_duration: Duration::ZERO,
        }
    }

    /// Names of the shrunk actions, in order
    pub fn shrunk_action_names(&self) -> Vec<&str> {
        action_names(&self.shrunk_sequence)
    }

    pub fn detailed_report(&self) -> String
    where
        S: fmt::Debug,
    {
        let mut report = String::new();
        report.push_str(&format!(
            "Stateful property failed after {} runs (seed: {})\n",
            self.runs_executed, self.seed
        ));
        report.push_str(&format!("Error: {}\n", self.error));

        match &self.initial_state {
            Some(state) => {
                report.push_str(&format!("Initial state: {:?}\n", state));
                report.push_str(&format!(
                    "Actions: {:?}\n",
                    action_names(&self.action_sequence)
                ));
            }
            None => report.push_str("Initial state: <not generated>\n"),
        }
        if let Some(state) = &self.shrunk_initial_state {
            report.push_str(&format!("Shrunk initial state: {:?}\n", state));
            report.push_str(&format!("Shrunk actions: {:?}\n", self.shrunk_action_names()));
            if let Some(step) = self.failing_step_index {
                report.push_str(&format!("Failing step: {}\n", step));
            }
            report.push_str(&format!("Shrinking steps: {}\n", self.shrink_steps));
            if !self.shrink_completed {
                report.push_str("Shrinking stopped early: result is not fully minimized\n");
            }
        }
        report
    }
}

impl<S, M> fmt::Display for StatefulFailure<S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stateful property failed after {} runs, seed {}: {}",
            self.runs_executed, self.seed, self.error
        )?;
        if !self.shrunk_sequence.is_empty() {
            write!(f, " (actions: {})", self.shrunk_action_names().join(", "))?;
        }
        Ok(())
    }
}
