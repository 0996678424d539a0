//! Two-stage shrinking of a failing stateful run
//!
//! 1. **Sequence**: with the original initial state fixed, search for a
//!    shorter action list that still fails. Candidates remove contiguous
//!    runs of actions, largest runs first, using the same collection tree
//!    and greedy search as ordinary properties.
//! 2. **State**: with the minimal action list fixed, shrink the initial
//!    state along its own shrink tree.
//!
//! Every candidate is replayed from a fresh clone, so no state leaks
//! between attempts. A candidate only counts as failing when it reproduces
//! the same kind of failure as the original run (see [`same_failure`]).

use proptree::shrink::strategies;
use proptree::{PropertyError, ShrinkConfig, ShrinkEngine, Shrinkable};
use tracing::debug;

use crate::operations::Action;

/// The smallest failing run found
#[derive(Debug, Clone)]
pub struct ShrunkRun<S, M> {
    pub initial_state: S,
    pub actions: Vec<Action<S, M>>,
    pub error: PropertyError,
    /// Accepted steps across both stages
    pub shrink_steps: usize,
    /// False when either stage ran out of budget
    pub completed: bool,
}

/// Index of the action a stateful error was raised for
pub fn failing_step(error: &PropertyError) -> Option<usize> {
    match error {
        PropertyError::ActionApplicationError { step, .. } => Some(*step),
        PropertyError::PostCheckViolation { step, .. } => *step,
        _ => None,
    }
}

/// Whether `candidate` reproduces the failure reported as `original`.
///
/// The error kinds must match; action failures must also come from an
/// action with the same name. Actions are drawn for a specific live state,
/// so a shortened sequence can fail for an unrelated reason, such as an
/// action applied to a state it was never offered for.
pub fn same_failure(original: &PropertyError, candidate: &PropertyError) -> bool {
    match (original, candidate) {
        (
            PropertyError::ActionApplicationError { action: a, .. },
            PropertyError::ActionApplicationError { action: b, .. },
        ) => a == b,
        _ => std::mem::discriminant(original) == std::mem::discriminant(candidate),
    }
}

// Actions after the failing one never run, so they can be dropped.
fn truncate_to_failure<S, M>(actions: &mut Vec<Action<S, M>>, error: &PropertyError) {
    if let Some(step) = failing_step(error) {
        actions.truncate(step + 1);
    }
}

/// Shrink a failing run.
///
/// `replay` applies an action list to a copy of the given initial state
/// and reports the first failure, if any.
pub fn shrink_run<S, M, R>(
    initial: Shrinkable<S>,
    mut actions: Vec<Action<S, M>>,
    error: PropertyError,
    config: &ShrinkConfig,
    mut replay: R,
) -> ShrunkRun<S, M>
where
    S: Clone + 'static,
    M: 'static,
    R: FnMut(&S, &[Action<S, M>]) -> Result<(), PropertyError>,
{
    let engine = ShrinkEngine::with_config(config.clone());
    truncate_to_failure(&mut actions, &error);

    let original_error = error.clone();
    let mut reproduces = |state: &S, candidate: &[Action<S, M>]| match replay(state, candidate) {
        Err(found) if same_failure(&original_error, &found) => Err(found),
        _ => Ok(()),
    };

    let original_state = initial.value().clone();
    let elements = actions.into_iter().map(Shrinkable::new).collect();
    let sequences = strategies::values(strategies::sequence(elements, 0));
    let by_sequence = engine.shrink(sequences, error, |candidate: &Vec<Action<S, M>>| {
        reproduces(&original_state, candidate)
    });
    let mut minimal_actions = by_sequence.minimal;
    truncate_to_failure(&mut minimal_actions, &by_sequence.error);
    debug!(
        actions = minimal_actions.len(),
        steps = by_sequence.shrink_steps,
        "action sequence shrunk"
    );

    let by_state = engine.shrink(initial, by_sequence.error, |candidate: &S| {
        reproduces(candidate, &minimal_actions)
    });
    truncate_to_failure(&mut minimal_actions, &by_state.error);
    debug!(steps = by_state.shrink_steps, "initial state shrunk");

    ShrunkRun {
        initial_state: by_state.minimal,
        actions: minimal_actions,
        error: by_state.error,
        shrink_steps: by_sequence.shrink_steps + by_state.shrink_steps,
        completed: by_sequence.completed && by_state.completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::action_names;
    use proptree::shrink::strategies::integral;

    fn inc() -> Action<i64> {
        Action::simple("inc", |s: &mut i64| *s += 1)
    }

    fn dec() -> Action<i64> {
        Action::simple("dec", |s: &mut i64| *s -= 1)
    }

    // Fails as soon as the counter goes negative.
    fn replay(initial: &i64, actions: &[Action<i64>]) -> Result<(), PropertyError> {
        let mut state = *initial;
        for (step, action) in actions.iter().enumerate() {
            action.apply(&mut state, &mut (), step)?;
            if state < 0 {
                return Err(PropertyError::post_check_violation(Some(step), "negative"));
            }
        }
        Ok(())
    }

    #[test]
    fn test_failing_step_extraction() {
        assert_eq!(failing_step(&PropertyError::action_failed("a", 2, "x")), Some(2));
        assert_eq!(
            failing_step(&PropertyError::post_check_violation(Some(5), "x")),
            Some(5)
        );
        assert_eq!(failing_step(&PropertyError::assertion_failure("x")), None);
    }

    #[test]
    fn test_same_failure_compares_kind_and_action() {
        let post = PropertyError::post_check_violation(Some(2), "too long");
        assert!(same_failure(&post, &PropertyError::post_check_violation(Some(0), "other")));
        assert!(!same_failure(&post, &PropertyError::action_failed("pop", 0, "empty")));
        assert!(same_failure(
            &PropertyError::action_failed("pop", 3, "empty"),
            &PropertyError::action_failed("pop", 0, "empty")
        ));
        assert!(!same_failure(
            &PropertyError::action_failed("pop", 3, "empty"),
            &PropertyError::action_failed("peek", 0, "empty")
        ));
    }

    #[test]
    fn test_unrelated_action_errors_are_not_accepted() {
        // `pop` is only valid on a non-empty stack; dropping the pushes in
        // front of it would fail with an action error instead of the length check.
        fn push() -> Action<Vec<u8>> {
            Action::simple("push", |s: &mut Vec<u8>| s.push(0))
        }
        fn pop() -> Action<Vec<u8>> {
            Action::fallible("pop", |s: &mut Vec<u8>, _| {
                s.pop().map(|_| ()).ok_or_else(|| "pop on empty stack".to_string())
            })
        }
        #[allow(clippy::ptr_arg)]
        fn replay_stack(initial: &Vec<u8>, actions: &[Action<Vec<u8>>]) -> Result<(), PropertyError> {
            let mut state = initial.clone();
            for (step, action) in actions.iter().enumerate() {
                action.apply(&mut state, &mut (), step)?;
                if state.len() > 2 {
                    return Err(PropertyError::post_check_violation(Some(step), "too long"));
                }
            }
            Ok(())
        }

        let actions = vec![push(), push(), pop(), push(), pop(), push(), push()];
        let error = replay_stack(&Vec::new(), &actions).unwrap_err();
        assert!(matches!(error, PropertyError::PostCheckViolation { .. }));

        let shrunk = shrink_run(
            Shrinkable::new(Vec::new()),
            actions,
            error,
            &ShrinkConfig::default(),
            replay_stack,
        );
        assert_eq!(action_names(&shrunk.actions), vec!["push", "push", "push"]);
        assert!(matches!(shrunk.error, PropertyError::PostCheckViolation { .. }));
    }

    #[test]
    fn test_sequence_shrinks_to_single_decrement() {
        let actions = vec![inc(), dec(), inc(), dec(), dec(), dec(), inc(), inc()];
        let error = replay(&0, &actions).unwrap_err();
        assert_eq!(failing_step(&error), Some(4));

        let shrunk = shrink_run(
            Shrinkable::new(0),
            actions,
            error,
            &ShrinkConfig::default(),
            replay,
        );
        assert_eq!(action_names(&shrunk.actions), vec!["dec"]);
        assert_eq!(shrunk.initial_state, 0);
        assert_eq!(failing_step(&shrunk.error), Some(0));
        assert!(shrunk.completed);
    }

    #[test]
    fn test_state_shrinks_with_sequence_fixed() {
        // Starting at 3, four decrements are needed; the state then shrinks to 0
        // and the sequence is cut back at the new failure point.
        let actions = vec![dec(), dec(), dec(), dec()];
        let error = replay(&3, &actions).unwrap_err();
        let initial = integral(3, 0).map(|v| *v as i64);

        let shrunk = shrink_run(initial, actions, error, &ShrinkConfig::default(), replay);
        assert_eq!(shrunk.initial_state, 0);
        assert_eq!(action_names(&shrunk.actions), vec!["dec"]);
    }

    #[test]
    fn test_budget_exhaustion_is_partial() {
        let actions = vec![inc(), inc(), dec(), dec(), dec()];
        let error = replay(&0, &actions).unwrap_err();
        let config = ShrinkConfig {
            max_steps: 1,
            ..ShrinkConfig::default()
        };
        let shrunk = shrink_run(Shrinkable::new(0), actions, error, &config, replay);
        assert!(!shrunk.completed);
        assert!(replay(&shrunk.initial_state, &shrunk.actions).is_err());
    }
}
