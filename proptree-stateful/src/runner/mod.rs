//! Running stateful properties
//!
//! Each run draws an initial state, then repeatedly asks the action factory
//! for a generator, draws an action and applies it. After every action the
//! invariants and the post-check inspect the state (and model). The first
//! failure is shrunk with [`crate::operations::shrinking::shrink_run`].

mod result;

pub use result::{StatefulFailure, StatefulSuccess, StatefulTestResult};

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use std::time::{Duration, Instant};

use proptree::error::panic_message;
use proptree::{
    Gen, Generator, Outcome, PropertyError, PropertyOutput, RandomSource, ShrinkConfig, Shrinkable,
};
use tracing::{debug, info, trace, warn};

use crate::config::StatefulConfig;
use crate::invariants::InvariantSet;
use crate::operations::generator::ActionGenFactory;
use crate::operations::shrinking::{failing_step, shrink_run};
use crate::operations::Action;

type ModelFactory<S, M> = Rc<dyn Fn(&S) -> M>;
type PostCheck<S, M> = Box<dyn Fn(&S, &M) -> Outcome>;
type Hook = Box<dyn Fn()>;

/// A stateful property: initial state, actions and the checks run between them
pub struct StatefulProperty<S, M = ()> {
    initial_gen: Gen<S>,
    model_factory: ModelFactory<S, M>,
    action_factory: Box<dyn ActionGenFactory<S, M>>,
    post_check: Option<PostCheck<S, M>>,
    invariants: InvariantSet<S>,
    on_startup: Vec<Hook>,
    on_cleanup: Vec<Hook>,
    config: StatefulConfig,
}

impl<S, M> fmt::Debug for StatefulProperty<S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatefulProperty")
            .field("invariants", &self.invariants.len())
            .field("has_post_check", &self.post_check.is_some())
            .field("config", &self.config)
            .finish()
    }
}

enum Trial<S, M> {
    Passed {
        actions: usize,
    },
    Failed {
        initial: Shrinkable<S>,
        actions: Vec<Action<S, M>>,
        error: PropertyError,
    },
}

// Runs the cleanup hooks when a trial ends, even by unwinding.
struct CleanupGuard<'a>(&'a [Hook]);

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        for hook in self.0 {
            hook();
        }
    }
}

impl<S: Clone + 'static> StatefulProperty<S, ()> {
    /// A property without a model
    pub fn new<A>(initial_gen: &Gen<S>, action_factory: A) -> Self
    where
        A: ActionGenFactory<S> + 'static,
    {
        Self::with_model(initial_gen, |_: &S| (), action_factory)
    }
}

impl<S: Clone + 'static, M: 'static> StatefulProperty<S, M> {
    /// A property whose model is built from each initial state
    pub fn with_model<F, A>(initial_gen: &Gen<S>, model_factory: F, action_factory: A) -> Self
    where
        F: Fn(&S) -> M + 'static,
        A: ActionGenFactory<S, M> + 'static,
    {
        Self {
            initial_gen: initial_gen.clone(),
            model_factory: Rc::new(model_factory),
            action_factory: Box::new(action_factory),
            post_check: None,
            invariants: InvariantSet::new(),
            on_startup: Vec::new(),
            on_cleanup: Vec::new(),
            config: StatefulConfig::default(),
        }
    }

    pub fn config(mut self, config: StatefulConfig) -> Self {
        self.config = config;
        self
    }

    pub fn num_runs(mut self, runs: usize) -> Self {
        self.config.num_runs = runs;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn min_actions(mut self, min: usize) -> Self {
        self.config.min_actions = min;
        self
    }

    pub fn max_actions(mut self, max: usize) -> Self {
        self.config.max_actions = max;
        self
    }

    pub fn max_shrink_steps(mut self, steps: usize) -> Self {
        self.config.max_shrink_steps = steps;
        self
    }

    pub fn shrink_timeout(mut self, timeout: Duration) -> Self {
        self.config.shrink_timeout = timeout;
        self
    }

    /// Check run after every action against the state and model.
    ///
    /// Accepts the same return types as ordinary properties; a skip counts
    /// as a pass.
    pub fn post_check<F, O>(mut self, check: F) -> Self
    where
        F: Fn(&S, &M) -> O + 'static,
        O: PropertyOutput,
    {
        self.post_check = Some(Box::new(move |state: &S, model: &M| check(state, model).into_outcome()));
        self
    }

    /// Named predicate on the state, checked after every action
    pub fn invariant<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&S) -> bool + 'static,
    {
        self.invariants.add_fn(name, check);
        self
    }

    /// Hook run before every trial
    pub fn on_startup<F: Fn() + 'static>(mut self, hook: F) -> Self {
        self.on_startup.push(Box::new(hook));
        self
    }

    /// Hook run after every trial, including failing ones
    pub fn on_cleanup<F: Fn() + 'static>(mut self, hook: F) -> Self {
        self.on_cleanup.push(Box::new(hook));
        self
    }

    pub fn run(&self) -> StatefulTestResult<S, M> {
        let test_start = Instant::now();
        let (mut root, seed) = match self.config.seed {
            Some(seed) => (RandomSource::from_seed(seed), seed),
            None => RandomSource::from_entropy(),
        };

        if let Err(error) = self.config.validate() {
            warn!(%error, "stateful run rejected during setup");
            let mut failure = StatefulFailure::before_actions(error, seed, 0);
            failure.test_duration = test_start.elapsed();
            return Err(failure);
        }

        debug!(
            seed,
            num_runs = self.config.num_runs,
            min_actions = self.config.min_actions,
            max_actions = self.config.max_actions,
            "starting stateful run"
        );

        let mut actions_executed = 0;
        for run in 1..=self.config.num_runs {
            let mut trial_rng = root.fork();
            let trial = {
                for hook in &self.on_startup {
                    hook();
                }
                let _cleanup = CleanupGuard(&self.on_cleanup);
                self.trial(&mut trial_rng)
            };

            match trial {
                Ok(Trial::Passed { actions }) => {
                    trace!(run, actions, "trial passed");
                    actions_executed += actions;
                }
                Ok(Trial::Failed {
                    initial,
                    actions,
                    error,
                }) => {
                    info!(run, actions = actions.len(), %error, "stateful property failed, shrinking");
                    let mut failure = self.shrink_failure(initial, actions, error, seed, run);
                    failure.test_duration = test_start.elapsed();
                    return Err(failure);
                }
                Err(error) => {
                    warn!(run, %error, "could not generate a stateful trial");
                    let mut failure = StatefulFailure::before_actions(error, seed, run);
                    failure.test_duration = test_start.elapsed();
                    return Err(failure);
                }
            }
        }

        let duration = test_start.elapsed();
        debug!(runs = self.config.num_runs, actions_executed, ?duration, "stateful run passed");
        Ok(StatefulSuccess {
            runs_executed: self.config.num_runs,
            actions_executed,
            seed,
            duration,
        })
    }

    // Generation errors propagate as `Err`; property failures are `Trial::Failed`.
    fn trial(&self, rng: &mut RandomSource) -> Result<Trial<S, M>, PropertyError> {
        let generator_config = &self.config.generator_config;
        let initial = self.initial_gen.generate(&mut rng.fork(), generator_config)?;

        let mut action_rng = rng.fork();
        let count = action_rng.next_u64_in(
            self.config.min_actions as u64,
            self.config.max_actions as u64,
        ) as usize;

        let mut state = initial.value().clone();
        let mut model = (self.model_factory)(&state);
        let mut actions = Vec::with_capacity(count);
        for index in 0..count {
            let action = self
                .action_factory
                .action_gen(&state, &model)
                .generate(&mut action_rng, generator_config)?
                .into_value();
            let outcome = self.step(&mut state, &mut model, &action, index);
            actions.push(action);
            if let Err(error) = outcome {
                return Ok(Trial::Failed {
                    initial,
                    actions,
                    error,
                });
            }
        }
        Ok(Trial::Passed { actions: count })
    }

    fn step(
        &self,
        state: &mut S,
        model: &mut M,
        action: &Action<S, M>,
        index: usize,
    ) -> Result<(), PropertyError> {
        trace!(step = index, action = action.name(), "applying action");
        action.apply(state, model, index)?;
        self.invariants
            .check_all(state)
            .map_err(|violation| violation.into_error(index, action.name()))?;

        let Some(check) = &self.post_check else {
            return Ok(());
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| check(&*state, &*model)))
            .unwrap_or_else(|payload| {
                Outcome::Fail(PropertyError::assertion_failure(panic_message(payload.as_ref())))
            });
        match outcome {
            Outcome::Pass | Outcome::Skip(_) => Ok(()),
            Outcome::Fail(error @ PropertyError::PostCheckViolation { .. }) => {
                Err(error.at_step(index))
            }
            Outcome::Fail(PropertyError::AssertionFailure { message, .. }) => {
                Err(PropertyError::post_check_violation(
                    Some(index),
                    format!("after action '{}': {}", action.name(), message),
                ))
            }
            Outcome::Fail(other) => Err(PropertyError::post_check_violation(
                Some(index),
                format!("after action '{}': {}", action.name(), other),
            )),
        }
    }

    /// Apply `actions` to a fresh copy of `initial` and a fresh model
    fn replay(&self, initial: &S, actions: &[Action<S, M>]) -> Result<(), PropertyError> {
        let mut state = initial.clone();
        let mut model = (self.model_factory)(&state);
        for (index, action) in actions.iter().enumerate() {
            self.step(&mut state, &mut model, action, index)?;
        }
        Ok(())
    }

    fn shrink_failure(
        &self,
        initial: Shrinkable<S>,
        actions: Vec<Action<S, M>>,
        error: PropertyError,
        seed: u64,
        runs_executed: usize,
    ) -> StatefulFailure<S, M> {
        let initial_state = initial.value().clone();
        let shrink_config = ShrinkConfig {
            max_steps: self.config.max_shrink_steps,
            timeout: self.config.shrink_timeout,
        };
        let shrunk = shrink_run(initial, actions.clone(), error, &shrink_config, |state, candidate| {
            self.replay(state, candidate)
        });

        debug!(
            actions = shrunk.actions.len(),
            steps = shrunk.shrink_steps,
            completed = shrunk.completed,
            "stateful failure shrunk"
        );
        StatefulFailure {
            initial_state: Some(initial_state),
            action_sequence: actions,
            shrunk_initial_state: Some(shrunk.initial_state),
            shrunk_sequence: shrunk.actions,
            failing_step_index: failing_step(&shrunk.error),
            error: shrunk.error,
            seed,
            runs_executed,
            shrink_steps: shrunk.shrink_steps,
            shrink_completed: shrunk.completed,
            test_duration: Duration::ZERO,
        }
    }
}

/// Run a model-less stateful property checked by `post_check` after every action
pub fn run_stateful_property<S, A, P, O>(
    initial_gen: &Gen<S>,
    action_factory: A,
    post_check: P,
    config: StatefulConfig,
) -> StatefulTestResult<S>
where
    S: Clone + 'static,
    A: ActionGenFactory<S> + 'static,
    P: Fn(&S, &()) -> O + 'static,
    O: PropertyOutput,
{
    StatefulProperty::new(initial_gen, action_factory)
        .post_check(post_check)
        .config(config)
        .run()
}

/// Run a stateful property whose `post_check` compares the state with a model
pub fn run_model_property<S, M, F, A, P, O>(
    initial_gen: &Gen<S>,
    model_factory: F,
    action_factory: A,
    post_check: P,
    config: StatefulConfig,
) -> StatefulTestResult<S, M>
where
    S: Clone + 'static,
    M: 'static,
    F: Fn(&S) -> M + 'static,
    A: ActionGenFactory<S, M> + 'static,
    P: Fn(&S, &M) -> O + 'static,
    O: PropertyOutput,
{
    StatefulProperty::with_model(initial_gen, model_factory, action_factory)
        .post_check(post_check)
        .config(config)
        .run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::action_names;
    use crate::operations::generator::action_gen_of;
    use proptree::{Weighted, int, just};
    use std::cell::Cell;

    fn counter_actions() -> impl ActionGenFactory<i64> {
        action_gen_of(vec![
            Weighted::plain(just(Action::<i64>::simple("inc", |s: &mut i64| *s += 1))),
            Weighted::plain(just(Action::<i64>::simple("dec", |s: &mut i64| *s -= 1))),
        ])
        .unwrap()
    }

    #[test]
    fn test_counter_shrinks_to_single_decrement() {
        let failure = StatefulProperty::new(&Gen::just(0i64), counter_actions())
            .post_check(|state: &i64, _: &()| *state >= 0)
            .seed(3)
            .min_actions(1)
            .max_actions(20)
            .run()
            .unwrap_err();

        assert_eq!(failure.shrunk_action_names(), vec!["dec"]);
        assert_eq!(failure.shrunk_initial_state, Some(0));
        assert_eq!(failure.failing_step_index, Some(0));
        assert!(failure.shrink_completed);
        assert!(matches!(failure.error, PropertyError::PostCheckViolation { .. }));
        assert_eq!(failure.seed, 3);
        assert!(failure.to_string().contains("dec"));
    }

    #[test]
    fn test_passing_property_counts_runs() {
        let success = StatefulProperty::new(&Gen::just(0i64), counter_actions())
            .post_check(|state: &i64, _: &()| state.abs() <= 10)
            .num_runs(25)
            .min_actions(0)
            .max_actions(10)
            .seed(11)
            .run()
            .unwrap();
        assert_eq!(success.runs_executed, 25);
        assert!(success.actions_executed <= 250);
        assert_eq!(success.seed, 11);
    }

    #[test]
    fn test_zero_actions_never_fail() {
        let success = StatefulProperty::new(&Gen::just(0i64), counter_actions())
            .invariant("unreachable", |_| false)
            .min_actions(0)
            .max_actions(0)
            .num_runs(10)
            .run()
            .unwrap();
        assert_eq!(success.actions_executed, 0);
    }

    #[test]
    fn test_invalid_config_rejected_before_running() {
        let started = Rc::new(Cell::new(0));
        let counter = Rc::clone(&started);
        let failure = StatefulProperty::new(&Gen::just(0i64), counter_actions())
            .on_startup(move || counter.set(counter.get() + 1))
            .min_actions(5)
            .max_actions(1)
            .run()
            .unwrap_err();
        assert!(matches!(failure.error, PropertyError::ConfigurationError { .. }));
        assert_eq!(failure.runs_executed, 0);
        assert_eq!(started.get(), 0);
    }

    #[test]
    fn test_hooks_run_per_trial_and_on_failure() {
        let started = Rc::new(Cell::new(0));
        let cleaned = Rc::new(Cell::new(0));
        let (s, c) = (Rc::clone(&started), Rc::clone(&cleaned));

        let failure = StatefulProperty::new(&Gen::just(0i64), counter_actions())
            .invariant("non-negative", |state| *state >= 0)
            .on_startup(move || s.set(s.get() + 1))
            .on_cleanup(move || c.set(c.get() + 1))
            .num_runs(50)
            .max_actions(30)
            .seed(5)
            .run()
            .unwrap_err();

        assert_eq!(started.get(), failure.runs_executed);
        assert_eq!(cleaned.get(), failure.runs_executed);
        assert!(failure.error.to_string().contains("non-negative"));
    }

    #[test]
    fn test_initial_state_shrinks() {
        // Any state above 5 fails on its first action.
        let failure = StatefulProperty::new(&int::<i64>(0, 1000), counter_actions())
            .invariant("small", |state| *state <= 5)
            .min_actions(1)
            .max_actions(5)
            .seed(21)
            .run()
            .unwrap_err();

        let shrunk = failure.shrunk_initial_state.unwrap();
        assert!(shrunk <= 7, "shrunk to {}", shrunk);
        assert!(shrunk <= failure.initial_state.unwrap());
        assert!(failure.shrunk_sequence.len() <= failure.action_sequence.len());
    }

    #[test]
    fn test_model_divergence_reported() {
        // The model forgets to count resets, so they diverge after one.
        let actions = |_: &Vec<u8>, _: &usize| {
            Gen::one_of(vec![
                Weighted::weighted(
                    just(Action::new("push", |s: &mut Vec<u8>, m: &mut usize| {
                        s.push(1);
                        *m += 1;
                    })),
                    0.8,
                ),
                Weighted::plain(just(Action::simple("clear", |s: &mut Vec<u8>| s.clear()))),
            ])
            .unwrap()
        };
        let failure = run_model_property(
            &Gen::just(Vec::new()),
            |state: &Vec<u8>| state.len(),
            actions,
            |state: &Vec<u8>, model: &usize| state.len() == *model,
            StatefulConfig {
                seed: Some(8),
                max_actions: 40,
                ..StatefulConfig::default()
            },
        )
        .unwrap_err();

        let names = action_names(&failure.shrunk_sequence);
        assert_eq!(names, vec!["push", "clear"]);
        assert!(failure.error.to_string().contains("after action 'clear'"));
    }

    #[test]
    fn test_action_errors_fail_the_run() {
        let pop = Action::<Vec<u8>>::fallible("pop", |state, _| {
            state.pop().map(|_| ()).ok_or_else(|| "empty".to_string())
        });
        let failure = run_stateful_property(
            &Gen::just(Vec::new()),
            move |_: &Vec<u8>, _: &()| just(pop.clone()),
            |_: &Vec<u8>, _: &()| true,
            StatefulConfig {
                seed: Some(1),
                ..StatefulConfig::default()
            },
        )
        .unwrap_err();
        assert_eq!(failure.error, PropertyError::action_failed("pop", 0, "empty"));
        assert_eq!(failure.shrunk_action_names(), vec!["pop"]);
    }

    #[test]
    fn test_panicking_invariant_is_reported_not_propagated() {
        let failure = StatefulProperty::new(&Gen::just(0i64), |_: &i64, _: &()| {
            just(Action::<i64>::simple("inc", |n: &mut i64| *n += 1))
        })
        .invariant("boom", |n| {
            if *n > 2 {
                panic!("invariant exploded");
            }
            true
        })
        .min_actions(5)
        .max_actions(5)
        .seed(4)
        .run()
        .unwrap_err();

        assert_eq!(failure.runs_executed, 1);
        assert_eq!(failure.shrunk_action_names(), vec!["inc", "inc", "inc"]);
        assert_eq!(
            failure.error,
            PropertyError::post_check_violation(
                Some(2),
                "invariant 'boom' panicked after action 'inc': invariant exploded"
            )
        );
    }
}
