use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use proptree::int;
use proptree_stateful::prelude::*;

fn increment() -> Action<i64> {
    Action::simple("increment", |n: &mut i64| *n += 1)
}

fn decrement() -> Action<i64> {
    Action::simple("decrement", |n: &mut i64| *n -= 1)
}

fn counter_factory() -> impl ActionGenFactory<i64> {
    action_gen_of(vec![
        Weighted::plain(just(increment())),
        Weighted::plain(just(decrement())),
    ])
    .unwrap()
}

#[test]
fn test_counter_shrinks_to_single_decrement() {
    let failure = run_stateful_property(
        &Gen::just(0i64),
        counter_factory(),
        |n: &i64, _: &()| *n >= 0,
        StatefulConfig {
            seed: Some(42),
            max_actions: 30,
            ..StatefulConfig::default()
        },
    )
    .unwrap_err();

    assert_eq!(failure.shrunk_action_names(), vec!["decrement"]);
    assert_eq!(failure.shrunk_initial_state, Some(0));
    assert_eq!(failure.failing_step_index, Some(0));
    assert!(failure.action_sequence.len() >= failure.shrunk_sequence.len());
    assert!(failure.detailed_report().contains("Shrunk actions: [\"decrement\"]"));
}

#[test]
fn test_same_seed_same_failure() {
    let run = || {
        StatefulProperty::new(&int::<i64>(0, 10), counter_factory())
            .invariant("below ten", |n| *n < 10)
            .max_actions(40)
            .seed(1234)
            .run()
            .unwrap_err()
    };
    let (first, second) = (run(), run());
    assert_eq!(first.runs_executed, second.runs_executed);
    assert_eq!(first.initial_state, second.initial_state);
    assert_eq!(
        action_names(&first.action_sequence),
        action_names(&second.action_sequence)
    );
    assert_eq!(first.shrunk_action_names(), second.shrunk_action_names());
    assert_eq!(first.error, second.error);
}

// Popping is only offered when the stack is non-empty.
#[allow(clippy::ptr_arg)]
fn guarded_stack_actions(stack: &Vec<i32>, _: &()) -> Gen<Action<Vec<i32>>> {
    let push = int::<i32>(-100, 100).map(|v| {
        let v = *v;
        Action::<Vec<i32>>::simple(format!("push {}", v), move |s: &mut Vec<i32>| s.push(v))
    });
    if stack.is_empty() {
        push
    } else {
        Gen::one_of(vec![
            Weighted::plain(push),
            Weighted::plain(just(Action::<Vec<i32>>::fallible("pop", |s, _| {
                s.pop().map(|_| ()).ok_or_else(|| "pop on empty stack".to_string())
            }))),
        ])
        .unwrap()
    }
}

#[test]
fn test_factory_guards_actions_by_state() {
    let success = StatefulProperty::new(&Gen::just(Vec::new()), guarded_stack_actions)
        .invariant("bounded", |s: &Vec<i32>| s.len() <= 50)
        .num_runs(40)
        .min_actions(0)
        .max_actions(50)
        .seed(77)
        .run()
        .unwrap();
    assert_eq!(success.runs_executed, 40);
}

#[test]
fn test_shrinking_keeps_the_original_failure() {
    // Dropping pushes in front of a pop makes the pop fail on an empty
    // stack; such candidates must not replace the length violation.
    let mut failures = 0;
    for seed in 0..40 {
        let result = StatefulProperty::new(&Gen::just(Vec::new()), guarded_stack_actions)
            .post_check(|s: &Vec<i32>, _: &()| s.len() <= 3)
            .max_actions(30)
            .seed(seed)
            .run();
        let Err(failure) = result else {
            continue;
        };
        failures += 1;

        assert!(
            matches!(failure.error, PropertyError::PostCheckViolation { .. }),
            "seed {}: {}",
            seed,
            failure.error
        );
        let names = failure.shrunk_action_names();
        assert_eq!(names.len(), 4, "seed {}: {:?}", seed, names);
        assert!(names.iter().all(|name| name.starts_with("push ")));
        assert_eq!(failure.failing_step_index, Some(3));
    }
    assert!(failures > 0);
}

#[test]
fn test_replays_start_from_fresh_state() {
    // Shrinking replays the sequence many times; a shared log shows every
    // replay begins with the initial state rather than a leftover one.
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let factory = move |_: &i64, _: &()| {
        let log = Rc::clone(&log);
        just(Action::<i64>::simple("double", move |n: &mut i64| {
            log.borrow_mut().push(*n);
            *n = *n * 2 + 1;
        }))
    };

    let failure = StatefulProperty::new(&Gen::just(0i64), factory)
        .invariant("small", |n| *n < 100)
        .min_actions(10)
        .max_actions(10)
        .seed(9)
        .run()
        .unwrap_err();

    // 0, 1, 3, 7, 15, 31, 63 -> 127 breaks the invariant at step 6.
    assert_eq!(failure.failing_step_index, Some(6));
    assert_eq!(failure.shrunk_sequence.len(), 7);
    let starts = seen.borrow().iter().filter(|n| **n == 0).count();
    assert!(starts > 1);
    assert!(seen.borrow().iter().all(|n| [0, 1, 3, 7, 15, 31, 63].contains(n)));
}

#[test]
fn test_shrink_budget_reports_partial_result() {
    let failure = StatefulProperty::new(&Gen::just(0i64), counter_factory())
        .post_check(|n: &i64, _: &()| *n > -3)
        .min_actions(60)
        .max_actions(60)
        .max_shrink_steps(1)
        .shrink_timeout(Duration::from_secs(5))
        .seed(8)
        .run()
        .unwrap_err();

    assert!(!failure.shrink_completed);
    assert!(failure.detailed_report().contains("not fully minimized"));
}

#[test]
fn test_post_check_errors_are_stateful_violations() {
    let failure = StatefulProperty::new(&Gen::just(0i64), counter_factory())
        .post_check(|n: &i64, _: &()| -> Result<(), PropertyError> {
            if *n > 2 {
                Err(PropertyError::assertion_failure(format!("counter at {}", n)))
            } else {
                Ok(())
            }
        })
        .max_actions(40)
        .seed(100)
        .run()
        .unwrap_err();

    assert_eq!(
        failure.shrunk_action_names(),
        vec!["increment", "increment", "increment"]
    );
    assert_eq!(
        failure.error,
        PropertyError::post_check_violation(
            Some(2),
            "after action 'increment': counter at 3"
        )
    );
}
