//! Example: a counter that must never go negative

use proptree_stateful::prelude::*;

fn main() {
    let actions = match action_gen_of(vec![
        Weighted::plain(just(Action::<i64>::simple("increment", |n: &mut i64| *n += 1))),
        Weighted::plain(just(Action::<i64>::simple("decrement", |n: &mut i64| *n -= 1))),
    ]) {
        Ok(actions) => actions,
        Err(error) => {
            eprintln!("{}", error);
            return;
        }
    };

    let result = StatefulProperty::new(&Gen::just(0i64), actions)
        .post_check(|n: &i64, _: &()| *n >= 0)
        .on_startup(|| println!("-- run starting"))
        .num_runs(20)
        .max_actions(15)
        .seed(7)
        .run();

    match result {
        Ok(success) => println!(
            "passed: {} runs, {} actions",
            success.runs_executed, success.actions_executed
        ),
        Err(failure) => println!("{}", failure.detailed_report()),
    }
}
