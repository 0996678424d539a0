//! Basic usage: generators, properties, configuration and failure reports

use proptree::{
    ErrorReporter, Gen, PropertyError, PropertyTestBuilder, TestConfig, Weighted, assume, check,
    int, printable_string, run_property, vec_of,
};

fn reverse_twice_is_identity() {
    println!("=== Reversing twice ===");
    let result = check(vec_of(&int::<i32>(-100, 100), 0, 20), |v: &Vec<i32>| {
        let mut twice = v.clone();
        twice.reverse();
        twice.reverse();
        twice == *v
    });
    match result {
        Ok(success) => println!("passed after {} runs (seed {})", success.runs_executed, success.seed),
        Err(failure) => println!("{}", failure.detailed_report()),
    }
}

fn threshold_shrinks_to_boundary() {
    println!("\n=== Shrinking to the boundary ===");
    let config = TestConfig::default().with_seed(42);
    if let Err(failure) = run_property(int::<i32>(0, 1000), |x: &i32| *x < 50, config) {
        println!("original: {:?}", failure.original_input);
        println!("shrunk:   {:?}", failure.shrunk_input);
    }
}

fn biased_strings() {
    println!("\n=== Biased string generation ===");
    let biased_char = Gen::one_of(vec![
        Weighted::weighted(Gen::just('x'), 0.2),
        Weighted::plain(proptree::printable_ascii_char()),
    ]);
    let Ok(chars) = biased_char else {
        println!("invalid weights");
        return;
    };
    let strings = proptree::string_of(&chars, 0, 20);
    let result = PropertyTestBuilder::new()
        .seed(17)
        .error_reporter(ErrorReporter::new().verbose())
        .run(strings, |s: &String| !s.contains('x'));
    if let Err(failure) = result {
        println!("minimal counterexample: {:?}", failure.shrunk_input);
    }
}

fn skipping_inputs() {
    println!("\n=== Skipping with assume ===");
    let result = check(printable_string(0, 10), |s: &String| -> Result<bool, PropertyError> {
        assume(!s.is_empty())?;
        Ok(s.chars().count() >= 1)
    });
    if let Ok(success) = result {
        println!("{} runs, {} skipped", success.runs_executed, success.skipped);
    }
}

fn main() {
    reverse_twice_is_identity();
    threshold_shrinks_to_boundary();
    biased_strings();
    skipping_inputs();
}
