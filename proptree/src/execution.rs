//! Property test execution: matrix cases, explicit examples, random trials
//! and shrinking of the first failure.

use std::fmt;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::config::TestConfig;
use crate::error::{
    ErrorReporter, PropertyError, PropertyResult, TestFailure, TestPhase, TestSuccess,
    panic_message,
};
use crate::generator::Generator;
use crate::property::{Outcome, Property};
use crate::rng::RandomSource;
use crate::shrink::{ShrinkConfig, ShrinkEngine};

/// An exhaustive list of inputs over named axes
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    axes: Vec<String>,
    cases: Vec<T>,
}

impl<T> Matrix<T> {
    pub fn new<S: Into<String>>(axes: impl IntoIterator<Item = S>, cases: Vec<T>) -> Self {
        Self {
            axes: axes.into_iter().map(Into::into).collect(),
            cases,
        }
    }

    pub fn axes(&self) -> &[String] {
        &self.axes
    }

    pub fn cases(&self) -> &[T] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Cartesian product of two named axes, first axis outermost
pub fn matrix2<A: Clone, B: Clone>(a: (&str, Vec<A>), b: (&str, Vec<B>)) -> Matrix<(A, B)> {
    let (a_name, a_values) = a;
    let (b_name, b_values) = b;
    let cases = a_values
        .iter()
        .flat_map(|x| b_values.iter().map(move |y| (x.clone(), y.clone())))
        .collect();
    Matrix::new([a_name, b_name], cases)
}

/// Cartesian product of three named axes, first axis outermost
pub fn matrix3<A: Clone, B: Clone, C: Clone>(
    a: (&str, Vec<A>),
    b: (&str, Vec<B>),
    c: (&str, Vec<C>),
) -> Matrix<(A, B, C)> {
    let (a_name, a_values) = a;
    let (b_name, b_values) = b;
    let (c_name, c_values) = c;
    let mut cases = Vec::with_capacity(a_values.len() * b_values.len() * c_values.len());
    for x in &a_values {
        for y in &b_values {
            for z in &c_values {
                cases.push((x.clone(), y.clone(), z.clone()));
            }
        }
    }
    Matrix::new([a_name, b_name, c_name], cases)
}

/// Core property test execution struct
pub struct PropertyTest<T, G, P> {
    generator: G,
    property: P,
    config: TestConfig,
    matrix: Option<Matrix<T>>,
    examples: Vec<T>,
    parameters: Vec<String>,
    error_reporter: Option<ErrorReporter>,
}

/// Counters for one run
#[derive(Default)]
struct RunCounts {
    executed: usize,
    skipped: usize,
}

impl<T, G, P> PropertyTest<T, G, P>
where
    T: Clone + fmt::Debug + 'static,
    G: Generator<T>,
    P: Property<T>,
{
    /// Create a new property test with the given generator, property, and configuration
    pub fn new(generator: G, property: P, config: TestConfig) -> Self {
        Self {
            generator,
            property,
            config,
            matrix: None,
            examples: Vec::new(),
            parameters: Vec::new(),
            error_reporter: None,
        }
    }

    /// Execute the property test.
    ///
    /// Stops at the first failing case. A generation error also stops the
    /// run; it is reported without shrinking.
    pub fn run(self) -> PropertyResult<T> {
        let test_start = Instant::now();
        let (mut root, seed) = match self.config.seed {
            Some(seed) => (RandomSource::from_seed(seed), seed),
            None => RandomSource::from_entropy(),
        };

        if let Err(error) = self.setup() {
            warn!(%error, "property run rejected during setup");
            let mut failure = TestFailure::new(error, TestPhase::Setup, None, seed, 0);
            failure.test_duration = test_start.elapsed();
            return Err(failure);
        }

        debug!(
            seed,
            num_runs = self.config.num_runs,
            matrix_cases = self.matrix.as_ref().map_or(0, Matrix::len),
            examples = self.examples.len(),
            "starting property run"
        );

        let mut counts = RunCounts::default();
        let fixed_cases = self
            .matrix
            .iter()
            .flat_map(|m| m.cases().iter().map(|case| (TestPhase::Matrix, case)))
            .chain(self.examples.iter().map(|case| (TestPhase::Example, case)));

        for (phase, case) in fixed_cases {
            counts.executed += 1;
            match self.evaluate(case) {
                Outcome::Pass => {}
                Outcome::Skip(_) => counts.skipped += 1,
                Outcome::Fail(error) => {
                    info!(%phase, runs = counts.executed, "property failed on a fixed case");
                    let mut failure =
                        TestFailure::new(error, phase, Some(case.clone()), seed, counts.executed);
                    failure.test_duration = test_start.elapsed();
                    return Err(self.reported(failure));
                }
            }
        }

        for trial in 0..self.config.num_runs {
            counts.executed += 1;
            let mut trial_rng = root.fork();
            let input = match self
                .generator
                .generate(&mut trial_rng, &self.config.generator_config)
            {
                Ok(input) => input,
                Err(error) => {
                    if matches!(error, PropertyError::GenerationExhausted { .. }) {
                        warn!(trial, %error, "generation exhausted");
                    }
                    let mut failure =
                        TestFailure::new(error, TestPhase::Random, None, seed, counts.executed);
                    failure.test_duration = test_start.elapsed();
                    return Err(self.reported(failure));
                }
            };
            trace!(trial, input = ?input.value(), "running trial");

            match self.evaluate(input.value()) {
                Outcome::Pass => {}
                Outcome::Skip(message) => {
                    trace!(trial, %message, "trial skipped");
                    counts.skipped += 1;
                }
                Outcome::Fail(error) => {
                    info!(trial, seed, %error, "property failed, shrinking");
                    let original = input.value().clone();
                    let engine = ShrinkEngine::with_config(ShrinkConfig {
                        max_steps: self.config.max_shrink_steps,
                        timeout: self.config.shrink_timeout,
                    });
                    let result = engine.shrink(input, error, |candidate| match self.evaluate(candidate) {
                        Outcome::Fail(error) => Err(error),
                        Outcome::Pass | Outcome::Skip(_) => Ok(()),
                    });

                    let mut failure = TestFailure::new(
                        result.error,
                        TestPhase::Random,
                        Some(original),
                        seed,
                        counts.executed,
                    );
                    failure.shrunk_input = Some(result.minimal);
                    failure.shrink_steps = result.shrink_steps;
                    failure.shrink_completed = result.completed;
                    failure.shrink_duration = result.shrink_duration;
                    failure.test_duration = test_start.elapsed();
                    return Err(self.reported(failure));
                }
            }
        }

        debug!(
            runs = counts.executed,
            skipped = counts.skipped,
            "property run passed"
        );
        Ok(TestSuccess::new(
            counts.executed,
            counts.skipped,
            seed,
            test_start.elapsed(),
        ))
    }

    fn setup(&self) -> Result<(), PropertyError> {
        self.config.validate()?;
        if self.parameters.is_empty() {
            return Ok(());
        }
        let axes = self.matrix.as_ref().map_or(&[][..], Matrix::axes);
        for parameter in &self.parameters {
            if !axes.contains(parameter) {
                return Err(PropertyError::configuration_error(
                    format!("parameter '{}' is not covered by the matrix", parameter),
                    Some(parameter.as_str()),
                ));
            }
        }
        Ok(())
    }

    fn evaluate(&self, input: &T) -> Outcome {
        match catch_unwind(AssertUnwindSafe(|| self.property.test(input))) {
            Ok(outcome) => outcome,
            Err(payload) => Outcome::Fail(PropertyError::assertion_failure_with_context(
                panic_message(payload.as_ref()),
                "property panicked",
            )),
        }
    }

    fn reported(&self, failure: TestFailure<T>) -> TestFailure<T> {
        if let Some(reporter) = &self.error_reporter {
            eprintln!("{}", reporter.format_for_test_output(&failure));
        }
        failure
    }
}

/// Run a property with the default configuration
pub fn check<T, G, P>(generator: G, property: P) -> PropertyResult<T>
where
    T: Clone + fmt::Debug + 'static,
    G: Generator<T>,
    P: Property<T>,
{
    run_property(generator, property, TestConfig::default())
}

/// Run a property with a custom configuration
pub fn run_property<T, G, P>(generator: G, property: P, config: TestConfig) -> PropertyResult<T>
where
    T: Clone + fmt::Debug + 'static,
    G: Generator<T>,
    P: Property<T>,
{
    PropertyTest::new(generator, property, config).run()
}

/// Builder pattern for configuring property tests
pub struct PropertyTestBuilder<T> {
    config: TestConfig,
    matrix: Option<Matrix<T>>,
    examples: Vec<T>,
    parameters: Vec<String>,
    error_reporter: Option<ErrorReporter>,
    _phantom: PhantomData<T>,
}

impl<T: Clone + fmt::Debug + 'static> PropertyTestBuilder<T> {
    pub fn new() -> Self {
        Self {
            config: TestConfig::default(),
            matrix: None,
            examples: Vec::new(),
            parameters: Vec::new(),
            error_reporter: None,
            _phantom: PhantomData,
        }
    }

    /// Set the number of random trials
    pub fn num_runs(mut self, num_runs: usize) -> Self {
        self.config.num_runs = num_runs;
        self
    }

    /// Set the random seed for reproducible tests
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set the maximum number of shrink candidates evaluated
    pub fn max_shrink_steps(mut self, max_steps: usize) -> Self {
        self.config.max_shrink_steps = max_steps;
        self
    }

    pub fn shrink_timeout(mut self, timeout: Duration) -> Self {
        self.config.shrink_timeout = timeout;
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: TestConfig) -> Self {
        self.config = config;
        self
    }

    /// Run `value` before the random trials
    pub fn example(mut self, value: T) -> Self {
        self.examples.push(value);
        self
    }

    /// Run every case of `matrix` before examples and random trials
    pub fn matrix(mut self, matrix: Matrix<T>) -> Self {
        self.matrix = Some(matrix);
        self
    }

    /// Declare parameter names that the matrix must cover
    pub fn parameters(mut self, names: &[&str]) -> Self {
        self.parameters = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Print failures to stderr with the given reporter
    pub fn error_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.error_reporter = Some(reporter);
        self
    }

    /// Run the property test with the configured parameters
    pub fn run<G, P>(self, generator: G, property: P) -> PropertyResult<T>
    where
        G: Generator<T>,
        P: Property<T>,
    {
        let mut test = PropertyTest::new(generator, property, self.config);
        test.matrix = self.matrix;
        test.examples = self.examples;
        test.parameters = self.parameters;
        test.error_reporter = self.error_reporter;
        test.run()
    }
}

impl<T: Clone + fmt::Debug + 'static> Default for PropertyTestBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
