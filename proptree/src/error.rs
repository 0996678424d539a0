//! Error types and result handling for property runs.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use crate::config::ConfigError;

/// Everything that can go wrong while running a property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyError {
    /// The predicate returned false, returned an error, or panicked
    AssertionFailure {
        message: String,
        context: Option<String>,
    },

    /// A filtered or recursive generator could not produce a value
    GenerationExhausted {
        attempts: usize,
        context: Option<String>,
    },

    /// The run was misconfigured; detected before any trial executes
    ConfigurationError {
        message: String,
        field: Option<String>,
    },

    /// A stateful action failed while being applied
    ActionApplicationError {
        action: String,
        step: usize,
        message: String,
    },

    /// A post-check or invariant rejected the state after an action
    PostCheckViolation {
        step: Option<usize>,
        message: String,
    },

    /// An `assume` precondition rejected the input; the trial is skipped
    PreconditionFailed { message: String },
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyError::AssertionFailure { message, context } => {
                write!(f, "Assertion failed: {}", message)?;
                if let Some(ctx) = context {
                    write!(f, " (context: {})", ctx)?;
                }
                Ok(())
            }
            PropertyError::GenerationExhausted { attempts, context } => {
                write!(f, "Generation exhausted after {} attempts", attempts)?;
                if let Some(ctx) = context {
                    write!(f, " (context: {})", ctx)?;
                }
                Ok(())
            }
            PropertyError::ConfigurationError { message, field } => {
                write!(f, "Configuration error: {}", message)?;
                if let Some(field_name) = field {
                    write!(f, " (field: {})", field_name)?;
                }
                Ok(())
            }
            PropertyError::ActionApplicationError {
                action,
                step,
                message,
            } => {
                write!(f, "Action '{}' failed at step {}: {}", action, step, message)
            }
            PropertyError::PostCheckViolation { step, message } => {
                write!(f, "Post-check violated")?;
                if let Some(step) = step {
                    write!(f, " after step {}", step)?;
                }
                write!(f, ": {}", message)
            }
            PropertyError::PreconditionFailed { message } => {
                write!(f, "Precondition not met: {}", message)
            }
        }
    }
}

impl std::error::Error for PropertyError {}

impl From<ConfigError> for PropertyError {
    fn from(error: ConfigError) -> Self {
        Self::ConfigurationError {
            message: error.to_string(),
            field: Some(error.field().to_string()),
        }
    }
}

/// Helper functions for creating PropertyError instances with context
impl PropertyError {
    /// Create a simple assertion failure
    pub fn assertion_failure(message: impl Into<String>) -> Self {
        Self::AssertionFailure {
            message: message.into(),
            context: None,
        }
    }

    /// Create an assertion failure with context
    pub fn assertion_failure_with_context(
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::AssertionFailure {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a generation-exhausted error
    pub fn generation_exhausted(attempts: usize, context: Option<impl Into<String>>) -> Self {
        Self::GenerationExhausted {
            attempts,
            context: context.map(|c| c.into()),
        }
    }

    /// Create a configuration error with field information
    pub fn configuration_error(
        message: impl Into<String>,
        field: Option<impl Into<String>>,
    ) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            field: field.map(|f| f.into()),
        }
    }

    /// Create an action application error
    pub fn action_failed(action: impl Into<String>, step: usize, message: impl Into<String>) -> Self {
        Self::ActionApplicationError {
            action: action.into(),
            step,
            message: message.into(),
        }
    }

    /// Create a post-check violation
    pub fn post_check_violation(step: Option<usize>, message: impl Into<String>) -> Self {
        Self::PostCheckViolation {
            step,
            message: message.into(),
        }
    }

    /// Create a precondition failure (skipped trial)
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            message: message.into(),
        }
    }

    /// Whether this error marks a skipped trial rather than a failure
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }

    /// Attach the failing step index to stateful errors that lack one
    pub fn at_step(self, index: usize) -> Self {
        match self {
            Self::PostCheckViolation { step: None, message } => Self::PostCheckViolation {
                step: Some(index),
                message,
            },
            other => other,
        }
    }
}

/// Turn a caught panic payload into a message
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Result of a property run
pub type PropertyResult<T> = Result<TestSuccess<T>, TestFailure<T>>;

/// Phase of a run in which a case was executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPhase {
    Setup,
    Matrix,
    Example,
    Random,
}

impl fmt::Display for TestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestPhase::Setup => "setup",
            TestPhase::Matrix => "matrix",
            TestPhase::Example => "example",
            TestPhase::Random => "random",
        };
        f.write_str(name)
    }
}

/// Information about a successful run
#[derive(Debug, Clone)]
pub struct TestSuccess<T> {
    /// Number of cases executed across all phases (skips included)
    pub runs_executed: usize,
    /// Number of cases rejected by a precondition
    pub skipped: usize,
    /// Seed of the root random source
    pub seed: u64,
    /// Wall-clock duration of the run
    pub duration: Duration,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> TestSuccess<T> {
    pub fn new(runs_executed: usize, skipped: usize, seed: u64, duration: Duration) -> Self {
        Self {
            runs_executed,
            skipped,
            seed,
            duration,
            _phantom: PhantomData,
        }
    }
}

/// Information about a failed run.
///
/// A generation error such as `GenerationExhausted` ends the run at the
/// trial that hit it: `original_input` and `shrunk_input` are `None`, no
/// shrinking happens, and later trials are not attempted.
#[derive(Debug, Clone)]
pub struct TestFailure<T> {
    /// The error reported for the minimal failing input
    pub error: PropertyError,
    /// Phase in which the failure was found
    pub phase: TestPhase,
    /// Original failing input; absent when generation itself failed
    pub original_input: Option<T>,
    /// Minimal failing input, when a shrink search ran
    pub shrunk_input: Option<T>,
    /// Number of accepted shrink steps
    pub shrink_steps: usize,
    /// False when the shrink budget ran out before the search converged
    pub shrink_completed: bool,
    /// Seed of the root random source
    pub seed: u64,
    /// Number of cases executed, the failing one included
    pub runs_executed: usize,
    /// Total time spent on the run
    pub test_duration: Duration,
    /// Time spent on shrinking
    pub shrink_duration: Duration,
}

impl<T> TestFailure<T> {
    /// A failure with no shrinking attached
    pub fn new(
        error: PropertyError,
        phase: TestPhase,
        original_input: Option<T>,
        seed: u64,
        runs_executed: usize,
    ) -> Self {
        Self {
            error,
            phase,
            original_input,
            shrunk_input: None,
            shrink_steps: 0,
            shrink_completed: true,
            seed,
            runs_executed,
            test_duration: Duration::ZERO,
            shrink_duration: Duration::ZERO,
        }
    }

    /// The most reduced failing input known
    pub fn minimal_input(&self) -> Option<&T> {
        self.shrunk_input.as_ref().or(self.original_input.as_ref())
    }

    /// Get a detailed report of the failure
    pub fn detailed_report(&self) -> String
    where
        T: fmt::Debug,
    {
        let mut report = String::new();

        report.push_str(&format!(
            "Property failed in {} phase after {} runs (seed: {})\n",
            self.phase, self.runs_executed, self.seed
        ));
        report.push_str(&format!("Error: {}\n", self.error));
        match &self.original_input {
            Some(input) => report.push_str(&format!("Original input: {:?}\n", input)),
            None => report.push_str("Original input: <not generated>\n"),
        }

        if let Some(ref shrunk) = self.shrunk_input {
            report.push_str(&format!("Shrunk input: {:?}\n", shrunk));
            report.push_str(&format!("Shrinking steps: {}\n", self.shrink_steps));
            if !self.shrink_completed {
                report.push_str("Shrinking stopped early: result is not fully minimized\n");
            }
            report.push_str(&format!("Shrinking time: {:?}\n", self.shrink_duration));
        } else {
            report.push_str("No shrinking performed\n");
        }

        report.push_str(&format!("Total test time: {:?}\n", self.test_duration));
        report
    }

    /// Get a concise summary of the failure
    pub fn summary(&self) -> String
    where
        T: fmt::Debug,
    {
        match (&self.shrunk_input, &self.original_input) {
            (Some(shrunk), Some(original)) => format!(
                "Property failed with input {:?} (shrunk from {:?}) after {} runs, seed {}",
                shrunk, original, self.runs_executed, self.seed
            ),
            (_, Some(original)) => format!(
                "Property failed with input {:?} after {} runs, seed {}",
                original, self.runs_executed, self.seed
            ),
            (_, None) => format!(
                "Property failed after {} runs, seed {}: {}",
                self.runs_executed, self.seed, self.error
            ),
        }
    }
}

impl<T: fmt::Debug> fmt::Display for TestFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// Formats failures for console output
pub struct ErrorReporter {
    pub verbose: bool,
    pub show_timing: bool,
}

impl ErrorReporter {
    /// Create a new error reporter with default settings
    pub fn new() -> Self {
        Self {
            verbose: false,
            show_timing: true,
        }
    }

    /// Enable verbose output mode
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Toggle timing information
    pub fn show_timing(mut self, show: bool) -> Self {
        self.show_timing = show;
        self
    }

    /// Generate a full failure report
    pub fn format_failure<T>(&self, failure: &TestFailure<T>) -> String
    where
        T: fmt::Debug,
    {
        let rule = "=".repeat(62);
        let mut report = String::new();

        report.push_str(&rule);
        report.push_str("\n                    PROPERTY TEST FAILURE\n");
        report.push_str(&rule);
        report.push_str("\n\n");

        report.push_str(&format!(
            "Failed in {} phase after {} runs\n",
            failure.phase, failure.runs_executed
        ));
        report.push_str(&format!("Seed: {}\n", failure.seed));
        report.push_str(&format!("Error: {}\n\n", failure.error));

        report.push_str("INPUT:\n");
        match &failure.original_input {
            Some(input) => report.push_str(&format!("   Original input: {:?}\n", input)),
            None => report.push_str("   Original input: <not generated>\n"),
        }
        if let Some(ref shrunk) = failure.shrunk_input {
            report.push_str(&format!("   Shrunk input:   {:?}\n", shrunk));
            report.push_str(&format!("   Shrink steps:   {}\n", failure.shrink_steps));
            if !failure.shrink_completed {
                report.push_str("   (partial shrink: budget exhausted, not fully minimized)\n");
            }
        } else {
            report.push_str("   No shrinking performed\n");
        }
        report.push('\n');

        if self.show_timing {
            report.push_str("TIMING:\n");
            report.push_str(&format!(
                "   Total test time:  {:?}\n",
                failure.test_duration
            ));
            report.push_str(&format!(
                "   Shrinking time:   {:?}\n",
                failure.shrink_duration
            ));
            report.push('\n');
        }

        if self.verbose {
            report.push_str("ERROR CONTEXT:\n");
            report.push_str(&self.format_error_context(&failure.error));
            report.push('\n');
        }

        report.push_str(&format!(
            "Reproduce with seed {} (e.g. TestConfig::default().with_seed({}))\n",
            failure.seed, failure.seed
        ));
        report.push_str(&rule);
        report.push('\n');
        report
    }

    /// Format detailed error context
    pub fn format_error_context(&self, error: &PropertyError) -> String {
        let mut context = String::new();

        match error {
            PropertyError::AssertionFailure {
                message,
                context: ctx,
            } => {
                context.push_str("   Type: Assertion failure\n");
                context.push_str(&format!("   Message: {}\n", message));
                if let Some(ctx) = ctx {
                    context.push_str(&format!("   Context: {}\n", ctx));
                }
            }
            PropertyError::GenerationExhausted {
                attempts,
                context: ctx,
            } => {
                context.push_str("   Type: Generation exhausted\n");
                context.push_str(&format!("   Attempts: {}\n", attempts));
                if let Some(ctx) = ctx {
                    context.push_str(&format!("   Context: {}\n", ctx));
                }
            }
            PropertyError::ConfigurationError { message, field } => {
                context.push_str("   Type: Configuration error\n");
                context.push_str(&format!("   Message: {}\n", message));
                if let Some(field) = field {
                    context.push_str(&format!("   Field: {}\n", field));
                }
            }
            PropertyError::ActionApplicationError {
                action,
                step,
                message,
            } => {
                context.push_str("   Type: Action application error\n");
                context.push_str(&format!("   Action: {}\n", action));
                context.push_str(&format!("   Step: {}\n", step));
                context.push_str(&format!("   Message: {}\n", message));
            }
            PropertyError::PostCheckViolation { step, message } => {
                context.push_str("   Type: Post-check violation\n");
                if let Some(step) = step {
                    context.push_str(&format!("   Step: {}\n", step));
                }
                context.push_str(&format!("   Message: {}\n", message));
            }
            PropertyError::PreconditionFailed { message } => {
                context.push_str("   Type: Precondition not met\n");
                context.push_str(&format!("   Message: {}\n", message));
            }
        }

        context
    }

    /// Generate a concise summary for quick debugging
    pub fn format_summary<T>(&self, failure: &TestFailure<T>) -> String
    where
        T: fmt::Debug,
    {
        let mut summary = String::new();
        summary.push_str(&format!("{}\n", failure.summary()));
        if let Some(input) = failure.minimal_input() {
            summary.push_str(&format!("   Focus on input: {:?}\n", input));
        }
        summary.push_str(&format!("   Error: {}\n", failure.error));
        summary
    }

    /// Format for standard test output: full report when verbose
    pub fn format_for_test_output<T>(&self, failure: &TestFailure<T>) -> String
    where
        T: fmt::Debug,
    {
        if self.verbose {
            self.format_failure(failure)
        } else {
            self.format_summary(failure)
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
