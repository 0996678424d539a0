//! Property definitions and their outcomes.

use crate::error::PropertyError;

/// Outcome of a single property evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Pass,
    /// The input did not meet a precondition
    Skip(String),
    Fail(PropertyError),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Fail(_))
    }
}

impl From<Result<(), PropertyError>> for Outcome {
    fn from(result: Result<(), PropertyError>) -> Self {
        match result {
            Ok(()) => Outcome::Pass,
            Err(PropertyError::PreconditionFailed { message }) => Outcome::Skip(message),
            Err(error) => Outcome::Fail(error),
        }
    }
}

/// Values a property may return
pub trait PropertyOutput {
    fn into_outcome(self) -> Outcome;
}

impl PropertyOutput for bool {
    fn into_outcome(self) -> Outcome {
        if self {
            Outcome::Pass
        } else {
            Outcome::Fail(PropertyError::assertion_failure("property returned false"))
        }
    }
}

impl PropertyOutput for () {
    fn into_outcome(self) -> Outcome {
        Outcome::Pass
    }
}

impl PropertyOutput for Result<(), PropertyError> {
    fn into_outcome(self) -> Outcome {
        self.into()
    }
}

impl PropertyOutput for Result<bool, PropertyError> {
    fn into_outcome(self) -> Outcome {
        match self {
            Ok(passed) => passed.into_outcome(),
            Err(error) => Err(error).into(),
        }
    }
}

impl PropertyOutput for Outcome {
    fn into_outcome(self) -> Outcome {
        self
    }
}

/// A predicate over generated inputs.
///
/// Any `Fn(&T) -> O` where `O: PropertyOutput` is a property. Panics are
/// caught by the runner and reported as assertion failures.
pub trait Property<T> {
    fn test(&self, input: &T) -> Outcome;
}

impl<T, O, F> Property<T> for F
where
    F: Fn(&T) -> O,
    O: PropertyOutput,
{
    fn test(&self, input: &T) -> Outcome {
        self(input).into_outcome()
    }
}

/// Skip the current input unless `condition` holds
pub fn assume(condition: bool) -> Result<(), PropertyError> {
    assume_that(condition, "assumption not met")
}

/// Like [`assume`], with a message recorded for the skipped input
pub fn assume_that(condition: bool, message: impl Into<String>) -> Result<(), PropertyError> {
    if condition {
        Ok(())
    } else {
        Err(PropertyError::precondition_failed(message))
    }
}
