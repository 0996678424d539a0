//! Named invariants checked after every action

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use proptree::PropertyError;
use proptree::error::panic_message;

/// An invariant that must hold for a state
pub trait Invariant<S> {
    fn check(&self, state: &S) -> bool;

    fn name(&self) -> &str;
}

/// A closure-based invariant
pub struct FnInvariant<F> {
    name: String,
    check_fn: F,
}

impl<F> FnInvariant<F> {
    pub fn new(name: impl Into<String>, check_fn: F) -> Self {
        Self {
            name: name.into(),
            check_fn,
        }
    }
}

impl<S, F> Invariant<S> for FnInvariant<F>
where
    F: Fn(&S) -> bool,
{
    fn check(&self, state: &S) -> bool {
        (self.check_fn)(state)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Invariants evaluated in insertion order; the first violation wins
pub struct InvariantSet<S> {
    invariants: Vec<Box<dyn Invariant<S>>>,
}

impl<S> InvariantSet<S> {
    pub fn new() -> Self {
        Self {
            invariants: Vec::new(),
        }
    }

    pub fn add<I: Invariant<S> + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Add a closure-based invariant
    pub fn add_fn<F>(&mut self, name: impl Into<String>, check_fn: F)
    where
        F: Fn(&S) -> bool + 'static,
    {
        self.add(FnInvariant::new(name, check_fn));
    }

    /// Check every invariant in order; a panicking check counts as violated
    pub fn check_all(&self, state: &S) -> Result<(), InvariantViolation> {
        for inv in &self.invariants {
            let panic = match catch_unwind(AssertUnwindSafe(|| inv.check(state))) {
                Ok(true) => continue,
                Ok(false) => None,
                Err(payload) => Some(panic_message(payload.as_ref())),
            };
            return Err(InvariantViolation {
                name: inv.name().to_string(),
                panic,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

impl<S> Default for InvariantSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// The first invariant that did not hold
#[derive(Debug, Clone, PartialEq)]
pub struct InvariantViolation {
    pub name: String,
    /// Panic message, when the check panicked instead of returning false
    pub panic: Option<String>,
}

impl InvariantViolation {
    /// Report this violation as a post-check failure after `step`
    pub fn into_error(self, step: usize, action: &str) -> PropertyError {
        let message = match self.panic {
            Some(panic) => format!(
                "invariant '{}' panicked after action '{}': {}",
                self.name, action, panic
            ),
            None => format!("invariant '{}' violated after action '{}'", self.name, action),
        };
        PropertyError::post_check_violation(Some(step), message)
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invariant violated: {}", self.name)?;
        if let Some(panic) = &self.panic {
            write!(f, " (panicked: {})", panic)?;
        }
        Ok(())
    }
}

impl std::error::Error for InvariantViolation {}
