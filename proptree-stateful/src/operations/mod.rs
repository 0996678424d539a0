//! Actions: named, state-mutating operations applied during a stateful run

pub mod generator;
pub mod shrinking;

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use proptree::PropertyError;
use proptree::error::panic_message;

type ApplyFn<S, M> = Rc<dyn Fn(&mut S, &mut M) -> Result<(), String>>;

/// A single operation on the system under test and, optionally, its model.
///
/// Actions are cheap to clone; a failing run keeps the exact actions it
/// applied so they can be replayed against fresh copies of the initial state.
pub struct Action<S, M = ()> {
    name: String,
    apply: ApplyFn<S, M>,
}

impl<S, M> Clone for Action<S, M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            apply: Rc::clone(&self.apply),
        }
    }
}

impl<S, M> fmt::Debug for Action<S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl<S: 'static, M: 'static> Action<S, M> {
    /// Action over the state and the model
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut S, &mut M) + 'static,
    {
        Self::fallible(name, move |state, model| {
            f(state, model);
            Ok(())
        })
    }

    /// Action that may reject the current state with an error message
    pub fn fallible<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut S, &mut M) -> Result<(), String> + 'static,
    {
        Self {
            name: name.into(),
            apply: Rc::new(f),
        }
    }

    /// Action that ignores the model
    pub fn simple<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut S) + 'static,
    {
        Self::new(name, move |state, _model| f(state))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply this action as step `step`.
    ///
    /// Returned errors and panics both become `ActionApplicationError`.
    pub fn apply(&self, state: &mut S, model: &mut M, step: usize) -> Result<(), PropertyError> {
        let outcome = catch_unwind(AssertUnwindSafe(|| (self.apply)(state, model)));
        let message = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(message)) => message,
            Err(payload) => panic_message(payload.as_ref()),
        };
        Err(PropertyError::action_failed(&self.name, step, message))
    }
}

/// Names of `actions`, in order
pub fn action_names<S, M>(actions: &[Action<S, M>]) -> Vec<&str> {
    actions.iter().map(|a| a.name.as_str()).collect()
}
