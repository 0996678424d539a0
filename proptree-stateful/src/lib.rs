//! # proptree-stateful
//!
//! Stateful and model-based property testing on top of `proptree`.
//!
//! A stateful property draws an initial state, then applies a random
//! sequence of [`Action`]s chosen by an [`ActionGenFactory`] that sees the
//! live state (and optional model) before each step. After every action,
//! named invariants and an optional post-check must hold. A failing run is
//! shrunk in two stages: the action sequence first, then the initial state.
//!
//! ## Quick Example
//!
//! ```rust
//! use proptree_stateful::prelude::*;
//!
//! let actions = action_gen_of(vec![
//!     Weighted::plain(just(Action::<i64>::simple("inc", |n: &mut i64| *n += 1))),
//!     Weighted::plain(just(Action::<i64>::simple("dec", |n: &mut i64| *n -= 1))),
//! ])
//! .unwrap();
//!
//! let failure = StatefulProperty::new(&Gen::just(0i64), actions)
//!     .post_check(|n: &i64, _: &()| *n >= 0)
//!     .seed(3)
//!     .max_actions(20)
//!     .run()
//!     .unwrap_err();
//!
//! assert_eq!(failure.shrunk_action_names(), vec!["dec"]);
//! ```

#![allow(clippy::result_large_err)]
#![allow(clippy::type_complexity)]

pub mod config;
pub mod invariants;
pub mod operations;
pub mod runner;

pub use config::StatefulConfig;
pub use invariants::{FnInvariant, Invariant, InvariantSet, InvariantViolation};
pub use operations::generator::{ActionGenFactory, ActionGenOf, action_gen_of};
pub use operations::shrinking::{ShrunkRun, failing_step, same_failure, shrink_run};
pub use operations::{Action, action_names};
pub use runner::{
    StatefulFailure, StatefulProperty, StatefulSuccess, StatefulTestResult, run_model_property,
    run_stateful_property,
};

/// Re-exports for convenient imports
pub mod prelude {
    pub use crate::config::StatefulConfig;
    pub use crate::invariants::{Invariant, InvariantSet};
    pub use crate::operations::generator::{ActionGenFactory, action_gen_of};
    pub use crate::operations::{Action, action_names};
    pub use crate::runner::{
        StatefulFailure, StatefulProperty, StatefulSuccess, StatefulTestResult,
        run_model_property, run_stateful_property,
    };

    pub use proptree::{Gen, PropertyError, Weighted, just, one_of};
}
