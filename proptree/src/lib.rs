#![allow(clippy::result_large_err)]
#![allow(clippy::type_complexity)]

//! # Proptree - Property-Based Testing with Shrink Trees
//!
//! Proptree generates random inputs for a predicate and, when one fails,
//! searches a lazily built tree of simpler inputs for a minimal
//! counterexample. Every run is driven by a single seed, so any failure
//! can be replayed exactly.
//!
//! ## Quick Start
//!
//! ```rust
//! use proptree::{PropertyTestBuilder, int};
//!
//! let failure = PropertyTestBuilder::new()
//!     .seed(42)
//!     .run(int::<i32>(0, 1000), |x: &i32| *x < 50)
//!     .unwrap_err();
//!
//! assert_eq!(failure.shrunk_input, Some(50));
//! ```
//!
//! Generators compose; shrinking follows the composition:
//!
//! ```rust
//! use proptree::{Gen, int};
//!
//! let ordered: Gen<(i32, i32)> = int::<i32>(0, 100).chain(|lo| int::<i32>(*lo, 100));
//! let (lo, hi) = ordered.sample(7).unwrap();
//! assert!(lo <= hi);
//! ```

pub mod arbitrary;
pub mod combinators;
pub mod config;
pub mod error;
pub mod execution;
pub mod generator;
pub mod primitives;
pub mod property;
pub mod rng;
pub mod shrink;
pub mod shrinkable;

// Re-export the main public API
pub use arbitrary::{Arbitrary, any};
pub use combinators::{
    Weighted, accumulate, aggregate, construct2, construct3, construct4, element_of, just, lazy,
    one_of, tuple2, tuple3, tuple4,
};
pub use config::{ConfigError, GeneratorConfig, TestConfig};
pub use error::{
    ErrorReporter, PropertyError, PropertyResult, TestFailure, TestPhase, TestSuccess,
};
pub use execution::{
    Matrix, PropertyTest, PropertyTestBuilder, check, matrix2, matrix3, run_property,
};
pub use generator::{Gen, Generated, Generator};
pub use primitives::*;
pub use property::{Outcome, Property, PropertyOutput, assume, assume_that};
pub use rng::RandomSource;
pub use shrink::{ShrinkConfig, ShrinkEngine, ShrinkResult};
pub use shrinkable::Shrinkable;
