//! Core generator infrastructure.
//!
//! A generator is a pure function from a [`RandomSource`] to a
//! [`Shrinkable`]. [`Gen`] is the shared, cheaply clonable handle every
//! combinator in this crate produces and consumes.

use std::fmt;
use std::rc::Rc;

use crate::combinators::Weighted;
use crate::config::GeneratorConfig;
use crate::error::PropertyError;
use crate::rng::RandomSource;
use crate::shrinkable::Shrinkable;

/// Retry budget for [`Gen::filter`]
pub const FILTER_MAX_ATTEMPTS: usize = 100;

/// Result of a single generation
pub type Generated<T> = Result<Shrinkable<T>, PropertyError>;

/// Core generator trait for creating test data together with its shrink tree
pub trait Generator<T> {
    /// Draw a value and its shrink tree from `rng`.
    ///
    /// The same stream position and configuration must always produce a
    /// structurally identical tree.
    fn generate(&self, rng: &mut RandomSource, config: &GeneratorConfig) -> Generated<T>;
}

impl<T, F> Generator<T> for F
where
    F: Fn(&mut RandomSource, &GeneratorConfig) -> Generated<T>,
{
    fn generate(&self, rng: &mut RandomSource, config: &GeneratorConfig) -> Generated<T> {
        self(rng, config)
    }
}

/// A shared, type-erased generator
pub struct Gen<T> {
    inner: Rc<dyn Generator<T>>,
}

impl<T> Clone for Gen<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Gen<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gen").finish_non_exhaustive()
    }
}

impl<T> Generator<T> for Gen<T> {
    fn generate(&self, rng: &mut RandomSource, config: &GeneratorConfig) -> Generated<T> {
        self.inner.generate(rng, config)
    }
}

impl<T: Clone + 'static> Gen<T> {
    /// Wrap any generator
    pub fn new<G: Generator<T> + 'static>(generator: G) -> Self {
        Self {
            inner: Rc::new(generator),
        }
    }

    /// Build a generator from a closure
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&mut RandomSource, &GeneratorConfig) -> Generated<T> + 'static,
    {
        Self::new(f)
    }

    /// Draw one value from a fresh source seeded with `seed`
    pub fn sample(&self, seed: u64) -> Result<T, PropertyError> {
        let mut rng = RandomSource::from_seed(seed);
        self.generate(&mut rng, &GeneratorConfig::default())
            .map(Shrinkable::into_value)
    }

    /// Transform generated values; shrink trees are mapped node by node
    pub fn map<U, F>(&self, f: F) -> Gen<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let base = self.clone();
        let f = Rc::new(f);
        Gen::from_fn(move |rng, config| {
            let f = Rc::clone(&f);
            Ok(base.generate(rng, config)?.map(move |value| f(value)))
        })
    }

    /// Keep only values satisfying `pred`.
    ///
    /// Rejected draws are resampled up to [`FILTER_MAX_ATTEMPTS`] times
    /// before generation fails with `GenerationExhausted`. Shrink candidates
    /// that violate `pred` are pruned.
    pub fn filter<P>(&self, pred: P) -> Gen<T>
    where
        P: Fn(&T) -> bool + 'static,
    {
        let base = self.clone();
        let pred = Rc::new(pred);
        Gen::from_fn(move |rng, config| {
            for _ in 0..FILTER_MAX_ATTEMPTS {
                let pred = Rc::clone(&pred);
                if let Some(accepted) = base.generate(rng, config)?.filter(move |v| pred(v)) {
                    return Ok(accepted);
                }
            }
            Err(PropertyError::generation_exhausted(
                FILTER_MAX_ATTEMPTS,
                Some("filter predicate rejected every candidate"),
            ))
        })
    }

    /// Generate a dependent value from a generator derived from each value.
    ///
    /// The base value and the dependent value are drawn from two separate
    /// forks of the trial's stream. While shrinking, each simpler base value
    /// re-derives its generator and replays the dependent fork, so every
    /// candidate satisfies the dependency. Once the base is minimal, the
    /// dependent value shrinks with the base held fixed.
    pub fn flat_map<U, F>(&self, f: F) -> Gen<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> Gen<U> + 'static,
    {
        let base = self.clone();
        let f = Rc::new(f);
        Gen::from_fn(move |rng, config| {
            let mut base_rng = rng.fork();
            let dependent_rng = rng.fork();
            let outer = base.generate(&mut base_rng, config)?;
            let dependent = f(outer.value()).generate(&mut dependent_rng.clone(), config)?;

            let f = Rc::clone(&f);
            let config = config.clone();
            let rebind = move |value: &T| {
                f(value)
                    .generate(&mut dependent_rng.clone(), &config)
                    .ok()
            };
            Ok(outer.bind_from(dependent, Rc::new(rebind)))
        })
    }

    /// Like [`Gen::flat_map`], keeping the base value alongside the dependent one
    pub fn chain<U, F>(&self, f: F) -> Gen<(T, U)>
    where
        U: Clone + 'static,
        F: Fn(&T) -> Gen<U> + 'static,
    {
        let f = Rc::new(f);
        self.flat_map(move |value: &T| {
            let value = value.clone();
            f(&value).map(move |dependent| (value.clone(), dependent.clone()))
        })
    }

    /// Pair this generator with another; see [`crate::combinators::tuple2`]
    pub fn zip<U: Clone + 'static>(&self, other: &Gen<U>) -> Gen<(T, U)> {
        crate::combinators::tuple2(self, other)
    }

    /// Cap the branching factor of every shrink tree this generator produces
    pub fn with_shrink_limit(&self, n: usize) -> Gen<T> {
        let base = self.clone();
        Gen::from_fn(move |rng, config| Ok(base.generate(rng, config)?.take(n)))
    }

    /// Drop shrink trees entirely
    pub fn no_shrink(&self) -> Gen<T> {
        let base = self.clone();
        Gen::from_fn(move |rng, config| Ok(Shrinkable::new(base.generate(rng, config)?.into_value())))
    }

    pub fn just(value: T) -> Gen<T> {
        crate::combinators::just(value)
    }

    pub fn lazy<F: Fn() -> Gen<T> + 'static>(thunk: F) -> Gen<T> {
        crate::combinators::lazy(thunk)
    }

    pub fn element_of(values: Vec<Weighted<T>>) -> Result<Gen<T>, PropertyError> {
        crate::combinators::element_of(values)
    }

    pub fn one_of(generators: Vec<Weighted<Gen<T>>>) -> Result<Gen<T>, PropertyError> {
        crate::combinators::one_of(generators)
    }
}
