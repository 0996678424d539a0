//! Generator combinators: constants, weighted choice, recursion, products and
//! dependent sequences.

use std::cell::{Cell, OnceCell};
use std::rc::Rc;

use crate::config::GeneratorConfig;
use crate::error::PropertyError;
use crate::generator::{Gen, Generator};
use crate::rng::RandomSource;
use crate::shrink::strategies::{integral, pair};
use crate::shrinkable::Shrinkable;

/// A choice tagged with an optional probability weight
#[derive(Debug, Clone, PartialEq)]
pub enum Weighted<T> {
    /// Shares the probability mass left over by weighted entries
    Plain(T),
    /// Selected with the given probability, in `(0, 1]`
    Weighted(T, f64),
}

impl<T> Weighted<T> {
    pub fn plain(value: T) -> Self {
        Self::Plain(value)
    }

    pub fn weighted(value: T, weight: f64) -> Self {
        Self::Weighted(value, weight)
    }

    pub fn weight(&self) -> Option<f64> {
        match self {
            Self::Plain(_) => None,
            Self::Weighted(_, weight) => Some(*weight),
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Plain(value) | Self::Weighted(value, _) => value,
        }
    }
}

impl<T> From<T> for Weighted<T> {
    fn from(value: T) -> Self {
        Self::Plain(value)
    }
}

/// Resolve weights into a cumulative distribution.
///
/// Unweighted entries split the mass left over by weighted ones equally.
/// When every entry is weighted, weights are rescaled to sum to one.
fn cumulative_distribution(weights: &[Option<f64>]) -> Result<Vec<f64>, PropertyError> {
    if weights.is_empty() {
        return Err(PropertyError::configuration_error(
            "weighted choice needs at least one option",
            Some("weights"),
        ));
    }

    let mut explicit = 0.0;
    let mut unweighted = 0usize;
    for weight in weights {
        match weight {
            Some(w) if *w > 0.0 && *w <= 1.0 => explicit += w,
            Some(w) => {
                return Err(PropertyError::configuration_error(
                    format!("weight {} is outside (0, 1]", w),
                    Some("weights"),
                ));
            }
            None => unweighted += 1,
        }
    }
    if explicit > 1.0 + 1e-9 {
        return Err(PropertyError::configuration_error(
            format!("weights sum to {}, which exceeds 1", explicit),
            Some("weights"),
        ));
    }

    let remaining = 1.0 - explicit;
    if unweighted > 0 && remaining <= 1e-9 {
        return Err(PropertyError::configuration_error(
            "weighted options leave no probability for unweighted ones",
            Some("weights"),
        ));
    }

    let mut total = 0.0;
    let cumulative = weights
        .iter()
        .map(|weight| {
            let probability = match weight {
                Some(w) if unweighted == 0 => w / explicit,
                Some(w) => *w,
                None => remaining / unweighted as f64,
            };
            total += probability;
            total
        })
        .collect();
    Ok(cumulative)
}

fn pick_index(rng: &mut RandomSource, cumulative: &[f64]) -> usize {
    let roll = rng.next_float();
    cumulative
        .iter()
        .position(|edge| roll < *edge)
        .unwrap_or(cumulative.len() - 1)
}

/// Always produces `value`, with no shrinks
pub fn just<T: Clone + 'static>(value: T) -> Gen<T> {
    Gen::from_fn(move |_rng, _config| Ok(Shrinkable::new(value.clone())))
}

/// Pick one of the given values; picked values do not shrink
pub fn element_of<T: Clone + 'static>(values: Vec<Weighted<T>>) -> Result<Gen<T>, PropertyError> {
    let weights: Vec<Option<f64>> = values.iter().map(Weighted::weight).collect();
    let cumulative = cumulative_distribution(&weights)?;
    let values: Vec<T> = values.into_iter().map(Weighted::into_inner).collect();
    Ok(Gen::from_fn(move |rng, _config| {
        let index = pick_index(rng, &cumulative);
        Ok(Shrinkable::new(values[index].clone()))
    }))
}

/// Pick one of the given generators and delegate to it
pub fn one_of<T: Clone + 'static>(generators: Vec<Weighted<Gen<T>>>) -> Result<Gen<T>, PropertyError> {
    let weights: Vec<Option<f64>> = generators.iter().map(Weighted::weight).collect();
    let cumulative = cumulative_distribution(&weights)?;
    let generators: Vec<Gen<T>> = generators.into_iter().map(Weighted::into_inner).collect();
    Ok(Gen::from_fn(move |rng, config| {
        let index = pick_index(rng, &cumulative);
        generators[index].generate(rng, config)
    }))
}

thread_local! {
    static LAZY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

struct DepthGuard;

impl DepthGuard {
    fn enter(max_depth: usize) -> Result<Self, PropertyError> {
        LAZY_DEPTH.with(|depth| {
            if depth.get() >= max_depth {
                return Err(PropertyError::generation_exhausted(
                    depth.get(),
                    Some(format!("recursive generator exceeded max_depth {}", max_depth)),
                ));
            }
            depth.set(depth.get() + 1);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        LAZY_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Defer building a generator until it is first used.
///
/// Lets a generator refer to itself. Nested lazy generation deeper than
/// `GeneratorConfig::max_depth` fails with `GenerationExhausted`.
pub fn lazy<T, F>(thunk: F) -> Gen<T>
where
    T: Clone + 'static,
    F: Fn() -> Gen<T> + 'static,
{
    let cell: OnceCell<Gen<T>> = OnceCell::new();
    Gen::from_fn(move |rng, config| {
        let _guard = DepthGuard::enter(config.max_depth)?;
        cell.get_or_init(&thunk).generate(rng, config)
    })
}

/// Independently drawn pair; shrinks one side at a time
pub fn tuple2<A, B>(a: &Gen<A>, b: &Gen<B>) -> Gen<(A, B)>
where
    A: Clone + 'static,
    B: Clone + 'static,
{
    let (a, b) = (a.clone(), b.clone());
    Gen::from_fn(move |rng, config| {
        let first = a.generate(&mut rng.fork(), config)?;
        let second = b.generate(&mut rng.fork(), config)?;
        Ok(pair(first, second))
    })
}

pub fn tuple3<A, B, C>(a: &Gen<A>, b: &Gen<B>, c: &Gen<C>) -> Gen<(A, B, C)>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
{
    tuple2(&tuple2(a, b), c).map(|((a, b), c)| (a.clone(), b.clone(), c.clone()))
}

pub fn tuple4<A, B, C, D>(a: &Gen<A>, b: &Gen<B>, c: &Gen<C>, d: &Gen<D>) -> Gen<(A, B, C, D)>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    D: Clone + 'static,
{
    tuple2(&tuple3(a, b, c), d).map(|((a, b, c), d)| (a.clone(), b.clone(), c.clone(), d.clone()))
}

/// Build values with `ctor` from two independently drawn arguments.
///
/// Shrinking adjusts one argument at a time, keeping the others at their
/// last failing value.
pub fn construct2<A, B, R, F>(ctor: F, a: &Gen<A>, b: &Gen<B>) -> Gen<R>
where
    A: Clone + 'static,
    B: Clone + 'static,
    R: Clone + 'static,
    F: Fn(A, B) -> R + 'static,
{
    tuple2(a, b).map(move |(a, b)| ctor(a.clone(), b.clone()))
}

pub fn construct3<A, B, C, R, F>(ctor: F, a: &Gen<A>, b: &Gen<B>, c: &Gen<C>) -> Gen<R>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    R: Clone + 'static,
    F: Fn(A, B, C) -> R + 'static,
{
    tuple3(a, b, c).map(move |(a, b, c)| ctor(a.clone(), b.clone(), c.clone()))
}

pub fn construct4<A, B, C, D, R, F>(
    ctor: F,
    a: &Gen<A>,
    b: &Gen<B>,
    c: &Gen<C>,
    d: &Gen<D>,
) -> Gen<R>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    D: Clone + 'static,
    R: Clone + 'static,
    F: Fn(A, B, C, D) -> R + 'static,
{
    tuple4(a, b, c, d).map(move |(a, b, c, d)| ctor(a.clone(), b.clone(), c.clone(), d.clone()))
}

struct Aggregation<T> {
    step: Rc<dyn Fn(&T) -> Gen<T>>,
    config: GeneratorConfig,
    forks: Vec<RandomSource>,
    min_size: usize,
}

impl<T: Clone + 'static> Aggregation<T> {
    // Redraw every step after the given prefix from its original fork.
    fn regenerate(&self, mut steps: Vec<Shrinkable<T>>, len: usize) -> Option<Vec<Shrinkable<T>>> {
        while steps.len() < len {
            let fork = self.forks.get(steps.len())?;
            let previous = steps.last()?.value().clone();
            let next = (self.step)(&previous)
                .generate(&mut fork.clone(), &self.config)
                .ok()?;
            steps.push(next);
        }
        Some(steps)
    }
}

fn aggregation_node<T: Clone + 'static>(
    context: Rc<Aggregation<T>>,
    steps: Vec<Shrinkable<T>>,
) -> Shrinkable<Vec<T>> {
    let value: Vec<T> = steps.iter().map(|s| s.value().clone()).collect();
    let steps = Rc::new(steps);
    Shrinkable::new(value).with_shrinks(move || {
        let len = steps.len();

        let prefix_context = Rc::clone(&context);
        let prefix_steps = Rc::clone(&steps);
        let shorter = integral((len - context.min_size) as i128, 0)
            .shrinks()
            .map(move |extra| {
                let keep = prefix_context.min_size + *extra.value() as usize;
                aggregation_node(Rc::clone(&prefix_context), prefix_steps[..keep].to_vec())
            });

        let element_context = Rc::clone(&context);
        let element_steps = Rc::clone(&steps);
        let simpler = (0..len).flat_map(move |position| {
            let context = Rc::clone(&element_context);
            let base = Rc::clone(&element_steps);
            element_steps[position].shrinks().filter_map(move |candidate| {
                let mut prefix = Vec::with_capacity(base.len());
                prefix.extend_from_slice(&base[..position]);
                prefix.push(candidate);
                let regenerated = context.regenerate(prefix, base.len())?;
                Some(aggregation_node(Rc::clone(&context), regenerated))
            })
        });

        Box::new(shorter.chain(simpler)) as crate::shrinkable::Shrinks<Vec<T>>
    })
}

/// Generate a sequence where each element is drawn from a generator derived
/// from the previous one.
///
/// The first element comes from `initial`; the length is drawn from
/// `[min_size, max_size]`. Shrinking first shortens the sequence (keeping a
/// prefix, so every step still follows from its predecessor), then shrinks
/// elements left to right, regenerating everything after the changed
/// element from its original stream.
pub fn aggregate<T, F>(initial: &Gen<T>, step: F, min_size: usize, max_size: usize) -> Gen<Vec<T>>
where
    T: Clone + 'static,
    F: Fn(&T) -> Gen<T> + 'static,
{
    let initial = initial.clone();
    let step: Rc<dyn Fn(&T) -> Gen<T>> = Rc::new(step);
    Gen::from_fn(move |rng, config| {
        if min_size > max_size {
            return Err(PropertyError::configuration_error(
                format!("aggregate min_size {} exceeds max_size {}", min_size, max_size),
                Some("min_size"),
            ));
        }
        let len = rng.next_u64_in(min_size as u64, max_size as u64) as usize;
        let mut forks = Vec::with_capacity(len);
        let mut steps: Vec<Shrinkable<T>> = Vec::with_capacity(len);
        for _ in 0..len {
            let fork = rng.fork();
            let next = match steps.last() {
                None => initial.generate(&mut fork.clone(), config)?,
                Some(previous) => step(previous.value()).generate(&mut fork.clone(), config)?,
            };
            forks.push(fork);
            steps.push(next);
        }
        let context = Rc::new(Aggregation {
            step: Rc::clone(&step),
            config: config.clone(),
            forks,
            min_size,
        });
        Ok(aggregation_node(context, steps))
    })
}

/// Like [`aggregate`], but yields only the final value.
///
/// `min_steps..=max_steps` counts the steps applied after the initial
/// value, so zero steps yields the initial value itself.
pub fn accumulate<T, F>(initial: &Gen<T>, step: F, min_steps: usize, max_steps: usize) -> Gen<T>
where
    T: Clone + 'static,
    F: Fn(&T) -> Gen<T> + 'static,
{
    let sequence = aggregate(initial, step, min_steps + 1, max_steps + 1);
    Gen::from_fn(move |rng, config| {
        sequence
            .generate(rng, config)?
            .filter(|values| !values.is_empty())
            .map(|tree| tree.map(|values| values[values.len() - 1].clone()))
            .ok_or_else(|| {
                PropertyError::generation_exhausted(1, Some("accumulate produced no values"))
            })
    })
}
