//! Shrink search over lazy shrink trees, plus the per-type tree builders.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::shrinkable::Shrinkable;

/// Budget for a single shrink search
#[derive(Debug, Clone, PartialEq)]
pub struct ShrinkConfig {
    /// Maximum number of candidates evaluated
    pub max_steps: usize,
    /// Wall-clock budget, checked between candidates
    pub timeout: Duration,
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome of a shrink search
#[derive(Debug, Clone)]
pub struct ShrinkResult<T, E> {
    /// The value the search started from
    pub original: T,
    /// Deepest confirmed-failing value
    pub minimal: T,
    /// Failure reported for `minimal`
    pub error: E,
    /// Number of accepted steps (path length from the root)
    pub shrink_steps: usize,
    /// Number of candidates evaluated
    pub candidates_tried: usize,
    pub shrink_duration: Duration,
    /// False when the budget ran out before the search converged
    pub completed: bool,
}

/// Greedy, simplest-first descent through a shrink tree
#[derive(Debug, Clone, Default)]
pub struct ShrinkEngine {
    config: ShrinkConfig,
}

impl ShrinkEngine {
    /// Create a new shrinking engine with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new shrinking engine with custom configuration
    pub fn with_config(config: ShrinkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShrinkConfig {
        &self.config
    }

    /// Shrink a known-failing root.
    ///
    /// Children are evaluated in order; the first one for which `check`
    /// still fails becomes the new root and its siblings are discarded.
    /// The search stops when no child fails or the budget is spent.
    pub fn shrink<T, E, F>(&self, root: Shrinkable<T>, root_error: E, mut check: F) -> ShrinkResult<T, E>
    where
        T: Clone + 'static,
        F: FnMut(&T) -> Result<(), E>,
    {
        let start_time = Instant::now();
        let original = root.value().clone();
        let mut current = root;
        let mut error = root_error;
        let mut shrink_steps = 0;
        let mut candidates_tried = 0;
        let mut completed = true;

        'descend: loop {
            for candidate in current.shrinks() {
                if candidates_tried >= self.config.max_steps
                    || start_time.elapsed() >= self.config.timeout
                {
                    warn!(
                        shrink_steps,
                        candidates_tried,
                        "shrink budget exhausted, reporting partial result"
                    );
                    completed = false;
                    break 'descend;
                }
                candidates_tried += 1;

                if let Err(candidate_error) = check(candidate.value()) {
                    shrink_steps += 1;
                    debug!(shrink_steps, candidates_tried, "accepted shrink candidate");
                    current = candidate;
                    error = candidate_error;
                    continue 'descend;
                }
            }
            break;
        }

        ShrinkResult {
            original,
            minimal: current.into_value(),
            error,
            shrink_steps,
            candidates_tried,
            shrink_duration: start_time.elapsed(),
            completed,
        }
    }
}

/// Tree builders for the built-in value domains.
pub mod strategies {
    use std::rc::Rc;

    use crate::shrinkable::{Shrinkable, Shrinks};

    /// Integer tree for `value`, shrinking toward `target`.
    ///
    /// The first child is the target itself, followed by a binary search
    /// over the open interval between target and value. `value` and
    /// `target` must lie on the same side of every value in the tree, which
    /// holds whenever both come from the same range.
    pub fn integral(value: i128, target: i128) -> Shrinkable<i128> {
        let offset = value - target;
        if offset < 0 {
            towards_zero(-offset).map(move |d| target - d)
        } else {
            towards_zero(offset).map(move |d| target + d)
        }
    }

    /// Target of an inclusive range: zero if contained, else the bound nearest zero
    pub fn range_target(lo: i128, hi: i128) -> i128 {
        if lo > 0 {
            lo
        } else if hi < 0 {
            hi
        } else {
            0
        }
    }

    fn towards_zero(value: i128) -> Shrinkable<i128> {
        Shrinkable::new(value).with_shrinks(move || -> Shrinks<i128> {
            if value == 0 {
                return Box::new(std::iter::empty());
            }
            Box::new(std::iter::once(Shrinkable::new(0)).chain(bisect(0, value)))
        })
    }

    // Values strictly between `lo` and `hi`: the midpoint, whose children
    // bisect the lower half, then the upper half as siblings.
    fn bisect(lo: i128, hi: i128) -> Shrinks<i128> {
        if lo + 1 >= hi {
            return Box::new(std::iter::empty());
        }
        let mid = lo + (hi - lo) / 2;
        let node = Shrinkable::new(mid).with_shrinks(move || bisect(lo, mid));
        Box::new(std::iter::once(node).chain(std::iter::once(()).flat_map(move |_| bisect(mid, hi))))
    }

    /// Float tree for `value` within `[lo, hi]`.
    ///
    /// Candidates are the target, the truncated value and (while more than
    /// one unit away) the midpoint toward the target. Only candidates that
    /// are in range and strictly closer to the target survive.
    pub fn floating(value: f64, lo: f64, hi: f64) -> Shrinkable<f64> {
        let target = if lo > 0.0 {
            lo
        } else if hi < 0.0 {
            hi
        } else {
            0.0
        };
        float_node(value, target, lo, hi)
    }

    fn float_node(value: f64, target: f64, lo: f64, hi: f64) -> Shrinkable<f64> {
        Shrinkable::new(value).with_shrinks(move || {
            let distance = (value - target).abs();
            let mut candidates: Vec<f64> = Vec::with_capacity(3);
            let mut push = |c: f64| {
                let closer = if distance.is_nan() {
                    c == target
                } else {
                    (c - target).abs() < distance
                };
                if c.is_finite() && c >= lo && c <= hi && closer && !candidates.contains(&c) {
                    candidates.push(c);
                }
            };
            push(target);
            push(value.trunc());
            if distance > 1.0 {
                push(target + (value - target) / 2.0);
            }
            candidates
                .into_iter()
                .map(move |c| float_node(c, target, lo, hi))
                .collect::<Vec<_>>()
        })
    }

    /// `true` shrinks to `false`
    pub fn boolean(value: bool) -> Shrinkable<bool> {
        if value {
            Shrinkable::new(true).with_shrinks(|| vec![Shrinkable::new(false)])
        } else {
            Shrinkable::new(false)
        }
    }

    /// Tree over two independent components.
    ///
    /// The first component shrinks with the second held fixed, then the
    /// second with the first held fixed. Nesting pairs keeps the cost of a
    /// search linear in the number of components.
    pub fn pair<A, B>(first: Shrinkable<A>, second: Shrinkable<B>) -> Shrinkable<(A, B)>
    where
        A: Clone + 'static,
        B: Clone + 'static,
    {
        let value = (first.value().clone(), second.value().clone());
        Shrinkable::new(value).with_shrinks(move || -> Shrinks<(A, B)> {
            let held_second = second.clone();
            let held_first = first.clone();
            Box::new(
                first
                    .shrinks()
                    .map(move |a| pair(a, held_second.clone()))
                    .chain(second.shrinks().map(move |b| pair(held_first.clone(), b))),
            )
        })
    }

    type Admit<T> = Rc<dyn Fn(&[Shrinkable<T>], usize, &T) -> bool>;

    /// Tree over a sequence of element trees.
    ///
    /// Membership candidates come first: contiguous runs are removed,
    /// largest runs first and rear runs before front runs, never going
    /// below `min_size`. Element candidates follow: each position in turn
    /// is replaced by one of its own shrinks, other positions held fixed.
    pub fn sequence<T>(elems: Vec<Shrinkable<T>>, min_size: usize) -> Shrinkable<Vec<Shrinkable<T>>>
    where
        T: Clone + 'static,
    {
        collection_node(elems, min_size, None)
    }

    /// Like [`sequence`], for collections whose elements must stay unique
    /// under `key`. Element mutations that would collide are dropped.
    pub fn unique_sequence<T, K, F>(
        elems: Vec<Shrinkable<T>>,
        min_size: usize,
        key: F,
    ) -> Shrinkable<Vec<Shrinkable<T>>>
    where
        T: Clone + 'static,
        K: PartialEq,
        F: Fn(&T) -> K + 'static,
    {
        let admit: Admit<T> = Rc::new(move |elems: &[Shrinkable<T>], position: usize, candidate: &T| {
            let candidate_key = key(candidate);
            elems
                .iter()
                .enumerate()
                .all(|(i, e)| i == position || key(e.value()) != candidate_key)
        });
        collection_node(elems, min_size, Some(admit))
    }

    /// Collapse a tree of element trees into a tree of plain values
    pub fn values<T: Clone + 'static>(tree: Shrinkable<Vec<Shrinkable<T>>>) -> Shrinkable<Vec<T>> {
        tree.map(|elems| elems.iter().map(|e| e.value().clone()).collect())
    }

    fn collection_node<T>(
        elems: Vec<Shrinkable<T>>,
        min_size: usize,
        admit: Option<Admit<T>>,
    ) -> Shrinkable<Vec<Shrinkable<T>>>
    where
        T: Clone + 'static,
    {
        let snapshot = Rc::new(elems.clone());
        Shrinkable::new(elems).with_shrinks(move || -> Shrinks<Vec<Shrinkable<T>>> {
            let len = snapshot.len();

            let removed_from = Rc::clone(&snapshot);
            let removal_admit = admit.clone();
            let membership = removals(len, min_size).map(move |(start, count)| {
                let mut shorter = Vec::with_capacity(len - count);
                shorter.extend_from_slice(&removed_from[..start]);
                shorter.extend_from_slice(&removed_from[start + count..]);
                collection_node(shorter, min_size, removal_admit.clone())
            });

            let mutated_from = Rc::clone(&snapshot);
            let element_admit = admit.clone();
            let element_wise = (0..len).flat_map(move |position| {
                let base = Rc::clone(&mutated_from);
                let admit = element_admit.clone();
                mutated_from[position].shrinks().filter_map(move |candidate| {
                    if let Some(admit) = &admit {
                        if !admit(base.as_slice(), position, candidate.value()) {
                            return None;
                        }
                    }
                    let mut mutated = (*base).clone();
                    mutated[position] = candidate;
                    Some(collection_node(mutated, min_size, admit.clone()))
                })
            });

            Box::new(membership.chain(element_wise))
        })
    }

    /// `(start, count)` runs to remove from a sequence of `len` elements
    fn removals(len: usize, min_size: usize) -> impl Iterator<Item = (usize, usize)> {
        let mut chunk_sizes = Vec::new();
        let mut size = len.saturating_sub(min_size);
        while size > 0 {
            chunk_sizes.push(size);
            size /= 2;
        }
        chunk_sizes.into_iter().flat_map(move |count| {
            let mut starts: Vec<usize> = (0..=len - count)
                .rev()
                .step_by(count)
                .collect();
            if starts.last() != Some(&0) {
                starts.push(0);
            }
            starts.into_iter().map(move |start| (start, count))
        })
    }

}

#[cfg(test)]
mod tests {
    use super::strategies::integral;
    use super::*;

    #[test]
    fn test_shrink_converges_to_boundary() {
        let engine = ShrinkEngine::new();
        let result = engine.shrink(integral(731, 0), "x >= 50", |x| {
            if *x < 50 { Ok(()) } else { Err("x >= 50") }
        });
        assert_eq!(result.minimal, 50);
        assert_eq!(result.original, 731);
        assert!(result.completed);
        assert!(result.shrink_steps > 0);
    }

    #[test]
    fn test_budget_exhaustion_is_partial() {
        let engine = ShrinkEngine::with_config(ShrinkConfig {
            max_steps: 2,
            timeout: Duration::from_secs(10),
        });
        let result = engine.shrink(integral(1000, 0), (), |x| if *x < 50 { Ok(()) } else { Err(()) });
        assert!(!result.completed);
        assert_eq!(result.candidates_tried, 2);
        assert!(result.minimal >= 50 && result.minimal <= 1000);
    }

    #[test]
    fn test_unshrinkable_root_is_returned() {
        let engine = ShrinkEngine::new();
        let result = engine.shrink(Shrinkable::new(5), (), |_| Err(()));
        assert_eq!(result.minimal, 5);
        assert_eq!(result.shrink_steps, 0);
        assert!(result.completed);
    }
}
