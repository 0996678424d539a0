//! Action generator factories
//!
//! The set of valid actions usually depends on the live state, so a factory
//! is asked for a fresh generator before every step. Factories are never
//! memoized.

use proptree::{Gen, PropertyError, Weighted, one_of};

use crate::operations::Action;

/// Produces the generator for the next action from the current state and model
pub trait ActionGenFactory<S, M = ()> {
    fn action_gen(&self, state: &S, model: &M) -> Gen<Action<S, M>>;
}

impl<S, M, F> ActionGenFactory<S, M> for F
where
    F: Fn(&S, &M) -> Gen<Action<S, M>>,
{
    fn action_gen(&self, state: &S, model: &M) -> Gen<Action<S, M>> {
        self(state, model)
    }
}

/// A state-independent choice among weighted action generators
pub struct ActionGenOf<S, M = ()> {
    choice: Gen<Action<S, M>>,
}

impl<S, M> ActionGenFactory<S, M> for ActionGenOf<S, M>
where
    S: 'static,
    M: 'static,
{
    fn action_gen(&self, _state: &S, _model: &M) -> Gen<Action<S, M>> {
        self.choice.clone()
    }
}

/// Combine action generators into a factory that ignores the current state.
///
/// Weights follow [`proptree::one_of`]; an empty list or invalid weights
/// are a `ConfigurationError`.
pub fn action_gen_of<S, M>(
    generators: Vec<Weighted<Gen<Action<S, M>>>>,
) -> Result<ActionGenOf<S, M>, PropertyError>
where
    S: 'static,
    M: 'static,
{
    Ok(ActionGenOf {
        choice: one_of(generators)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptree::{Generator, GeneratorConfig, RandomSource, just};

    fn names<S: 'static, M: 'static>(
        factory: &dyn ActionGenFactory<S, M>,
        state: &S,
        model: &M,
        draws: u64,
    ) -> Vec<String> {
        (0..draws)
            .map(|seed| {
                factory
                    .action_gen(state, model)
                    .generate(&mut RandomSource::from_seed(seed), &GeneratorConfig::default())
                    .unwrap()
                    .value()
                    .name()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_closure_factory_sees_state() {
        let factory = |state: &Vec<i32>, _: &()| {
            if state.is_empty() {
                just(Action::<Vec<i32>>::simple("push", |s: &mut Vec<i32>| s.push(0)))
            } else {
                just(Action::<Vec<i32>>::simple("pop", |s: &mut Vec<i32>| {
                    s.pop();
                }))
            }
        };
        assert_eq!(names(&factory, &Vec::<i32>::new(), &(), 3), vec!["push"; 3]);
        assert_eq!(names(&factory, &vec![1], &(), 3), vec!["pop"; 3]);
    }

    #[test]
    fn test_action_gen_of_weights() {
        let factory = action_gen_of(vec![
            Weighted::weighted(just(Action::<i32>::simple("common", |s| *s += 1)), 0.9),
            Weighted::plain(just(Action::<i32>::simple("rare", |s| *s = 0))),
        ])
        .unwrap();
        let drawn = names(&factory, &0, &(), 400);
        let common = drawn.iter().filter(|n| *n == "common").count();
        assert!(common > 300, "common drawn {} times", common);
        assert!(common < 400);
    }

    #[test]
    fn test_action_gen_of_requires_generators() {
        let result = action_gen_of::<i32, ()>(Vec::new());
        assert!(matches!(result, Err(PropertyError::ConfigurationError { .. })));
    }
}
