//! Generators for primitive types and std containers.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::config::GeneratorConfig;
use crate::error::PropertyError;
use crate::generator::{Gen, Generator};
use crate::rng::RandomSource;
use crate::shrink::strategies;
use crate::shrinkable::Shrinkable;

/// Integer types usable with [`int`]
pub trait IntegerValue: Copy + PartialOrd + std::fmt::Debug + 'static {
    const MIN_VALUE: Self;
    const MAX_VALUE: Self;
    fn to_i128(self) -> i128;
    fn from_i128(value: i128) -> Self;
}

macro_rules! impl_integer_value {
    ($($t:ty),*) => {
        $(
            impl IntegerValue for $t {
                const MIN_VALUE: Self = <$t>::MIN;
                const MAX_VALUE: Self = <$t>::MAX;

                fn to_i128(self) -> i128 {
                    self as i128
                }

                fn from_i128(value: i128) -> Self {
                    value as $t
                }
            }
        )*
    };
}

impl_integer_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

fn invalid_range(kind: &str, lo: impl std::fmt::Debug, hi: impl std::fmt::Debug) -> PropertyError {
    PropertyError::configuration_error(
        format!("{} range is empty: {:?} > {:?}", kind, lo, hi),
        Some("range"),
    )
}

/// Uniform integer in `[lo, hi]`, shrinking toward 0 (or the bound nearest 0)
pub fn int<T: IntegerValue>(lo: T, hi: T) -> Gen<T> {
    Gen::from_fn(move |rng, _config| {
        if lo > hi {
            return Err(invalid_range("integer", lo, hi));
        }
        let (lo, hi) = (lo.to_i128(), hi.to_i128());
        let value: i128 = rng.gen_range(lo..=hi);
        let target = strategies::range_target(lo, hi);
        Ok(strategies::integral(value, target).map(|v| T::from_i128(*v)))
    })
}

/// Integer over the whole domain of `T`
pub fn any_int<T: IntegerValue>() -> Gen<T> {
    int(T::MIN_VALUE, T::MAX_VALUE)
}

/// Uniform float in `[lo, hi)`, shrinking toward 0 (or the bound nearest 0)
pub fn float(lo: f64, hi: f64) -> Gen<f64> {
    Gen::from_fn(move |rng, _config| {
        if !(lo <= hi) || !lo.is_finite() || !hi.is_finite() {
            return Err(invalid_range("float", lo, hi));
        }
        // `hi - lo` may overflow to infinity, so interpolate between the bounds.
        let u = rng.next_float();
        let value = (lo * (1.0 - u) + hi * u).clamp(lo, hi);
        Ok(strategies::floating(value, lo, hi))
    })
}

/// Fair coin; `true` shrinks to `false`
pub fn boolean() -> Gen<bool> {
    weighted_bool(0.5)
}

/// `true` with probability `p`
pub fn weighted_bool(p: f64) -> Gen<bool> {
    Gen::from_fn(move |rng, _config| Ok(strategies::boolean(rng.next_bool(p))))
}

const SURROGATE_START: u32 = 0xD800;
const SURROGATE_LEN: u32 = 0x800;

// Code points are indexed with the surrogate block removed, so every index
// maps to a valid `char`.
fn char_index(c: char) -> u32 {
    let code = c as u32;
    if code >= SURROGATE_START + SURROGATE_LEN {
        code - SURROGATE_LEN
    } else {
        code
    }
}

fn index_char(index: u32) -> char {
    let code = if index >= SURROGATE_START {
        index + SURROGATE_LEN
    } else {
        index
    };
    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Character in `[lo, hi]`, skipping surrogates and shrinking toward `lo`
pub fn char_in(lo: char, hi: char) -> Gen<char> {
    Gen::from_fn(move |rng, _config| {
        if lo > hi {
            return Err(invalid_range("char", lo, hi));
        }
        let (lo_index, hi_index) = (char_index(lo), char_index(hi));
        let index = rng.next_u64_in(lo_index as u64, hi_index as u64);
        Ok(strategies::integral(index as i128, lo_index as i128).map(|i| index_char(*i as u32)))
    })
}

/// Any ASCII character, control characters included
pub fn ascii_char() -> Gen<char> {
    char_in('\0', '\x7f')
}

/// Printable ASCII, from space to tilde
pub fn printable_ascii_char() -> Gen<char> {
    char_in(' ', '~')
}

/// Any Unicode scalar value
pub fn unicode_char() -> Gen<char> {
    char_in('\0', char::MAX)
}

fn draw_len(rng: &mut RandomSource, min_size: usize, max_size: usize) -> Result<usize, PropertyError> {
    if min_size > max_size {
        return Err(PropertyError::configuration_error(
            format!("size range is empty: {} > {}", min_size, max_size),
            Some("min_size"),
        ));
    }
    Ok(rng.next_u64_in(min_size as u64, max_size as u64) as usize)
}

fn draw_elements<T: Clone + 'static>(
    element: &Gen<T>,
    len: usize,
    rng: &mut RandomSource,
    config: &GeneratorConfig,
) -> Result<Vec<Shrinkable<T>>, PropertyError> {
    (0..len).map(|_| element.generate(rng, config)).collect()
}

/// Vector with a length in `[min_size, max_size]`
pub fn vec_of<T: Clone + 'static>(element: &Gen<T>, min_size: usize, max_size: usize) -> Gen<Vec<T>> {
    let element = element.clone();
    Gen::from_fn(move |rng, config| {
        let len = draw_len(rng, min_size, max_size)?;
        let elems = draw_elements(&element, len, rng, config)?;
        Ok(strategies::values(strategies::sequence(elems, min_size)))
    })
}

/// Vector sized by the run's `GeneratorConfig`
pub fn vec<T: Clone + 'static>(element: &Gen<T>) -> Gen<Vec<T>> {
    let element = element.clone();
    Gen::from_fn(move |rng, config| {
        vec_of(&element, config.min_size, config.max_size).generate(rng, config)
    })
}

/// String of characters drawn from `chars`, length in `[min_len, max_len]`
pub fn string_of(chars: &Gen<char>, min_len: usize, max_len: usize) -> Gen<String> {
    vec_of(chars, min_len, max_len).map(|chars| chars.iter().collect())
}

pub fn ascii_string(min_len: usize, max_len: usize) -> Gen<String> {
    string_of(&ascii_char(), min_len, max_len)
}

pub fn printable_string(min_len: usize, max_len: usize) -> Gen<String> {
    string_of(&printable_ascii_char(), min_len, max_len)
}

pub fn unicode_string(min_len: usize, max_len: usize) -> Gen<String> {
    string_of(&unicode_char(), min_len, max_len)
}

/// Printable ASCII string sized by the run's `GeneratorConfig`
pub fn string() -> Gen<String> {
    Gen::from_fn(|rng, config| printable_string(config.min_size, config.max_size).generate(rng, config))
}

// Draw distinct elements until `len` are found or the attempt budget runs out.
fn draw_unique<T, K, F>(
    element: &Gen<T>,
    len: usize,
    min_size: usize,
    key: F,
    rng: &mut RandomSource,
    config: &GeneratorConfig,
) -> Result<Vec<Shrinkable<T>>, PropertyError>
where
    T: Clone + 'static,
    K: Ord,
    F: Fn(&T) -> K,
{
    let max_attempts = len * 10 + 100;
    let mut seen: BTreeMap<K, Shrinkable<T>> = BTreeMap::new();
    let mut attempts = 0;
    while seen.len() < len && attempts < max_attempts {
        attempts += 1;
        let candidate = element.generate(rng, config)?;
        seen.entry(key(candidate.value())).or_insert(candidate);
    }
    if seen.len() < min_size {
        return Err(PropertyError::generation_exhausted(
            attempts,
            Some(format!(
                "found {} distinct elements, {} required",
                seen.len(),
                min_size
            )),
        ));
    }
    Ok(seen.into_values().collect())
}

/// Ordered set with a size in `[min_size, max_size]`.
///
/// Fails with `GenerationExhausted` when the element generator cannot
/// produce `min_size` distinct values.
pub fn btree_set_of<T>(element: &Gen<T>, min_size: usize, max_size: usize) -> Gen<BTreeSet<T>>
where
    T: Clone + Ord + 'static,
{
    let element = element.clone();
    Gen::from_fn(move |rng, config| {
        let len = draw_len(rng, min_size, max_size)?;
        let elems = draw_unique(&element, len, min_size, |v: &T| v.clone(), rng, config)?;
        let tree = strategies::unique_sequence(elems, min_size, |v: &T| v.clone());
        Ok(strategies::values(tree).map(|values| values.iter().cloned().collect()))
    })
}

/// Ordered map with a size in `[min_size, max_size]`; keys and values shrink
/// independently, and key shrinks that would collide are dropped
pub fn btree_map_of<K, V>(
    key: &Gen<K>,
    value: &Gen<V>,
    min_size: usize,
    max_size: usize,
) -> Gen<BTreeMap<K, V>>
where
    K: Clone + Ord + 'static,
    V: Clone + 'static,
{
    let entry = crate::combinators::tuple2(key, value);
    Gen::from_fn(move |rng, config| {
        let len = draw_len(rng, min_size, max_size)?;
        let elems = draw_unique(&entry, len, min_size, |(k, _): &(K, V)| k.clone(), rng, config)?;
        let tree = strategies::unique_sequence(elems, min_size, |(k, _): &(K, V)| k.clone());
        Ok(strategies::values(tree).map(|entries| entries.iter().cloned().collect()))
    })
}

/// `None` about one time in five; `Some` shrinks to `None` first
pub fn option_of<T: Clone + 'static>(inner: &Gen<T>) -> Gen<Option<T>> {
    let inner = inner.clone();
    Gen::from_fn(move |rng, config| {
        if rng.next_bool(0.2) {
            return Ok(Shrinkable::new(None));
        }
        let some = inner.generate(rng, config)?.map(|v| Some(v.clone()));
        Ok(some.prepend_static(|| vec![Shrinkable::new(None)]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shrinkable::testing::for_each_path;

    fn generate<T: Clone + 'static>(generator: &Gen<T>, seed: u64) -> Shrinkable<T> {
        generator
            .generate(&mut RandomSource::from_seed(seed), &GeneratorConfig::default())
            .unwrap()
    }

    #[test]
    fn test_int_range_and_target() {
        let generator = int::<i32>(10, 20);
        for seed in 0..50 {
            let s = generate(&generator, seed);
            assert!((10..=20).contains(s.value()));
            for_each_path(&s, 5, &mut |path: &[i32]| {
                assert!(path.iter().all(|v| (10..=20).contains(v)));
            });
            if *s.value() != 10 {
                assert_eq!(s.shrinks().next().map(|c| *c.value()), Some(10));
            }
        }
    }

    #[test]
    fn test_int_full_domain() {
        let s = generate(&any_int::<u64>(), 3);
        if *s.value() != 0 {
            assert_eq!(s.shrinks().next().map(|c| *c.value()), Some(0));
        }
        let s = generate(&any_int::<i8>(), 3);
        assert!((i8::MIN..=i8::MAX).contains(s.value()));
    }

    #[test]
    fn test_int_shrinks_monotonically() {
        let generator = int::<i64>(-500, 500);
        for seed in 0..20 {
            let s = generate(&generator, seed);
            for_each_path(&s, 6, &mut |path: &[i64]| {
                for pair in path.windows(2) {
                    assert!(pair[1].abs() < pair[0].abs());
                }
            });
        }
    }

    #[test]
    fn test_empty_int_range_is_configuration_error() {
        let result = int::<i32>(5, 1).generate(&mut RandomSource::from_seed(1), &GeneratorConfig::default());
        assert!(matches!(result, Err(PropertyError::ConfigurationError { .. })));
    }

    #[test]
    fn test_float_range() {
        let generator = float(-2.5, 7.5);
        for seed in 0..50 {
            let v = *generate(&generator, seed).value();
            assert!((-2.5..=7.5).contains(&v));
        }
        assert!(float(1.0, f64::NAN).sample(1).is_err());
    }

    #[test]
    fn test_float_full_finite_range() {
        let generator = float(f64::MIN, f64::MAX);
        for seed in 0..100 {
            let root = generate(&generator, seed);
            assert!(root.value().is_finite(), "seed {} drew {}", seed, root.value());
            for child in root.shrinks() {
                assert!(child.value().is_finite());
                assert!(child.value().abs() < root.value().abs());
            }
        }
    }

    #[test]
    fn test_boolean_shrink() {
        let generator = boolean();
        let found_true = (0..20).map(|seed| generate(&generator, seed)).find(|s| *s.value());
        let s = found_true.unwrap();
        assert_eq!(s.shrinks().map(|c| *c.value()).collect::<Vec<_>>(), vec![false]);
    }

    #[test]
    fn test_char_index_skips_surrogates() {
        assert_eq!(index_char(char_index('\u{D7FF}')), '\u{D7FF}');
        assert_eq!(index_char(char_index('\u{E000}')), '\u{E000}');
        assert_eq!(char_index('\u{E000}'), 0xD800);
        assert_eq!(index_char(char_index(char::MAX)), char::MAX);

        let generator = unicode_char();
        for seed in 0..200 {
            let c = *generate(&generator, seed).value();
            assert!(!(0xD800..0xE000).contains(&(c as u32)));
        }
    }

    #[test]
    fn test_printable_chars_shrink_toward_space() {
        let s = generate(&printable_ascii_char(), 8);
        assert!((' '..='~').contains(s.value()));
        if *s.value() != ' ' {
            assert_eq!(s.shrinks().next().map(|c| *c.value()), Some(' '));
        }
    }

    #[test]
    fn test_vec_lengths_and_shrinks() {
        let generator = vec_of(&int::<u8>(0, 100), 2, 6);
        for seed in 0..20 {
            let s = generate(&generator, seed);
            assert!((2..=6).contains(&s.value().len()));
            for_each_path(&s, 3, &mut |path: &[Vec<u8>]| {
                for pair in path.windows(2) {
                    assert!(pair[1].len() <= pair[0].len());
                    assert!(pair[1].len() >= 2);
                    assert_ne!(pair[1], pair[0]);
                }
            });
        }
    }

    #[test]
    fn test_vec_uses_config_sizes() {
        let config = GeneratorConfig::new(3, 3, 5).unwrap();
        let s = vec(&boolean())
            .generate(&mut RandomSource::from_seed(1), &config)
            .unwrap();
        assert_eq!(s.value().len(), 3);
    }

    #[test]
    fn test_strings() {
        for seed in 0..20 {
            let s = generate(&ascii_string(1, 8), seed).into_value();
            assert!(s.is_ascii());
            assert!((1..=8).contains(&s.chars().count()));

            let u = generate(&unicode_string(0, 5), seed).into_value();
            assert!(u.chars().count() <= 5);

            let p = generate(&string(), seed).into_value();
            assert!(p.chars().all(|c| (' '..='~').contains(&c)));
        }
    }

    #[test]
    fn test_set_uniqueness_along_shrinks() {
        let generator = btree_set_of(&int::<i32>(0, 20), 2, 6);
        for seed in 0..20 {
            let s = generate(&generator, seed);
            assert!((2..=6).contains(&s.value().len()));
            for_each_path(&s, 3, &mut |path: &[BTreeSet<i32>]| {
                assert!(path.iter().all(|set| set.len() >= 2));
            });
            for child in s.shrinks() {
                assert!(child.value().len() <= s.value().len());
            }
        }
    }

    #[test]
    fn test_set_exhaustion() {
        let generator = btree_set_of(&int::<i32>(0, 2), 5, 5);
        let result = generator.generate(&mut RandomSource::from_seed(1), &GeneratorConfig::default());
        assert!(matches!(result, Err(PropertyError::GenerationExhausted { .. })));
    }

    #[test]
    fn test_map_key_uniqueness() {
        let generator = btree_map_of(&int::<u8>(0, 50), &boolean(), 1, 5);
        for seed in 0..20 {
            let s = generate(&generator, seed);
            let len = s.value().len();
            assert!((1..=5).contains(&len));
            for child in s.shrinks() {
                assert!(!child.value().is_empty());
                assert!(child.value().len() <= len);
            }
        }
    }

    #[test]
    fn test_option_shrinks_to_none_first() {
        let generator = option_of(&int::<i32>(1, 10));
        let some = (0..50)
            .map(|seed| generate(&generator, seed))
            .find(|s| s.value().is_some())
            .unwrap();
        assert_eq!(some.shrinks().next().map(|c| c.value().clone()), Some(None));
        let none = (0..50)
            .map(|seed| generate(&generator, seed))
            .find(|s| s.value().is_none())
            .unwrap();
        assert!(!none.has_shrinks());
    }
}
