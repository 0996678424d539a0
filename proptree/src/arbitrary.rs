//! Arbitrary trait and related functionality for automatic test data generation.

use std::collections::{BTreeMap, BTreeSet};

use crate::combinators::{tuple2, tuple3, tuple4};
use crate::generator::Gen;
use crate::primitives;

/// Types with a default generator.
///
/// Implemented for the primitive types, `String`, and for containers,
/// options and tuples of arbitrary types.
pub trait Arbitrary: Clone + Sized + 'static {
    /// Generator used by [`any`]
    fn arbitrary() -> Gen<Self>;
}

/// Default generator for `T`
pub fn any<T: Arbitrary>() -> Gen<T> {
    T::arbitrary()
}

macro_rules! impl_arbitrary_int {
    ($($t:ty),*) => {
        $(
            impl Arbitrary for $t {
                fn arbitrary() -> Gen<Self> {
                    primitives::any_int::<$t>()
                }
            }
        )*
    };
}

impl_arbitrary_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Arbitrary for bool {
    fn arbitrary() -> Gen<Self> {
        primitives::boolean()
    }
}

impl Arbitrary for f64 {
    fn arbitrary() -> Gen<Self> {
        primitives::float(-1.0e6, 1.0e6)
    }
}

impl Arbitrary for f32 {
    fn arbitrary() -> Gen<Self> {
        primitives::float(-1.0e6, 1.0e6).map(|v| *v as f32)
    }
}

impl Arbitrary for char {
    fn arbitrary() -> Gen<Self> {
        primitives::unicode_char()
    }
}

impl Arbitrary for String {
    fn arbitrary() -> Gen<Self> {
        primitives::string()
    }
}

impl<T: Arbitrary> Arbitrary for Vec<T> {
    fn arbitrary() -> Gen<Self> {
        primitives::vec(&T::arbitrary())
    }
}

impl<T: Arbitrary> Arbitrary for Option<T> {
    fn arbitrary() -> Gen<Self> {
        primitives::option_of(&T::arbitrary())
    }
}

impl<T: Arbitrary + Ord> Arbitrary for BTreeSet<T> {
    fn arbitrary() -> Gen<Self> {
        let element = T::arbitrary();
        Gen::from_fn(move |rng, config| {
            use crate::generator::Generator;
            primitives::btree_set_of(&element, 0, config.max_size).generate(rng, config)
        })
    }
}

impl<K: Arbitrary + Ord, V: Arbitrary> Arbitrary for BTreeMap<K, V> {
    fn arbitrary() -> Gen<Self> {
        let (key, value) = (K::arbitrary(), V::arbitrary());
        Gen::from_fn(move |rng, config| {
            use crate::generator::Generator;
            primitives::btree_map_of(&key, &value, 0, config.max_size).generate(rng, config)
        })
    }
}

impl<A: Arbitrary, B: Arbitrary> Arbitrary for (A, B) {
    fn arbitrary() -> Gen<Self> {
        tuple2(&A::arbitrary(), &B::arbitrary())
    }
}

impl<A: Arbitrary, B: Arbitrary, C: Arbitrary> Arbitrary for (A, B, C) {
    fn arbitrary() -> Gen<Self> {
        tuple3(&A::arbitrary(), &B::arbitrary(), &C::arbitrary())
    }
}

impl<A: Arbitrary, B: Arbitrary, C: Arbitrary, D: Arbitrary> Arbitrary for (A, B, C, D) {
    fn arbitrary() -> Gen<Self> {
        tuple4(&A::arbitrary(), &B::arbitrary(), &C::arbitrary(), &D::arbitrary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_primitives() {
        for seed in 0..20 {
            let _: i8 = any::<i8>().sample(seed).unwrap();
            let v: f64 = any::<f64>().sample(seed).unwrap();
            assert!(v.is_finite());
            let s: String = any::<String>().sample(seed).unwrap();
            assert!(s.chars().count() <= 10);
        }
    }

    #[test]
    fn test_any_containers() {
        for seed in 0..20 {
            let v: Vec<u8> = any::<Vec<u8>>().sample(seed).unwrap();
            assert!(v.len() <= 10);
            let set = any::<BTreeSet<u16>>().sample(seed).unwrap();
            assert!(set.len() <= 10);
            let (_, _, _): (bool, Option<i32>, char) = any::<(bool, Option<i32>, char)>().sample(seed).unwrap();
        }
    }
}
