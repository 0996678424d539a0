//! Deterministic, forkable random streams.
//!
//! Every value drawn during a run comes from a [`RandomSource`]. A source is
//! created once per run from a 64-bit seed and handed to each trial as a
//! fork, so trials never share stream positions with each other.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A seedable random stream that can be split into independent children.
///
/// Two sources built from the same seed produce the same sequence of draws,
/// and the same sequence of forks.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: ChaCha8Rng,
    seed: u64,
    key: u64,
    forks: u64,
}

impl RandomSource {
    /// Create a root source from a seed
    pub fn from_seed(seed: u64) -> Self {
        Self::with_key(seed, seed)
    }

    /// Create a root source seeded from OS entropy, returning the seed used
    pub fn from_entropy() -> (Self, u64) {
        let seed = rand::thread_rng().next_u64();
        (Self::from_seed(seed), seed)
    }

    fn with_key(seed: u64, key: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(key),
            seed,
            key,
            forks: 0,
        }
    }

    /// The seed of the root source this stream descends from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Derive an independent child stream.
    ///
    /// Only the fork counter moves; the parent's draw position is untouched,
    /// so interleaving forks with draws never shifts the parent's values.
    pub fn fork(&mut self) -> RandomSource {
        self.forks += 1;
        let key = splitmix64(self.key ^ splitmix64(self.forks));
        Self::with_key(self.seed, key)
    }

    /// Draw the low `n` bits of a 64-bit word (`n` is clamped to 64)
    pub fn next_bits(&mut self, n: u32) -> u64 {
        match n {
            0 => 0,
            n if n >= 64 => self.rng.next_u64(),
            n => self.rng.next_u64() & ((1u64 << n) - 1),
        }
    }

    /// Uniform integer in `[lo, hi]`, both ends inclusive
    pub fn next_int(&mut self, lo: i64, hi: i64) -> i64 {
        if lo >= hi {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    /// Uniform unsigned integer in `[lo, hi]`, both ends inclusive
    pub fn next_u64_in(&mut self, lo: u64, hi: u64) -> u64 {
        if lo >= hi {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    /// Uniform float in `[0, 1)`
    pub fn next_float(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    /// `true` with probability `p` (clamped to `[0, 1]`)
    pub fn next_bool(&mut self, p: f64) -> bool {
        if p.is_nan() || p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.next_float() < p
    }

    /// Uniform index in `[0, len)`; `len` must be non-zero
    pub fn next_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        self.next_u64_in(0, len.saturating_sub(1) as u64) as usize
    }
}

impl RngCore for RandomSource {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RandomSource::from_seed(42);
        let mut b = RandomSource::from_seed(42);

        for _ in 0..100 {
            assert_eq!(a.next_int(-1000, 1000), b.next_int(-1000, 1000));
        }
    }

    #[test]
    fn test_matches_chacha_stream() {
        let mut source = RandomSource::from_seed(7);
        let mut reference = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..10 {
            assert_eq!(source.next_u64(), reference.next_u64());
        }
    }

    #[test]
    fn test_fork_does_not_advance_parent() {
        let mut forked = RandomSource::from_seed(9);
        let mut plain = RandomSource::from_seed(9);

        let mut child = forked.fork();
        let _ = child.next_u64();

        for _ in 0..10 {
            assert_eq!(forked.next_u64(), plain.next_u64());
        }
    }

    #[test]
    fn test_forks_are_distinct_and_reproducible() {
        let mut a = RandomSource::from_seed(1);
        let mut b = RandomSource::from_seed(1);

        let mut a1 = a.fork();
        let mut a2 = a.fork();
        let mut b1 = b.fork();

        let x1 = a1.next_u64();
        assert_eq!(x1, b1.next_u64());
        assert_ne!(x1, a2.next_u64());
        assert_eq!(a1.seed(), 1);
    }

    #[test]
    fn test_bounds() {
        let mut source = RandomSource::from_seed(3);
        for _ in 0..1000 {
            let v = source.next_int(-5, 5);
            assert!((-5..=5).contains(&v));
            let f = source.next_float();
            assert!((0.0..1.0).contains(&f));
            assert!(source.next_bits(3) < 8);
        }
        assert_eq!(source.next_int(4, 4), 4);
        assert!(!source.next_bool(0.0));
        assert!(source.next_bool(1.0));
    }
}
