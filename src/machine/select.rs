//! Target selection
//!
//! Random picks go through [`RandomSource`] so tests can pin or script them.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform choices
pub trait RandomSource: Send {
    /// Return an index in `0..len`. Never called with `len == 0`.
    fn choose_index(&mut self, len: usize) -> usize;
}

/// Thread-local generator, fresh entropy on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn choose_index(&mut self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Seeded generator for reproducible experiments
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn choose_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn choose_index(&mut self, len: usize) -> usize {
        (**self).choose_index(len)
    }
}

/// Pick one element uniformly, `None` for an empty slice
pub fn choose<'a, T, R: RandomSource + ?Sized>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }

    let index = rng.choose_index(items.len());
    // Out-of-range indices from a misbehaving source are clamped
    items.get(index).or_else(|| items.last())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_choose_empty() {
        let items: Vec<u32> = vec![];
        assert!(choose(&items, &mut ThreadRandom).is_none());
    }

    #[test]
    fn test_choose_single() {
        let items = vec!["only"];
        for _ in 0..20 {
            assert_eq!(choose(&items, &mut ThreadRandom), Some(&"only"));
        }
    }

    #[test]
    fn test_choice_is_member() {
        let items: Vec<u32> = (0..7).collect();
        let mut rng = ThreadRandom;
        for _ in 0..500 {
            let picked = choose(&items, &mut rng).unwrap();
            assert!(items.contains(picked));
        }
    }

    #[test]
    fn test_thread_random_is_not_constant() {
        let items: Vec<u32> = (0..4).collect();
        let mut rng = ThreadRandom;
        let seen: HashSet<u32> = (0..200).map(|_| *choose(&items, &mut rng).unwrap()).collect();
        // Probability of a single value over 200 draws is 4 * (1/4)^200
        assert!(seen.len() > 1);
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let items: Vec<u32> = (0..100).collect();
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        let picks_a: Vec<u32> = (0..20).map(|_| *choose(&items, &mut a).unwrap()).collect();
        let picks_b: Vec<u32> = (0..20).map(|_| *choose(&items, &mut b).unwrap()).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn test_out_of_range_index_is_clamped() {
        struct Broken;
        impl RandomSource for Broken {
            fn choose_index(&mut self, len: usize) -> usize {
                len + 3
            }
        }

        let items = vec![1, 2, 3];
        assert_eq!(choose(&items, &mut Broken), Some(&3));
    }

    #[test]
    fn test_boxed_source() {
        let mut rng: Box<dyn RandomSource> = Box::new(SeededRandom::new(7));
        let items = vec!['a', 'b'];
        assert!(choose(&items, &mut rng).is_some());
    }
}
