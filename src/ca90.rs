//! CA90 hypervector generator.
//!
//! Rule 90 is the elementary cellular automaton where each cell becomes the
//! XOR of its two neighbours. Applied to a short random seed it yields long,
//! nearly balanced and nearly orthogonal bit strings, which is how the
//! hardware grows 32-bit seeds into full-width hypervectors on chip.
//!
//! # Expansion modes
//!
//! - **Iterative**: `seed ++ step(seed, 1) ++ step(seed, 2) ++ ...`
//! - **Hierarchical**: repeatedly `current = step(current, shift) ++ current`,
//!   doubling the length each round
//!
//! All generation is deterministic given the seed. Only [`Ca90::seed_search`]
//! draws randomness, from a caller-supplied RNG.

use crate::error::{HdcError, Result};
use crate::vector::Hypervector;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a seed is grown to the target dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ca90Mode {
    Iterative,
    #[default]
    Hierarchical,
}

/// CA90 generation functions.
pub struct Ca90;

impl Ca90 {
    /// One rule-90 step: `new[i] = s[(i - shift) mod D] XOR s[(i + shift) mod D]`.
    pub fn step(seed: &Hypervector, shift: usize) -> Hypervector {
        let n = seed.dimensions();
        if n == 0 {
            return seed.clone();
        }
        let s = seed.data();
        let shift = shift % n;

        let data = (0..n)
            .map(|i| s[(i + n - shift) % n] ^ s[(i + shift) % n])
            .collect();
        Hypervector::from_data(data)
    }

    /// Concatenate the seed with `step(seed, k)` for `k = 1, 2, ...`.
    ///
    /// `target_dim` must be a multiple of the seed length.
    pub fn iterative_expand(seed: &Hypervector, target_dim: usize) -> Result<Hypervector> {
        Self::check_iterative(seed.dimensions(), target_dim)?;
        let blocks = target_dim / seed.dimensions();

        let mut data = Vec::with_capacity(target_dim);
        data.extend_from_slice(seed.data());
        for k in 1..blocks {
            data.extend_from_slice(Self::step(seed, k).data());
        }
        Ok(Hypervector::from_data(data))
    }

    /// Double the length by prepending `step(current, shift)` until it
    /// reaches `target_dim`.
    ///
    /// `target_dim / len(seed)` must be a power of two; anything else fails
    /// up front instead of looping.
    pub fn hierarchical_expand(seed: &Hypervector, target_dim: usize, shift: usize) -> Result<Hypervector> {
        Self::check_hierarchical(seed.dimensions(), target_dim)?;

        let mut current = seed.clone();
        while current.dimensions() < target_dim {
            current = Self::step(&current, shift).concat(&current);
        }
        Ok(current)
    }

    /// Expand in the given mode. Hierarchical expansion uses shift 1.
    pub fn expand(seed: &Hypervector, target_dim: usize, mode: Ca90Mode) -> Result<Hypervector> {
        match mode {
            Ca90Mode::Iterative => Self::iterative_expand(seed, target_dim),
            Ca90Mode::Hierarchical => Self::hierarchical_expand(seed, target_dim, 1),
        }
    }

    /// Expand an integer seed of `seed_size` bits (MSB first).
    pub fn expand_seed(seed: u64, seed_size: usize, target_dim: usize, mode: Ca90Mode) -> Result<Hypervector> {
        let seed = Hypervector::from_seed(seed, seed_size)?;
        Self::expand(&seed, target_dim, mode)
    }

    /// Check that `mode` can grow `seed_len` elements to `target_dim`.
    pub fn check_reachable(seed_len: usize, target_dim: usize, mode: Ca90Mode) -> Result<()> {
        match mode {
            Ca90Mode::Iterative => Self::check_iterative(seed_len, target_dim),
            Ca90Mode::Hierarchical => Self::check_hierarchical(seed_len, target_dim),
        }
    }

    fn check_iterative(seed_len: usize, target_dim: usize) -> Result<()> {
        if seed_len == 0 || target_dim == 0 || target_dim % seed_len != 0 {
            return Err(HdcError::NonDivisibleDimension { target: target_dim, seed_len });
        }
        Ok(())
    }

    fn check_hierarchical(seed_len: usize, target_dim: usize) -> Result<()> {
        let reachable = seed_len > 0
            && target_dim >= seed_len
            && target_dim % seed_len == 0
            && (target_dim / seed_len).is_power_of_two();
        if !reachable {
            return Err(HdcError::UnreachableDimension { target: target_dim, seed_len });
        }
        Ok(())
    }

    /// Find `count` seeds whose expansion has exactly `target_dim / 2` ones.
    ///
    /// Rejection sampling over uniform `seed_size`-bit integers, capped at
    /// `max_attempts` draws in total. Seeds are returned in acceptance order
    /// and may repeat.
    pub fn seed_search<R: Rng + ?Sized>(
        seed_size: usize,
        count: usize,
        target_dim: usize,
        mode: Ca90Mode,
        max_attempts: usize,
        rng: &mut R,
    ) -> Result<Vec<u64>> {
        if seed_size == 0 || seed_size > 64 {
            return Err(HdcError::InvalidSeedSize(seed_size));
        }
        Self::check_reachable(seed_size, target_dim, mode)?;

        let target_ones = target_dim / 2;
        let mut seeds = Vec::with_capacity(count);
        let mut attempts = 0;

        while seeds.len() < count {
            if attempts >= max_attempts {
                return Err(HdcError::SeedSearchExhausted {
                    attempts,
                    found: seeds.len(),
                    requested: count,
                });
            }
            attempts += 1;

            let candidate = rng.gen::<u64>() >> (64 - seed_size);
            let hv = Self::expand_seed(candidate, seed_size, target_dim, mode)?;
            if target_dim % 2 == 0 && hv.count_ones() == target_ones {
                debug!(seed = candidate, attempts, "Accepted CA90 seed");
                seeds.push(candidate);
            }
        }

        debug!(count, attempts, ?mode, "Seed search complete");
        Ok(seeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_step_rule() {
        let s = Hypervector::from_data(vec![0, 0, 1, 0, 0]);
        // Each neighbour of the set cell lights up
        assert_eq!(Ca90::step(&s, 1).data(), &[0, 1, 0, 1, 0]);
        assert_eq!(Ca90::step(&s, 2).data(), &[1, 0, 0, 0, 1]);
    }

    #[test]
    fn test_step_wraps() {
        let s = Hypervector::from_data(vec![1, 0, 0, 0]);
        assert_eq!(Ca90::step(&s, 1).data(), &[0, 1, 0, 1]);
    }

    #[test]
    fn test_iterative_expand() {
        let seed = Hypervector::from_data(vec![0, 0, 1, 0, 0]);
        let hv = Ca90::iterative_expand(&seed, 15).unwrap();

        assert_eq!(hv.dimensions(), 15);
        assert_eq!(&hv.data()[0..5], seed.data());
        assert_eq!(&hv.data()[5..10], Ca90::step(&seed, 1).data());
        assert_eq!(&hv.data()[10..15], Ca90::step(&seed, 2).data());
    }

    #[test]
    fn test_iterative_requires_divisible_target() {
        let seed = Hypervector::from_seed(0xDEAD_BEEF, 32).unwrap();
        assert!(matches!(
            Ca90::iterative_expand(&seed, 100),
            Err(HdcError::NonDivisibleDimension { target: 100, seed_len: 32 })
        ));
    }

    #[test]
    fn test_hierarchical_expand_prepends() {
        let seed = Hypervector::from_data(vec![1, 0, 0, 0]);
        let hv = Ca90::hierarchical_expand(&seed, 8, 1).unwrap();

        assert_eq!(hv.dimensions(), 8);
        assert_eq!(&hv.data()[4..8], seed.data());
        assert_eq!(&hv.data()[0..4], Ca90::step(&seed, 1).data());
    }

    #[test]
    fn test_hierarchical_is_deterministic() {
        let seed = Hypervector::from_seed(3_275_349_888, 32).unwrap();
        let a = Ca90::hierarchical_expand(&seed, 256, 1).unwrap();
        let b = Ca90::hierarchical_expand(&seed, 256, 1).unwrap();

        assert_eq!(a.dimensions(), 256);
        assert_eq!(a, b);
        assert!(a.data().iter().all(|&x| x == 0 || x == 1));
    }

    #[test]
    fn test_hierarchical_unreachable_target() {
        let seed = Hypervector::from_seed(1, 32).unwrap();
        assert!(matches!(
            Ca90::hierarchical_expand(&seed, 96, 1),
            Err(HdcError::UnreachableDimension { target: 96, seed_len: 32 })
        ));
        assert!(Ca90::hierarchical_expand(&seed, 16, 1).is_err());
        assert_eq!(Ca90::hierarchical_expand(&seed, 32, 1).unwrap(), seed);
    }

    #[test]
    fn test_seed_search_density() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let seeds = Ca90::seed_search(32, 4, 512, Ca90Mode::Hierarchical, 1_000_000, &mut rng).unwrap();

        assert_eq!(seeds.len(), 4);
        for seed in seeds {
            let hv = Ca90::expand_seed(seed, 32, 512, Ca90Mode::Hierarchical).unwrap();
            assert_eq!(hv.count_ones(), 256, "Seed {} is not balanced", seed);
        }
    }

    #[test]
    fn test_seed_search_is_reproducible() {
        let a = Ca90::seed_search(32, 3, 256, Ca90Mode::Iterative, 1_000_000, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        let b = Ca90::seed_search(32, 3, 256, Ca90Mode::Iterative, 1_000_000, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_search_exhausted() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        // An odd target can never be half ones
        let err = Ca90::seed_search(3, 1, 9, Ca90Mode::Iterative, 50, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            HdcError::SeedSearchExhausted {
                attempts: 50,
                found: 0,
                requested: 1
            }
        ));
    }
}
