//! Item memories and continuous item memories.
//!
//! An [`ItemMemory`] maps symbols (feature ids, characters, DNA bases) to
//! near-orthogonal hypervectors. A [`ContinuousItemMemory`] maps quantized
//! scalar levels to hypervectors whose similarity falls off with the
//! distance between levels.
//!
//! # Generation
//!
//! - **Random**: every vector is a rank-thresholded random permutation, so
//!   each one has exactly `D/2` ones.
//! - **CA90**: each bank starts from a seed expanded by CA90 and chains
//!   `ca90_step` for the rest of the bank. Chains saturate when a bank gets
//!   close to `D/2` vectors, so large memories are split into independently
//!   seeded banks.
//!
//! CIM levels flip runs of a base vector. The base comes from the builder's
//! CIM mode: a random vector seeded by the CIM seed, or the seed expanded
//! by CA90, so random item memories work at any dimension.

use crate::ca90::{Ca90, Ca90Mode};
use crate::error::{HdcError, Result};
use crate::primitives::Primitives;
use crate::similarity::Similarity;
use crate::vector::{Domain, Hypervector};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How orthogonal item memories are generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImMode {
    Random,
    Ca90Iterative,
    #[default]
    Ca90Hierarchical,
}

impl ImMode {
    /// CA90 expansion mode, or `None` for random indexing.
    pub fn ca90_mode(self) -> Option<Ca90Mode> {
        match self {
            ImMode::Random => None,
            ImMode::Ca90Iterative => Some(Ca90Mode::Iterative),
            ImMode::Ca90Hierarchical => Some(Ca90Mode::Hierarchical),
        }
    }
}

/// An ordered, index-addressable set of equal-length hypervectors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemMemory {
    vectors: Vec<Hypervector>,
}

impl ItemMemory {
    /// Wrap a list of vectors, checking that all lengths agree.
    pub fn new(vectors: Vec<Hypervector>) -> Result<Self> {
        if let Some(first) = vectors.first() {
            let dim = first.dimensions();
            for v in &vectors[1..] {
                Primitives::check_dims(dim, v.dimensions())?;
            }
        }
        Ok(Self { vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Vector width, 0 for an empty memory.
    pub fn dimensions(&self) -> usize {
        self.vectors.first().map_or(0, Hypervector::dimensions)
    }

    pub fn get(&self, index: usize) -> Result<&Hypervector> {
        self.vectors.get(index).ok_or(HdcError::IndexOutOfRange {
            index,
            len: self.vectors.len(),
        })
    }

    pub fn vectors(&self) -> &[Hypervector] {
        &self.vectors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hypervector> {
        self.vectors.iter()
    }

    pub fn into_vectors(self) -> Vec<Hypervector> {
        self.vectors
    }

    /// Append another memory's vectors (bank concatenation).
    pub fn extend(&mut self, other: ItemMemory) -> Result<()> {
        if !self.is_empty() && !other.is_empty() {
            Primitives::check_dims(self.dimensions(), other.dimensions())?;
        }
        self.vectors.extend(other.vectors);
        Ok(())
    }

    /// Convert every vector to `domain`.
    pub fn to_domain(&self, domain: Domain) -> Self {
        let vectors = self
            .vectors
            .iter()
            .map(|v| match domain {
                Domain::Binary => v.to_binary(),
                Domain::Bipolar => v.to_bipolar(),
            })
            .collect();
        Self { vectors }
    }

    /// Widen each vector to `D * multiplier` by concatenating
    /// `permute(v, k)` for `k = 0..multiplier`.
    pub fn expand(&self, multiplier: usize) -> Self {
        let vectors = self
            .vectors
            .iter()
            .map(|v| {
                let mut data = Vec::with_capacity(v.dimensions() * multiplier);
                for k in 0..multiplier {
                    data.extend_from_slice(Primitives::permute(v, k as i64).data());
                }
                Hypervector::from_data(data)
            })
            .collect();
        Self { vectors }
    }

    /// Pairwise similarity table (the confusion matrix of the memory).
    pub fn similarity_matrix(&self, domain: Domain) -> Result<Vec<Vec<f64>>> {
        self.vectors
            .iter()
            .map(|a| {
                self.vectors
                    .iter()
                    .map(|b| Similarity::distance(a, b, domain))
                    .collect()
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a ItemMemory {
    type Item = &'a Hypervector;
    type IntoIter = std::slice::Iter<'a, Hypervector>;

    fn into_iter(self) -> Self::IntoIter {
        self.vectors.iter()
    }
}

/// Level-indexed hypervectors with a monotonic similarity gradient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContinuousItemMemory {
    levels: ItemMemory,
}

impl ContinuousItemMemory {
    pub fn new(levels: Vec<Hypervector>) -> Result<Self> {
        Ok(Self {
            levels: ItemMemory::new(levels)?,
        })
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn dimensions(&self) -> usize {
        self.levels.dimensions()
    }

    pub fn get(&self, level: usize) -> Result<&Hypervector> {
        self.levels.get(level)
    }

    pub fn levels(&self) -> &[Hypervector] {
        self.levels.vectors()
    }

    pub fn as_item_memory(&self) -> &ItemMemory {
        &self.levels
    }

    pub fn to_domain(&self, domain: Domain) -> Self {
        Self {
            levels: self.levels.to_domain(domain),
        }
    }

    /// Widen each level to `D * multiplier` by repeating it unshifted.
    ///
    /// Unlike [`ItemMemory::expand`] no permutation is applied, which keeps
    /// the level-to-level gradient intact.
    pub fn expand(&self, multiplier: usize) -> Self {
        let vectors = self
            .levels
            .iter()
            .map(|v| Hypervector::from_data(v.data().repeat(multiplier)))
            .collect();
        Self {
            levels: ItemMemory { vectors },
        }
    }
}

/// Seeds and vectors of a banked CA90 item memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ca90ImSet {
    /// One seed per bank, in bank order.
    pub seeds: Vec<u64>,
    pub memory: ItemMemory,
}

/// Builds item memories and CIMs at a fixed dimension.
#[derive(Clone, Debug)]
pub struct ItemMemoryBuilder {
    dim: usize,
    domain: Domain,
    seed_size: usize,
    chain_shift: usize,
    max_seed_attempts: usize,
    strict_bank_size: bool,
    cim_mode: ImMode,
}

impl ItemMemoryBuilder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            domain: Domain::Binary,
            seed_size: 32,
            chain_shift: 1,
            max_seed_attempts: 1_000_000,
            strict_bank_size: false,
            cim_mode: ImMode::Ca90Hierarchical,
        }
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_seed_size(mut self, seed_size: usize) -> Self {
        self.seed_size = seed_size;
        self
    }

    pub fn with_chain_shift(mut self, shift: usize) -> Self {
        self.chain_shift = shift;
        self
    }

    pub fn with_max_seed_attempts(mut self, attempts: usize) -> Self {
        self.max_seed_attempts = attempts;
        self
    }

    /// How the CIM base vector is generated.
    pub fn with_cim_mode(mut self, mode: ImMode) -> Self {
        self.cim_mode = mode;
        self
    }

    pub fn cim_mode(&self) -> ImMode {
        self.cim_mode
    }

    /// Reject oversized banks instead of warning.
    pub fn strict_bank_size(mut self, strict: bool) -> Self {
        self.strict_bank_size = strict;
        self
    }

    pub fn dimensions(&self) -> usize {
        self.dim
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Surface bank sizes that push a CA90 chain toward saturation.
    ///
    /// Above `D/4` is logged; at or above `D/2` is a warning, or
    /// [`HdcError::BankSizeExceeded`] in strict mode.
    pub fn check_bank_size(&self, per_bank: usize) -> Result<()> {
        if per_bank * 2 >= self.dim {
            if self.strict_bank_size {
                return Err(HdcError::BankSizeExceeded {
                    per_bank,
                    dim: self.dim,
                });
            }
            warn!(
                per_bank,
                dim = self.dim,
                "Item memory bank size is at least half the dimension; vectors will saturate"
            );
        } else if per_bank * 4 > self.dim {
            debug!(per_bank, dim = self.dim, "Item memory bank size above the recommended D/4");
        }
        Ok(())
    }

    /// One random-indexing vector with exactly `D - floor(D/2)` ones.
    fn random_vector(&self, rng: &mut ChaCha8Rng) -> Hypervector {
        let mut ranks: Vec<usize> = (0..self.dim).collect();
        ranks.shuffle(rng);
        let cutoff = self.dim / 2;
        Hypervector::from_data(ranks.into_iter().map(|r| i8::from(r >= cutoff)).collect())
    }

    /// One CA90 bank: vector 0 from the seed, the rest chained by `ca90_step`.
    pub fn build_ca90_bank(&self, seed: u64, count: usize, mode: Ca90Mode) -> Result<Vec<Hypervector>> {
        let mut bank = Vec::with_capacity(count);
        if count == 0 {
            return Ok(bank);
        }
        let mut current = Ca90::expand_seed(seed, self.seed_size, self.dim, mode)?;
        for _ in 1..count {
            let next = Ca90::step(&current, self.chain_shift);
            bank.push(current);
            current = next;
        }
        bank.push(current);
        Ok(bank)
    }

    /// Build `num_vectors` near-orthogonal vectors.
    ///
    /// Random mode uses `seeds[0]` (or 0) as the RNG seed and ignores
    /// `bank_size`. CA90 modes need one seed per bank of `bank_size`
    /// vectors.
    pub fn build_orthogonal_im(
        &self,
        num_vectors: usize,
        mode: ImMode,
        seeds: &[u64],
        bank_size: usize,
    ) -> Result<ItemMemory> {
        let memory = match mode.ca90_mode() {
            None => {
                let mut rng = ChaCha8Rng::seed_from_u64(seeds.first().copied().unwrap_or(0));
                let vectors = (0..num_vectors).map(|_| self.random_vector(&mut rng)).collect();
                ItemMemory { vectors }
            }
            Some(ca90_mode) => {
                let banks = self.num_banks(num_vectors, bank_size)?;
                if seeds.len() < banks {
                    return Err(HdcError::InvalidConfig(format!(
                        "{} banks need {} seeds, got {}",
                        banks,
                        banks,
                        seeds.len()
                    )));
                }
                self.build_banks(num_vectors, bank_size, &seeds[..banks], ca90_mode)?
            }
        };
        Ok(memory.to_domain(self.domain))
    }

    /// Banked CA90 memory returning the seeds alongside the vectors.
    ///
    /// Explicit seeds are used first; any banks left over get seeds from a
    /// bounded search seeded by `search_seed`.
    pub fn build_ca90_im_set(
        &self,
        num_total: usize,
        per_bank: usize,
        mode: Ca90Mode,
        explicit_seeds: &[u64],
        search_seed: u64,
    ) -> Result<Ca90ImSet> {
        let banks = self.num_banks(num_total, per_bank)?;
        let mut seeds: Vec<u64> = explicit_seeds.iter().copied().take(banks).collect();

        if seeds.len() < banks {
            let mut rng = ChaCha8Rng::seed_from_u64(search_seed);
            let found = Ca90::seed_search(
                self.seed_size,
                banks - seeds.len(),
                self.dim,
                mode,
                self.max_seed_attempts,
                &mut rng,
            )?;
            seeds.extend(found);
        }

        let memory = self.build_banks(num_total, per_bank, &seeds, mode)?;
        debug!(banks, num_total, dim = self.dim, "Built CA90 item memory");
        Ok(Ca90ImSet {
            seeds,
            memory: memory.to_domain(self.domain),
        })
    }

    fn num_banks(&self, num_vectors: usize, bank_size: usize) -> Result<usize> {
        if bank_size == 0 {
            return Err(HdcError::InvalidConfig("bank size must be positive".into()));
        }
        self.check_bank_size(bank_size.min(num_vectors))?;
        Ok(num_vectors.div_ceil(bank_size))
    }

    fn build_banks(&self, num_vectors: usize, bank_size: usize, seeds: &[u64], mode: Ca90Mode) -> Result<ItemMemory> {
        let mut vectors = Vec::with_capacity(num_vectors);
        for &seed in seeds {
            let count = bank_size.min(num_vectors - vectors.len());
            vectors.extend(self.build_ca90_bank(seed, count, mode)?);
        }
        Ok(ItemMemory { vectors })
    }

    /// Base vector of a CIM: random with `seed` as the RNG seed, or `seed`
    /// expanded by CA90 in the CIM mode.
    fn cim_base(&self, seed: u64) -> Result<Hypervector> {
        match self.cim_mode.ca90_mode() {
            None => Ok(self.random_vector(&mut ChaCha8Rng::seed_from_u64(seed))),
            Some(mode) => Ca90::expand_seed(seed, self.seed_size, self.dim, mode),
        }
    }

    /// `D/2` levels; level `i` toggles element `2i - 1` of level `i - 1`.
    ///
    /// Adjacent levels differ in exactly one element and the extremes in
    /// `D/2 - 1`.
    pub fn build_square_cim(&self, seed: u64) -> Result<ContinuousItemMemory> {
        let num_levels = self.dim / 2;
        if num_levels == 0 {
            return Err(HdcError::EmptyInput("square CIM needs at least 2 dimensions".into()));
        }

        let mut levels = Vec::with_capacity(num_levels);
        let mut current = self.cim_base(seed)?;
        for i in 1..num_levels {
            let mut next = current.clone();
            let idx = 2 * i - 1;
            next[idx] ^= 1;
            levels.push(current);
            current = next;
        }
        levels.push(current);

        Ok(ContinuousItemMemory {
            levels: ItemMemory { vectors: levels },
        }
        .to_domain(self.domain))
    }

    /// `num_levels` levels; each flips the next contiguous run of elements.
    ///
    /// The run is `D/2/(L-1)` elements with `max_ortho` (extremes end up
    /// about orthogonal) or `D/(L-1)` without (extremes end up nearly
    /// complementary).
    pub fn build_cim(&self, num_levels: usize, seed: u64, max_ortho: bool) -> Result<ContinuousItemMemory> {
        if num_levels == 0 {
            return Err(HdcError::EmptyInput("CIM needs at least one level".into()));
        }

        let base = self.cim_base(seed)?;
        if num_levels == 1 {
            return ContinuousItemMemory::new(vec![base]).map(|cim| cim.to_domain(self.domain));
        }

        let span = if max_ortho { self.dim / 2 } else { self.dim };
        let run = span / (num_levels - 1);
        if run == 0 {
            return Err(HdcError::InvalidConfig(format!(
                "{} CIM levels do not fit in {} dimensions",
                num_levels, self.dim
            )));
        }

        let mut levels = Vec::with_capacity(num_levels);
        let mut current = base;
        for i in 1..num_levels {
            let mut next = current.clone();
            for idx in (i - 1) * run..i * run {
                next[idx] ^= 1;
            }
            levels.push(current);
            current = next;
        }
        levels.push(current);

        Ok(ContinuousItemMemory {
            levels: ItemMemory { vectors: levels },
        }
        .to_domain(self.domain))
    }
}
