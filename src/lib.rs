//! # hdc-golden: HDC accelerator reference model
//!
//! Bit-exact software model of a hyperdimensional-computing accelerator.
//! It generates the item memories, encoded samples and trained class
//! memories that a hardware implementation is checked against.
//!
//! ## Quick Start
//!
//! ```rust
//! use hdc_golden::{Hdc, HdcConfig, ImMode, IdLevelEncoder};
//!
//! # fn main() -> hdc_golden::Result<()> {
//! let config = HdcConfig {
//!     hv_dim: 256,
//!     num_total_im: 8,
//!     num_per_im_bank: 8,
//!     im_mode: ImMode::Random,
//!     cim_levels: Some(4),
//!     ..Default::default()
//! };
//! let mut hdc = Hdc::new(config)?;
//!
//! // Two classes of 3-feature samples; feature values are CIM levels
//! let data = vec![
//!     vec![vec![0usize, 0, 0], vec![0, 1, 0]],
//!     vec![vec![3usize, 3, 3], vec![3, 2, 3]],
//! ];
//! let encoder = IdLevelEncoder::new(1);
//!
//! hdc.train(&data, &encoder)?;
//! assert_eq!(hdc.classify(&[3usize, 3, 2][..], &encoder)?, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! - **Hypervectors**: binary {0, 1} or bipolar {-1, +1} vectors
//! - **CA90**: rule-90 expansion of short seeds into full-width vectors
//! - **Item memory / CIM**: symbol and level codebooks
//! - **Bind / Bundle / Permute**: the accelerator's ALU operations
//! - **Quantizer**: integer and minifloat codecs for non-binary models
//! - **Associative memory**: class prototypes with perceptron retraining

pub mod accumulator;
pub mod assoc_memory;
pub mod ca90;
pub mod config;
pub mod encoder;
pub mod error;
pub mod item_memory;
pub mod persist;
pub mod primitives;
pub mod quantize;
pub mod similarity;
pub mod vector;

// Re-exports for convenience
pub use accumulator::{Accumulator, QuantAccumulator};
pub use assoc_memory::{AssociativeMemory, Dataset, Evaluation};
pub use ca90::{Ca90, Ca90Mode};
pub use config::HdcConfig;
pub use encoder::{
    Encoded, EncodingPipeline, IdLevelEncoder, NgramEncoder, PermuteOrder, PermutedBitEncoder, SampleEncoder,
    ValuePositionEncoder,
};
pub use error::{HdcError, Result};
pub use item_memory::{Ca90ImSet, ContinuousItemMemory, ImMode, ItemMemory, ItemMemoryBuilder};
pub use primitives::Primitives;
pub use quantize::{MinifloatFormat, Overflow, QuantScheme, QuantizedLevels, QuantizedVector, Quantizer};
pub use similarity::Similarity;
pub use vector::{Domain, Hypervector};

use tracing::info;

/// A configured model: item memory, CIM, encoding pipeline and
/// associative memory built from one [`HdcConfig`].
///
/// Generation happens once in [`Hdc::new`]; afterwards the item memory and
/// CIM are read-only and only the associative memory changes.
#[derive(Clone, Debug)]
pub struct Hdc {
    config: HdcConfig,
    item_memory: ItemMemory,
    /// Per-bank seeds (CA90 modes only)
    im_seeds: Vec<u64>,
    cim: ContinuousItemMemory,
    memory: AssociativeMemory,
}

impl Hdc {
    /// Validate the configuration and generate the memories.
    pub fn new(config: HdcConfig) -> Result<Self> {
        config.validate()?;
        let builder = config.item_memory_builder();

        let (item_memory, im_seeds) = match config.im_mode.ca90_mode() {
            None => {
                let im = builder.build_orthogonal_im(
                    config.num_total_im,
                    ImMode::Random,
                    &[config.random_seed],
                    config.num_per_im_bank,
                )?;
                (im, Vec::new())
            }
            Some(mode) => {
                let set = builder.build_ca90_im_set(
                    config.num_total_im,
                    config.num_per_im_bank,
                    mode,
                    &config.im_seeds,
                    config.random_seed,
                )?;
                (set.memory, set.seeds)
            }
        };

        let cim = match config.cim_levels {
            None => builder.build_square_cim(config.cim_seed)?,
            Some(levels) => builder.build_cim(levels, config.cim_seed, config.cim_max_ortho)?,
        };

        let (item_memory, cim) = if config.expansion > 1 {
            (item_memory.expand(config.expansion), cim.expand(config.expansion))
        } else {
            (item_memory, cim)
        };

        let pipeline = EncodingPipeline::new(config.domain, config.quantizer()?);
        info!(
            dim = config.working_dim(),
            im = item_memory.len(),
            cim_levels = cim.num_levels(),
            scheme = %pipeline.quantizer().scheme(),
            "Model initialised"
        );

        Ok(Self {
            config,
            item_memory,
            im_seeds,
            cim,
            memory: AssociativeMemory::new(pipeline),
        })
    }

    pub fn config(&self) -> &HdcConfig {
        &self.config
    }

    /// Working dimension (after expansion).
    pub fn dimensions(&self) -> usize {
        self.config.working_dim()
    }

    pub fn domain(&self) -> Domain {
        self.config.domain
    }

    pub fn item_memory(&self) -> &ItemMemory {
        &self.item_memory
    }

    /// Seeds the item memory banks were generated from, in bank order.
    pub fn im_seeds(&self) -> &[u64] {
        &self.im_seeds
    }

    pub fn cim(&self) -> &ContinuousItemMemory {
        &self.cim
    }

    pub fn memory(&self) -> &AssociativeMemory {
        &self.memory
    }

    /// Replace the associative memory, e.g. with one loaded from disk.
    pub fn set_memory(&mut self, memory: AssociativeMemory) {
        self.memory = memory;
    }

    // =========================================================================
    // Primitives
    // =========================================================================

    pub fn bind(&self, a: &Hypervector, b: &Hypervector) -> Result<Hypervector> {
        Primitives::bind(a, b, self.domain())
    }

    pub fn bundle(&self, vectors: &[&Hypervector]) -> Result<Hypervector> {
        Primitives::bundle(vectors, self.domain())
    }

    pub fn permute(&self, vec: &Hypervector, k: i64) -> Hypervector {
        Primitives::permute(vec, k)
    }

    pub fn similarity(&self, a: &Hypervector, b: &Hypervector) -> Result<f64> {
        Similarity::distance(a, b, self.domain())
    }

    // =========================================================================
    // Encoding and classification
    // =========================================================================

    pub fn encode<S, E>(&self, encoder: &E, sample: &S) -> Result<Encoded>
    where
        S: ?Sized,
        E: SampleEncoder<S> + ?Sized,
    {
        self.memory
            .pipeline()
            .encode(encoder, sample, &self.item_memory, Some(&self.cim))
    }

    pub fn train<S, D, E>(&mut self, dataset: &D, encoder: &E) -> Result<()>
    where
        S: ?Sized,
        D: Dataset<S> + ?Sized,
        E: SampleEncoder<S> + ?Sized,
    {
        self.memory
            .train(dataset, encoder, &self.item_memory, Some(&self.cim))
    }

    /// One perceptron pass; returns the number of corrections.
    pub fn retrain<S, D, E>(&mut self, dataset: &D, encoder: &E) -> Result<usize>
    where
        S: ?Sized,
        D: Dataset<S> + ?Sized,
        E: SampleEncoder<S> + ?Sized,
    {
        self.memory
            .retrain(dataset, encoder, &self.item_memory, Some(&self.cim))
    }

    pub fn predict(&self, query: &Encoded) -> Result<usize> {
        self.memory.predict(query)
    }

    pub fn classify<S, E>(&self, sample: &S, encoder: &E) -> Result<usize>
    where
        S: ?Sized,
        E: SampleEncoder<S> + ?Sized,
    {
        self.memory
            .classify(sample, encoder, &self.item_memory, Some(&self.cim))
    }

    pub fn evaluate<S, D, E>(&self, dataset: &D, encoder: &E) -> Result<Evaluation>
    where
        S: ?Sized,
        D: Dataset<S> + ?Sized,
        E: SampleEncoder<S> + ?Sized,
    {
        self.memory
            .evaluate(dataset, encoder, &self.item_memory, Some(&self.cim))
    }
}

// =============================================================================
// Tests
// =============================================================================
