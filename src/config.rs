//! Model configuration.
//!
//! Everything that determines the golden outputs lives in one explicit
//! [`HdcConfig`], loaded from JSON and validated once at setup. Nothing in
//! the crate reads ambient or global settings.

use crate::error::{HdcError, Result};
use crate::item_memory::{ImMode, ItemMemoryBuilder};
use crate::quantize::{Overflow, QuantScheme, Quantizer};
use crate::vector::Domain;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters for item memories, CIM, encoding and classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HdcConfig {
    /// Hypervector width before expansion.
    pub hv_dim: usize,
    /// Seed width in bits.
    pub seed_size: usize,
    pub domain: Domain,
    pub num_total_im: usize,
    pub num_per_im_bank: usize,
    pub im_mode: ImMode,
    /// Per-bank CA90 seeds; missing banks are filled by seed search.
    pub im_seeds: Vec<u64>,
    /// Seed for the random IM generator and for seed search.
    pub random_seed: u64,
    /// Shift used to chain vectors within a CA90 bank.
    pub ca90_chain_shift: usize,
    pub max_seed_attempts: usize,
    /// Number of CIM levels; `None` builds the `hv_dim / 2`-level square CIM.
    pub cim_levels: Option<usize>,
    pub cim_seed: u64,
    pub cim_max_ortho: bool,
    /// Quantization scheme tag, e.g. `"None"`, `"INT8"`, `"FP8_E4M3"`.
    pub quantization: String,
    pub overflow: Overflow,
    /// Reject oversized IM banks instead of warning.
    pub strict_bank_size: bool,
    /// Width multiplier applied to the IM and CIM after generation.
    pub expansion: usize,
}

impl Default for HdcConfig {
    fn default() -> Self {
        Self {
            hv_dim: 512,
            seed_size: 32,
            domain: Domain::Binary,
            num_total_im: 1024,
            num_per_im_bank: 128,
            im_mode: ImMode::Ca90Hierarchical,
            im_seeds: Vec::new(),
            random_seed: 0,
            ca90_chain_shift: 1,
            max_seed_attempts: 1_000_000,
            cim_levels: None,
            cim_seed: 0,
            cim_max_ortho: false,
            quantization: "None".to_string(),
            overflow: Overflow::Sat,
            strict_bank_size: false,
            expansion: 1,
        }
    }
}

impl HdcConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parsed quantization scheme.
    pub fn scheme(&self) -> Result<QuantScheme> {
        self.quantization.parse()
    }

    pub fn quantizer(&self) -> Result<Quantizer> {
        Ok(Quantizer::new(self.scheme()?, self.overflow))
    }

    /// Working dimension after expansion.
    pub fn working_dim(&self) -> usize {
        self.hv_dim * self.expansion
    }

    /// Item memory builder at `hv_dim` with these generation settings.
    pub fn item_memory_builder(&self) -> ItemMemoryBuilder {
        ItemMemoryBuilder::new(self.hv_dim)
            .with_domain(self.domain)
            .with_seed_size(self.seed_size)
            .with_chain_shift(self.ca90_chain_shift)
            .with_max_seed_attempts(self.max_seed_attempts)
            .strict_bank_size(self.strict_bank_size)
            .with_cim_mode(self.im_mode)
    }

    /// Reject settings that cannot produce a model.
    ///
    /// The CIM base is generated in the item memory's mode, so one
    /// reachability check covers both.
    pub fn validate(&self) -> Result<()> {
        if self.hv_dim == 0 {
            return Err(HdcError::InvalidConfig("hv_dim must be positive".into()));
        }
        if self.seed_size == 0 || self.seed_size > 64 {
            return Err(HdcError::InvalidSeedSize(self.seed_size));
        }
        if self.num_per_im_bank == 0 {
            return Err(HdcError::InvalidConfig("num_per_im_bank must be positive".into()));
        }
        if self.expansion == 0 {
            return Err(HdcError::InvalidConfig("expansion must be positive".into()));
        }
        if self.max_seed_attempts == 0 {
            return Err(HdcError::InvalidConfig("max_seed_attempts must be positive".into()));
        }
        if let Some(levels) = self.cim_levels {
            if levels == 0 {
                return Err(HdcError::InvalidConfig("cim_levels must be positive".into()));
            }
        }
        self.scheme()?;

        if let Some(mode) = self.im_mode.ca90_mode() {
            crate::ca90::Ca90::check_reachable(self.seed_size, self.hv_dim, mode)?;
            if self.strict_bank_size && self.num_per_im_bank * 2 >= self.hv_dim {
                return Err(HdcError::BankSizeExceeded {
                    per_bank: self.num_per_im_bank,
                    dim: self.hv_dim,
                });
            }
        }
        Ok(())
    }
}
