//! Encoder: samples to hypervectors.
//!
//! Each classification task supplies a [`SampleEncoder`] that looks up
//! item memory and CIM entries for every feature, binds them, and adds the
//! result to an [`Accumulator`]. The [`EncodingPipeline`] owns the part that
//! is shared across tasks: reducing the accumulator to a binarized
//! hypervector, or to a quantized vector when a codec is configured.
//!
//! # Role-Filler Binding
//!
//! Most encoders bind a feature's value (filler) to its position (role)
//! before bundling:
//! - `bind(im[feature_3], cim[level_7])` differs from
//! - `bind(im[feature_4], cim[level_7])`
//!
//! so the bundle remembers which feature carried which value.
//!
//! # Built-in encoders
//!
//! | Encoder                 | Sample         | Per-feature term                                  |
//! |-------------------------|----------------|---------------------------------------------------|
//! | [`IdLevelEncoder`]      | `[usize]`      | `bind(im[i], cim[value / bin_width])`             |
//! | [`ValuePositionEncoder`]| `[usize]`      | `bind(im[value], im[offset + i])`                 |
//! | [`NgramEncoder`]        | `str`          | bound, permuted characters of each n-gram window  |
//! | [`PermutedBitEncoder`]  | `[u8]`         | `permute(im[i], 1)` for set bits, else `im[i]`    |

use crate::accumulator::Accumulator;
use crate::error::{HdcError, Result};
use crate::item_memory::{ContinuousItemMemory, ItemMemory};
use crate::primitives::Primitives;
use crate::quantize::{QuantScheme, QuantizedVector, Quantizer};
use crate::similarity::Similarity;
use crate::vector::{Domain, Hypervector};
use std::collections::HashMap;

/// Task-specific feature-to-vector mapping.
///
/// Implementations add one term per feature to `acc`; the item memory and
/// CIM are read-only. Closures with the same signature implement this trait.
pub trait SampleEncoder<S: ?Sized>: Send + Sync {
    fn accumulate(
        &self,
        sample: &S,
        im: &ItemMemory,
        cim: Option<&ContinuousItemMemory>,
        domain: Domain,
        acc: &mut Accumulator,
    ) -> Result<()>;
}

impl<S, F> SampleEncoder<S> for F
where
    S: ?Sized,
    F: Fn(&S, &ItemMemory, Option<&ContinuousItemMemory>, Domain, &mut Accumulator) -> Result<()> + Send + Sync,
{
    fn accumulate(
        &self,
        sample: &S,
        im: &ItemMemory,
        cim: Option<&ContinuousItemMemory>,
        domain: Domain,
        acc: &mut Accumulator,
    ) -> Result<()> {
        self(sample, im, cim, domain, acc)
    }
}

/// An encoded sample or class representative.
#[derive(Clone, Debug, PartialEq)]
pub enum Encoded {
    /// Binarized hypervector.
    Hyper(Hypervector),
    /// Quantized, scaled-back values.
    Quantized(QuantizedVector),
}

impl Encoded {
    pub fn dimensions(&self) -> usize {
        match self {
            Encoded::Hyper(hv) => hv.dimensions(),
            Encoded::Quantized(q) => q.dimensions(),
        }
    }

    /// Values as f64.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            Encoded::Hyper(hv) => hv.to_f64(),
            Encoded::Quantized(q) => q.values().to_vec(),
        }
    }

    pub fn as_hypervector(&self) -> Option<&Hypervector> {
        match self {
            Encoded::Hyper(hv) => Some(hv),
            Encoded::Quantized(_) => None,
        }
    }

    /// Similarity to `other`: Hamming for two binary hypervectors, cosine
    /// for everything else.
    pub fn similarity(&self, other: &Encoded, domain: Domain) -> Result<f64> {
        match (self, other) {
            (Encoded::Hyper(a), Encoded::Hyper(b)) => Similarity::distance(a, b, domain),
            _ => Similarity::cosine_f64(&self.to_f64(), &other.to_f64()),
        }
    }
}

impl From<Hypervector> for Encoded {
    fn from(hv: Hypervector) -> Self {
        Encoded::Hyper(hv)
    }
}

/// Shared encode path: accumulate with a task encoder, then reduce.
#[derive(Clone, Debug, Default)]
pub struct EncodingPipeline {
    domain: Domain,
    quantizer: Quantizer,
}

impl EncodingPipeline {
    pub fn new(domain: Domain, quantizer: Quantizer) -> Self {
        Self { domain, quantizer }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    /// Whether samples are quantized rather than binarized.
    pub fn is_quantized(&self) -> bool {
        self.quantizer.scheme() != QuantScheme::None
    }

    /// Run the task encoder into a fresh accumulator.
    pub fn accumulate<S, E>(
        &self,
        encoder: &E,
        sample: &S,
        im: &ItemMemory,
        cim: Option<&ContinuousItemMemory>,
    ) -> Result<Accumulator>
    where
        S: ?Sized,
        E: SampleEncoder<S> + ?Sized,
    {
        let mut acc = Accumulator::new(im.dimensions());
        encoder.accumulate(sample, im, cim, self.domain, &mut acc)?;
        Ok(acc)
    }

    /// Reduce an accumulator at threshold `count / 2`.
    pub fn reduce(&self, acc: &Accumulator) -> Encoded {
        if self.is_quantized() {
            Encoded::Quantized(
                self.quantizer
                    .quantize(&acc.sums_f64(), acc.threshold(), self.domain, false),
            )
        } else {
            Encoded::Hyper(acc.binarize(self.domain))
        }
    }

    /// Encode one sample.
    pub fn encode<S, E>(
        &self,
        encoder: &E,
        sample: &S,
        im: &ItemMemory,
        cim: Option<&ContinuousItemMemory>,
    ) -> Result<Encoded>
    where
        S: ?Sized,
        E: SampleEncoder<S> + ?Sized,
    {
        let acc = self.accumulate(encoder, sample, im, cim)?;
        Ok(self.reduce(&acc))
    }
}

fn require_cim(cim: Option<&ContinuousItemMemory>) -> Result<&ContinuousItemMemory> {
    cim.ok_or_else(|| HdcError::InvalidConfig("encoder needs a continuous item memory".into()))
}

/// Feature id bound to a quantized level (ISOLET, UCIHAR).
///
/// Feature `i` with value `v` contributes `bind(im[i], cim[v / bin_width])`.
#[derive(Clone, Debug)]
pub struct IdLevelEncoder {
    bin_width: usize,
}

impl IdLevelEncoder {
    /// `bin_width` of 0 is treated as 1.
    pub fn new(bin_width: usize) -> Self {
        Self {
            bin_width: bin_width.max(1),
        }
    }
}

impl Default for IdLevelEncoder {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SampleEncoder<[usize]> for IdLevelEncoder {
    fn accumulate(
        &self,
        sample: &[usize],
        im: &ItemMemory,
        cim: Option<&ContinuousItemMemory>,
        domain: Domain,
        acc: &mut Accumulator,
    ) -> Result<()> {
        let cim = require_cim(cim)?;
        for (i, &value) in sample.iter().enumerate() {
            let id = im.get(i)?;
            let level = cim.get(value / self.bin_width)?;
            acc.add(&Primitives::bind(id, level, domain)?)?;
        }
        Ok(())
    }
}

/// Feature value bound to feature position, both from the item memory
/// (MNIST pixels, DNA bases).
///
/// Values index `im[0..offset]`; position `i` uses `im[offset + i]`.
#[derive(Clone, Debug)]
pub struct ValuePositionEncoder {
    value_offset: usize,
}

impl ValuePositionEncoder {
    pub fn new(value_offset: usize) -> Self {
        Self { value_offset }
    }

    pub fn value_offset(&self) -> usize {
        self.value_offset
    }
}

impl SampleEncoder<[usize]> for ValuePositionEncoder {
    fn accumulate(
        &self,
        sample: &[usize],
        im: &ItemMemory,
        _cim: Option<&ContinuousItemMemory>,
        domain: Domain,
        acc: &mut Accumulator,
    ) -> Result<()> {
        for (i, &value) in sample.iter().enumerate() {
            let value_hv = im.get(value)?;
            let position_hv = im.get(self.value_offset + i)?;
            acc.add(&Primitives::bind(value_hv, position_hv, domain)?)?;
        }
        Ok(())
    }
}

/// Permutation amount per n-gram position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PermuteOrder {
    /// Position `j` is rotated by `j * step`.
    #[default]
    Forward,
    /// Position `j` is rotated by `(n - 1 - j) * step`.
    Reverse,
}

/// Character n-gram encoder (language recognition).
///
/// Every window binds its characters, each rotated by its position in the
/// window, and the window vectors are bundled. Windows start at
/// `0..len - n`, so the final n-gram of a line is not counted. Characters
/// missing from the map are skipped but the window still counts toward the
/// threshold.
#[derive(Clone, Debug)]
pub struct NgramEncoder {
    n: usize,
    step: i64,
    order: PermuteOrder,
    char_map: HashMap<char, usize>,
}

impl NgramEncoder {
    pub fn new(n: usize, char_map: HashMap<char, usize>) -> Self {
        Self {
            n,
            step: 1,
            order: PermuteOrder::Forward,
            char_map,
        }
    }

    /// Lowercase latin letters `a..=z` at 0..26 and space at 26.
    pub fn latin_alphabet() -> HashMap<char, usize> {
        ('a'..='z').chain(std::iter::once(' ')).zip(0..).collect()
    }

    pub fn with_permutation(mut self, step: i64, order: PermuteOrder) -> Self {
        self.step = step;
        self.order = order;
        self
    }

    fn shift(&self, j: usize) -> i64 {
        let pos = match self.order {
            PermuteOrder::Forward => j,
            PermuteOrder::Reverse => self.n - 1 - j,
        };
        pos as i64 * self.step
    }
}

impl SampleEncoder<str> for NgramEncoder {
    fn accumulate(
        &self,
        sample: &str,
        im: &ItemMemory,
        _cim: Option<&ContinuousItemMemory>,
        domain: Domain,
        acc: &mut Accumulator,
    ) -> Result<()> {
        let chars: Vec<char> = sample.chars().collect();
        let windows = chars.len().saturating_sub(self.n);

        for start in 0..windows {
            let mut gram = Hypervector::identity(im.dimensions(), domain);
            for j in 0..self.n {
                let Some(&index) = self.char_map.get(&chars[start + j]) else {
                    continue;
                };
                let rotated = Primitives::permute(im.get(index)?, self.shift(j));
                gram = Primitives::bind(&gram, &rotated, domain)?;
            }
            acc.add(&gram)?;
        }
        Ok(())
    }
}

/// Per-bit permutation encoder (character recognition).
///
/// Pixel `i` contributes `permute(im[i], 1)` when set and `im[i]` otherwise.
#[derive(Clone, Debug, Default)]
pub struct PermutedBitEncoder;

impl SampleEncoder<[u8]> for PermutedBitEncoder {
    fn accumulate(
        &self,
        sample: &[u8],
        im: &ItemMemory,
        _cim: Option<&ContinuousItemMemory>,
        _domain: Domain,
        acc: &mut Accumulator,
    ) -> Result<()> {
        for (i, &bit) in sample.iter().enumerate() {
            let base = im.get(i)?;
            if bit != 0 {
                acc.add(&Primitives::permute(base, 1))?;
            } else {
                acc.add(base)?;
            }
        }
        Ok(())
    }
}
