//! Hypervector type.
//!
//! Elements are stored as i8 in one of two domains: binary {0, 1} or
//! bipolar {-1, +1}. The domain is not stored in the vector; every
//! operation that depends on it takes a [`Domain`] explicitly.

use crate::error::{HdcError, Result};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Element domain of a hypervector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Elements in {0, 1}; bind is XOR, similarity is Hamming.
    #[default]
    Binary,
    /// Elements in {-1, +1}; bind is multiply, similarity is cosine.
    Bipolar,
}

impl Domain {
    /// Element value representing a set bit.
    pub fn one(self) -> i8 {
        1
    }

    /// Element value representing a cleared bit.
    pub fn zero(self) -> i8 {
        match self {
            Domain::Binary => 0,
            Domain::Bipolar => -1,
        }
    }

    /// Identity element for [`bind`](crate::Primitives::bind).
    pub fn bind_identity(self) -> i8 {
        match self {
            Domain::Binary => 0,
            Domain::Bipolar => 1,
        }
    }
}

/// A fixed-length hypervector.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hypervector {
    data: Vec<i8>,
}

impl Hypervector {
    /// All-zero vector (the empty binary vector).
    pub fn zeros(dimensions: usize) -> Self {
        Self {
            data: vec![0; dimensions],
        }
    }

    /// Vector filled with the bind identity of `domain`.
    pub fn identity(dimensions: usize, domain: Domain) -> Self {
        Self {
            data: vec![domain.bind_identity(); dimensions],
        }
    }

    /// Create a vector from raw data.
    pub fn from_data(data: Vec<i8>) -> Self {
        Self { data }
    }

    /// Build a `size`-element binary vector from an integer seed.
    ///
    /// The most significant of the `size` bits lands in element 0, so the
    /// vector reads left to right like the seed's binary string.
    pub fn from_seed(seed: u64, size: usize) -> Result<Self> {
        if size == 0 || size > 64 {
            return Err(HdcError::InvalidSeedSize(size));
        }
        let data = (0..size)
            .map(|i| ((seed >> (size - 1 - i)) & 1) as i8)
            .collect();
        Ok(Self { data })
    }

    /// Inverse of [`from_seed`](Self::from_seed) for binary vectors of at most 64 elements.
    pub fn to_seed(&self) -> Result<u64> {
        if self.data.is_empty() || self.data.len() > 64 {
            return Err(HdcError::InvalidSeedSize(self.data.len()));
        }
        Ok(self
            .data
            .iter()
            .fold(0u64, |acc, &b| (acc << 1) | u64::from(b > 0)))
    }

    /// Get the dimensionality.
    pub fn dimensions(&self) -> usize {
        self.data.len()
    }

    /// Get the raw data as a slice.
    pub fn data(&self) -> &[i8] {
        &self.data
    }

    /// Get mutable access to the raw data.
    pub fn data_mut(&mut self) -> &mut [i8] {
        &mut self.data
    }

    /// Consume the vector and return its elements.
    pub fn into_data(self) -> Vec<i8> {
        self.data
    }

    /// Number of set elements (1 in either domain).
    pub fn count_ones(&self) -> usize {
        self.data.iter().filter(|&&v| v == 1).count()
    }

    /// Convert to f64 values.
    pub fn to_f64(&self) -> Vec<f64> {
        self.data.iter().map(|&v| v as f64).collect()
    }

    /// Compute the L2 norm.
    pub fn norm(&self) -> f64 {
        let sum_sq: i64 = self.data.iter().map(|&v| (v as i64) * (v as i64)).sum();
        (sum_sq as f64).sqrt()
    }

    /// Map a binary vector to bipolar (0 → -1, 1 → +1).
    pub fn to_bipolar(&self) -> Self {
        let data = self
            .data
            .iter()
            .map(|&v| if v > 0 { 1 } else { -1 })
            .collect();
        Self { data }
    }

    /// Map a bipolar vector to binary (-1 → 0, +1 → 1).
    pub fn to_binary(&self) -> Self {
        let data = self.data.iter().map(|&v| i8::from(v > 0)).collect();
        Self { data }
    }

    /// Concatenate `other` after `self`.
    pub fn concat(&self, other: &Hypervector) -> Self {
        let mut data = Vec::with_capacity(self.data.len() + other.data.len());
        data.extend_from_slice(&self.data);
        data.extend_from_slice(&other.data);
        Self { data }
    }

    /// Render as an ASCII bit string, '1' for set elements and '0' otherwise.
    pub fn to_bit_string(&self) -> String {
        self.data
            .iter()
            .map(|&v| if v > 0 { '1' } else { '0' })
            .collect()
    }

    /// Parse an ASCII bit string produced by [`to_bit_string`](Self::to_bit_string).
    pub fn from_bit_string(line: &str, domain: Domain) -> Result<Self> {
        let data = line
            .chars()
            .map(|c| match c {
                '1' => Ok(domain.one()),
                '0' => Ok(domain.zero()),
                other => Err(HdcError::Parse {
                    line: 0,
                    message: format!("unexpected character {:?}", other),
                }),
            })
            .collect::<Result<Vec<i8>>>()?;
        Ok(Self { data })
    }
}

impl Index<usize> for Hypervector {
    type Output = i8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<usize> for Hypervector {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.data[index]
    }
}
