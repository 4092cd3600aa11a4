//! HDC primitives: the elementwise operations the hardware ALU implements.
//!
//! - **bind**: XOR for binary, multiply for bipolar
//! - **permute**: circular rotation
//! - **and / or / xor**: raw bit operations on binary vectors
//! - **binarize**: reduce an accumulator to a hypervector
//! - **bundle**: accumulate then binarize
//!
//! All functions are pure. Rotation convention: `permute(v, k)` moves
//! element `i` to position `(i + k) mod D`.

use crate::accumulator::Accumulator;
use crate::error::{HdcError, Result};
use crate::vector::{Domain, Hypervector};

/// Collection of HDC primitive operations.
pub struct Primitives;

impl Primitives {
    pub(crate) fn check_dims(expected: usize, got: usize) -> Result<()> {
        if expected != got {
            return Err(HdcError::DimensionMismatch { expected, got });
        }
        Ok(())
    }

    /// Bind two vectors.
    ///
    /// The result is dissimilar to both inputs and binding is self-inverse:
    /// `bind(bind(a, b), b) == a` in both domains.
    pub fn bind(a: &Hypervector, b: &Hypervector, domain: Domain) -> Result<Hypervector> {
        match domain {
            Domain::Binary => Self::xor(a, b),
            Domain::Bipolar => Self::zip_with(a, b, |x, y| x * y),
        }
    }

    /// Elementwise XOR of two binary vectors.
    pub fn xor(a: &Hypervector, b: &Hypervector) -> Result<Hypervector> {
        Self::zip_with(a, b, |x, y| x ^ y)
    }

    /// Elementwise AND of two binary vectors.
    pub fn and(a: &Hypervector, b: &Hypervector) -> Result<Hypervector> {
        Self::zip_with(a, b, |x, y| x & y)
    }

    /// Elementwise OR of two binary vectors.
    pub fn or(a: &Hypervector, b: &Hypervector) -> Result<Hypervector> {
        Self::zip_with(a, b, |x, y| x | y)
    }

    fn zip_with(a: &Hypervector, b: &Hypervector, f: impl Fn(i8, i8) -> i8) -> Result<Hypervector> {
        Self::check_dims(a.dimensions(), b.dimensions())?;

        let data: Vec<i8> = a
            .data()
            .iter()
            .zip(b.data().iter())
            .map(|(&x, &y)| f(x, y))
            .collect();

        Ok(Hypervector::from_data(data))
    }

    /// Circular shift of vector elements by `k` positions.
    ///
    /// `k` may be negative or exceed the dimension; it is reduced modulo `D`.
    pub fn permute(vec: &Hypervector, k: i64) -> Hypervector {
        let n = vec.dimensions();
        if n == 0 {
            return vec.clone();
        }
        let shift = k.rem_euclid(n as i64) as usize;

        let mut data = vec![0i8; n];
        for (i, &v) in vec.data().iter().enumerate() {
            data[(i + shift) % n] = v;
        }

        Hypervector::from_data(data)
    }

    /// Reduce accumulated sums to a hypervector.
    ///
    /// Binary: `sum >= threshold` → 1, else 0.
    /// Bipolar: `sum >= 0` → +1, else -1. The threshold is ignored because
    /// bipolar sums are already centred on zero.
    pub fn binarize<T>(sums: &[T], threshold: f64, domain: Domain) -> Hypervector
    where
        T: Copy + Into<f64>,
    {
        let data: Vec<i8> = match domain {
            Domain::Binary => sums
                .iter()
                .map(|&s| i8::from(Into::<f64>::into(s) >= threshold))
                .collect(),
            Domain::Bipolar => sums
                .iter()
                .map(|&s| if Into::<f64>::into(s) >= 0.0 { 1 } else { -1 })
                .collect(),
        };

        Hypervector::from_data(data)
    }

    /// Bundle vectors: accumulate all of them, then binarize at half the count.
    pub fn bundle(vectors: &[&Hypervector], domain: Domain) -> Result<Hypervector> {
        let first = vectors
            .first()
            .ok_or_else(|| HdcError::EmptyInput("cannot bundle an empty vector list".into()))?;

        let mut acc = Accumulator::new(first.dimensions());
        for vec in vectors {
            acc.add(vec)?;
        }

        Ok(acc.binarize(domain))
    }
}
