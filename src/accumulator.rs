//! Accumulators: integer sums of bundled hypervectors.
//!
//! An accumulator keeps one running sum per element plus the count of
//! vectors added. It is only reduced to a hypervector on demand, so
//! a class memory can keep absorbing samples (and, during retraining,
//! shedding them) without losing frequency information.
//!
//! # Key Insight
//!
//! - `bundle([a, a, a, b])` = `a` (majority)
//! - the accumulator remembers that `a` was seen three times
//!
//! Retraining relies on this: subtracting a misclassified sample undoes
//! exactly its contribution, which a binarized vector cannot do.
//!
//! Sums are exact integers. Quantized class memories, whose terms are
//! scaled reals, use [`QuantAccumulator`] instead.

use crate::error::{HdcError, Result};
use crate::primitives::Primitives;
use crate::quantize::QuantizedVector;
use crate::vector::{Domain, Hypervector};

/// Most terms an [`Accumulator`] will take.
///
/// Sums are also checked element by element, so vectors with elements
/// outside {-1, 0, 1} fail with [`HdcError::AccumulatorOverflow`] rather
/// than wrapping.
pub const ACCUMULATOR_CAPACITY: u64 = i32::MAX as u64;

/// Exact per-element sums of bundled hypervectors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Accumulator {
    /// Running sum per element (not thresholded)
    sums: Vec<i32>,
    /// Net number of vectors bundled; negative after heavy retraining
    count: i64,
    /// Total add/subtract operations, bounded by the capacity
    terms: u64,
}

impl Accumulator {
    /// Create a new empty accumulator.
    pub fn new(dimensions: usize) -> Self {
        Self {
            sums: vec![0; dimensions],
            count: 0,
            terms: 0,
        }
    }

    /// Get the dimensionality.
    pub fn dimensions(&self) -> usize {
        self.sums.len()
    }

    /// Net number of accumulated vectors.
    pub fn count(&self) -> i64 {
        self.count
    }

    /// Get the raw sums.
    pub fn sums(&self) -> &[i32] {
        &self.sums
    }

    /// Sums as f64, for quantization.
    pub fn sums_f64(&self) -> Vec<f64> {
        self.sums.iter().map(|&s| s as f64).collect()
    }

    fn overflow() -> HdcError {
        HdcError::AccumulatorOverflow {
            capacity: ACCUMULATOR_CAPACITY,
        }
    }

    /// Apply `sign * vec` to the sums. Nothing changes if any sum would
    /// leave `i32`.
    fn apply(&mut self, vec: &Hypervector, sign: i32) -> Result<()> {
        Primitives::check_dims(self.dimensions(), vec.dimensions())?;
        if self.terms >= ACCUMULATOR_CAPACITY {
            return Err(Self::overflow());
        }
        let updated = self
            .sums
            .iter()
            .zip(vec.data())
            .map(|(&s, &v)| s.checked_add(sign * v as i32))
            .collect::<Option<Vec<i32>>>()
            .ok_or_else(Self::overflow)?;

        self.sums = updated;
        self.terms += 1;
        Ok(())
    }

    /// Add a vector to the sums and bump the count.
    pub fn add(&mut self, vec: &Hypervector) -> Result<()> {
        self.apply(vec, 1)?;
        self.count += 1;
        Ok(())
    }

    /// Remove a vector's contribution and drop the count.
    pub fn subtract(&mut self, vec: &Hypervector) -> Result<()> {
        self.apply(vec, -1)?;
        self.count -= 1;
        Ok(())
    }

    /// Merge another accumulator into this one.
    ///
    /// Used to combine per-thread partial sums.
    pub fn merge(&mut self, other: &Accumulator) -> Result<()> {
        Primitives::check_dims(self.dimensions(), other.dimensions())?;
        let terms = self.terms.saturating_add(other.terms);
        if terms > ACCUMULATOR_CAPACITY {
            return Err(Self::overflow());
        }
        let merged = self
            .sums
            .iter()
            .zip(&other.sums)
            .map(|(&s, &o)| s.checked_add(o))
            .collect::<Option<Vec<i32>>>()
            .ok_or_else(Self::overflow)?;

        self.sums = merged;
        self.count += other.count;
        self.terms = terms;
        Ok(())
    }

    /// Clear the accumulator to start fresh.
    pub fn clear(&mut self) {
        self.sums.fill(0);
        self.count = 0;
        self.terms = 0;
    }

    /// Majority threshold: half the count.
    pub fn threshold(&self) -> f64 {
        self.count as f64 / 2.0
    }

    /// Reduce to a hypervector at the majority threshold.
    pub fn binarize(&self, domain: Domain) -> Hypervector {
        Primitives::binarize(&self.sums, self.threshold(), domain)
    }
}

/// Real-valued sums of quantized vectors.
///
/// Tracks the per-sample `max_q_val` so that the class-level bound
/// (`count × max_q_val`) can be handed to the quantizer.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantAccumulator {
    sums: Vec<f64>,
    count: i64,
    max_q_val: f64,
}

impl QuantAccumulator {
    pub fn new(dimensions: usize) -> Self {
        Self {
            sums: vec![0.0; dimensions],
            count: 0,
            max_q_val: 0.0,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.sums.len()
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn sums(&self) -> &[f64] {
        &self.sums
    }

    /// Largest per-element magnitude seen on any added sample.
    pub fn max_q_val(&self) -> f64 {
        self.max_q_val
    }

    /// Theoretical magnitude bound of the sums: `count × max_q_val`.
    pub fn bound(&self) -> f64 {
        self.count as f64 * self.max_q_val
    }

    pub fn add(&mut self, vec: &QuantizedVector) -> Result<()> {
        Primitives::check_dims(self.dimensions(), vec.dimensions())?;
        for (s, &v) in self.sums.iter_mut().zip(vec.values()) {
            *s += v;
        }
        self.count += 1;
        self.max_q_val = self.max_q_val.max(vec.max_q_val());
        Ok(())
    }

    pub fn subtract(&mut self, vec: &QuantizedVector) -> Result<()> {
        Primitives::check_dims(self.dimensions(), vec.dimensions())?;
        for (s, &v) in self.sums.iter_mut().zip(vec.values()) {
            *s -= v;
        }
        self.count -= 1;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.sums.fill(0.0);
        self.count = 0;
        self.max_q_val = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_basic() {
        let mut acc = Accumulator::new(4);
        assert_eq!(acc.count(), 0);

        acc.add(&Hypervector::from_data(vec![1, 0, 1, 0])).unwrap();

        assert_eq!(acc.count(), 1);
        assert_eq!(acc.sums(), &[1, 0, 1, 0]);
    }

    #[test]
    fn test_frequency_preservation() {
        let mut acc = Accumulator::new(4);

        let common = Hypervector::from_data(vec![1, 1, 1, 1]);
        let rare = Hypervector::from_data(vec![-1, -1, -1, -1]);

        for _ in 0..10 {
            acc.add(&common).unwrap();
        }
        acc.add(&rare).unwrap();

        // Each element: 10 * 1 + 1 * (-1) = 9
        assert_eq!(acc.sums(), &[9, 9, 9, 9]);
        assert_eq!(acc.count(), 11);
    }

    #[test]
    fn test_subtract_undoes_add() {
        let mut acc = Accumulator::new(4);
        let a = Hypervector::from_data(vec![1, 0, 1, 1]);
        let b = Hypervector::from_data(vec![0, 1, 1, 0]);

        acc.add(&a).unwrap();
        acc.add(&b).unwrap();
        acc.subtract(&b).unwrap();

        assert_eq!(acc.sums(), &[1, 0, 1, 1]);
        assert_eq!(acc.count(), 1);
    }

    #[test]
    fn test_count_can_go_negative() {
        let mut acc = Accumulator::new(2);
        acc.subtract(&Hypervector::from_data(vec![1, 0])).unwrap();

        assert_eq!(acc.count(), -1);
        assert_eq!(acc.sums(), &[-1, 0]);
        assert_eq!(acc.threshold(), -0.5);
    }

    #[test]
    fn test_binarize_majority() {
        let mut acc = Accumulator::new(4);
        acc.add(&Hypervector::from_data(vec![1, 1, 0, 0])).unwrap();
        acc.add(&Hypervector::from_data(vec![1, 0, 1, 0])).unwrap();

        // Threshold 1.0; ties go to 1
        assert_eq!(acc.binarize(Domain::Binary).data(), &[1, 1, 1, 0]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut acc = Accumulator::new(4);
        let err = acc.add(&Hypervector::zeros(3)).unwrap_err();
        assert!(matches!(err, HdcError::DimensionMismatch { expected: 4, got: 3 }));
    }

    #[test]
    fn test_merge() {
        let mut acc1 = Accumulator::new(4);
        let mut acc2 = Accumulator::new(4);

        acc1.add(&Hypervector::from_data(vec![1, 0, 0, 0])).unwrap();
        acc2.add(&Hypervector::from_data(vec![0, 1, 0, 0])).unwrap();

        acc1.merge(&acc2).unwrap();

        assert_eq!(acc1.count(), 2);
        assert_eq!(acc1.sums(), &[1, 1, 0, 0]);
    }

    #[test]
    fn test_clear() {
        let mut acc = Accumulator::new(3);
        acc.add(&Hypervector::from_data(vec![1, 1, 1])).unwrap();
        acc.clear();
        assert_eq!(acc, Accumulator::new(3));
    }

    #[test]
    fn test_sum_overflow_leaves_sums_unchanged() {
        let mut acc = Accumulator {
            sums: vec![0, i32::MAX - 100],
            count: 1,
            terms: 1,
        };
        let err = acc.add(&Hypervector::from_data(vec![1, 127])).unwrap_err();

        assert!(matches!(err, HdcError::AccumulatorOverflow { .. }));
        assert_eq!(acc.sums(), &[0, i32::MAX - 100]);
        assert_eq!(acc.count(), 1);

        // The other direction still fits
        acc.subtract(&Hypervector::from_data(vec![1, 127])).unwrap();
        assert_eq!(acc.sums(), &[-1, i32::MAX - 227]);
    }

    #[test]
    fn test_merge_overflow() {
        let mut acc = Accumulator::new(1);
        acc.add(&Hypervector::from_data(vec![1])).unwrap();
        let big = Accumulator {
            sums: vec![i32::MAX],
            count: 1,
            terms: 1,
        };
        assert!(matches!(acc.merge(&big), Err(HdcError::AccumulatorOverflow { .. })));
        assert_eq!(acc.sums(), &[1]);
    }

    #[test]
    fn test_quant_accumulator_bound() {
        let mut acc = QuantAccumulator::new(3);
        acc.add(&QuantizedVector::new(vec![2.0, -1.0, 0.0], 4.0)).unwrap();
        acc.add(&QuantizedVector::new(vec![1.0, 1.0, 3.0], 4.0)).unwrap();

        assert_eq!(acc.sums(), &[3.0, 0.0, 3.0]);
        assert_eq!(acc.bound(), 8.0);

        acc.subtract(&QuantizedVector::new(vec![1.0, 1.0, 3.0], 4.0)).unwrap();
        assert_eq!(acc.sums(), &[2.0, -1.0, 0.0]);
        assert_eq!(acc.count(), 1);
    }
}
