//! Similarity metrics between hypervectors.
//!
//! Binary vectors are compared by normalized Hamming similarity, bipolar
//! and quantized vectors by cosine. Both are "higher is closer": 1.0 for
//! identical vectors, about 0.5 (Hamming) or 0.0 (cosine) for unrelated ones.
//!
//! When compiled with the `simd` feature, i8 cosine uses SIMD dot products.

use crate::error::Result;
use crate::primitives::Primitives;
use crate::vector::{Domain, Hypervector};

/// Similarity computation for hypervectors.
pub struct Similarity;

impl Similarity {
    /// Similarity in the metric `domain` calls for.
    ///
    /// `Binary` → `1 - hamming(a, b) / D`; `Bipolar` → cosine.
    pub fn distance(a: &Hypervector, b: &Hypervector, domain: Domain) -> Result<f64> {
        match domain {
            Domain::Binary => Self::hamming(a, b),
            Domain::Bipolar => Self::cosine(a, b),
        }
    }

    /// Number of positions where `a` and `b` differ.
    pub fn hamming_distance(a: &Hypervector, b: &Hypervector) -> Result<usize> {
        Primitives::check_dims(a.dimensions(), b.dimensions())?;
        Ok(a.data()
            .iter()
            .zip(b.data())
            .filter(|(x, y)| x != y)
            .count())
    }

    /// Hamming similarity: fraction of agreeing positions.
    pub fn hamming(a: &Hypervector, b: &Hypervector) -> Result<f64> {
        let diff = Self::hamming_distance(a, b)?;
        let n = a.dimensions();
        if n == 0 {
            return Ok(1.0);
        }
        Ok(1.0 - diff as f64 / n as f64)
    }

    /// Cosine similarity: dot(a, b) / (||a|| * ||b||)
    ///
    /// A zero-norm operand counts as norm 1.
    #[cfg(feature = "simd")]
    pub fn cosine(a: &Hypervector, b: &Hypervector) -> Result<f64> {
        use simsimd::SpatialSimilarity;
        Primitives::check_dims(a.dimensions(), b.dimensions())?;

        let dot_ab = i8::dot(a.data(), b.data()).unwrap_or(0.0);
        let dot_aa = i8::dot(a.data(), a.data()).unwrap_or(0.0);
        let dot_bb = i8::dot(b.data(), b.data()).unwrap_or(0.0);

        Ok(dot_ab / (nonzero_norm(dot_aa.sqrt()) * nonzero_norm(dot_bb.sqrt())))
    }

    #[cfg(not(feature = "simd"))]
    pub fn cosine(a: &Hypervector, b: &Hypervector) -> Result<f64> {
        Primitives::check_dims(a.dimensions(), b.dimensions())?;
        let dot: i64 = a
            .data()
            .iter()
            .zip(b.data())
            .map(|(&x, &y)| x as i64 * y as i64)
            .sum();

        Ok(dot as f64 / (nonzero_norm(a.norm()) * nonzero_norm(b.norm())))
    }

    /// Cosine similarity over real-valued (quantized) vectors.
    pub fn cosine_f64(a: &[f64], b: &[f64]) -> Result<f64> {
        Primitives::check_dims(a.len(), b.len())?;
        let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
        let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

        Ok(dot / (nonzero_norm(norm_a) * nonzero_norm(norm_b)))
    }
}

fn nonzero_norm(norm: f64) -> f64 {
    if norm == 0.0 {
        1.0
    } else {
        norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let a = Hypervector::from_data(vec![1, -1, 1, -1]);
        let sim = Similarity::cosine(&a, &a).unwrap();
        assert!((sim - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = Hypervector::from_data(vec![1, -1, 1, -1]);
        let b = Hypervector::from_data(vec![-1, 1, -1, 1]);
        let sim = Similarity::cosine(&a, &b).unwrap();
        assert!((sim - (-1.0)).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_zero_norm() {
        let a = Hypervector::zeros(4);
        let b = Hypervector::from_data(vec![1, 1, -1, 1]);
        assert_eq!(Similarity::cosine(&a, &b).unwrap(), 0.0);
        assert_eq!(Similarity::cosine_f64(&[0.0; 3], &[0.0; 3]).unwrap(), 0.0);
    }

    #[test]
    fn test_hamming() {
        let a = Hypervector::from_data(vec![1, 0, 1, 0]);
        let b = Hypervector::from_data(vec![1, 0, 1, 1]);
        let sim = Similarity::hamming(&a, &b).unwrap();
        assert!((sim - 0.75).abs() < 1e-10); // 3 out of 4 match
        assert_eq!(Similarity::hamming_distance(&a, &b).unwrap(), 1);
    }

    #[test]
    fn test_distance_dispatches_on_domain() {
        let a = Hypervector::from_data(vec![1, 0, 0, 0]);
        let b = Hypervector::from_data(vec![0, 0, 0, 0]);
        assert_eq!(Similarity::distance(&a, &b, Domain::Binary).unwrap(), 0.75);
        assert_eq!(Similarity::distance(&a, &b, Domain::Bipolar).unwrap(), 0.0);
    }

    #[test]
    fn test_self_similarity() {
        let a = Hypervector::from_data(vec![1, 0, 1, 1, 0, 0]);
        assert_eq!(Similarity::distance(&a, &a, Domain::Binary).unwrap(), 1.0);

        let bip = a.to_bipolar();
        let sim = Similarity::distance(&bip, &bip, Domain::Bipolar).unwrap();
        assert!((sim - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_f64() {
        let sim = Similarity::cosine_f64(&[3.0, 4.0], &[6.0, 8.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mismatch() {
        let a = Hypervector::zeros(4);
        let b = Hypervector::zeros(5);
        assert!(Similarity::hamming(&a, &b).is_err());
        assert!(Similarity::cosine(&a, &b).is_err());
    }
}
