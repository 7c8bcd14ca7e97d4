//! Distance metrics for vector similarity

use crate::error::{Result, SearchError};
use crate::vector::l2_norm;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distance metrics for measuring vector similarity.
///
/// L2 and cosine are "smaller is closer". Inner product is a similarity,
/// so larger values rank first; index code works on [`rank_key`], which is
/// always "smaller is better", and reports the natural value back.
///
/// [`rank_key`]: DistanceMetric::rank_key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared Euclidean distance
    L2,
    /// Cosine distance (1 - cosine similarity)
    Cosine,
    /// Inner product similarity
    InnerProduct,
}

impl DistanceMetric {
    /// Compute the metric between two vectors.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        if a.len() != b.len() {
            return Err(SearchError::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }

        match self {
            DistanceMetric::L2 => Ok(squared_l2(a, b)),
            DistanceMetric::Cosine => cosine_distance(a, b),
            DistanceMetric::InnerProduct => Ok(dot_product(a, b)),
        }
    }

    /// Same as [`distance`](Self::distance) with both norms already known.
    ///
    /// Callers have validated the dimensions. Only cosine reads the norms.
    pub(crate) fn distance_with_norms(
        &self,
        a: &[f32],
        norm_a: f32,
        b: &[f32],
        norm_b: f32,
    ) -> Result<f32> {
        debug_assert_eq!(a.len(), b.len());
        match self {
            DistanceMetric::L2 => Ok(squared_l2(a, b)),
            DistanceMetric::Cosine => cosine_from_norms(dot_product(a, b), norm_a, norm_b),
            DistanceMetric::InnerProduct => Ok(dot_product(a, b)),
        }
    }

    /// Whether larger metric values mean more similar.
    pub fn higher_is_better(&self) -> bool {
        matches!(self, DistanceMetric::InnerProduct)
    }

    /// Map a metric value onto a "smaller is better" ordering key.
    pub fn rank_key(&self, value: f32) -> f32 {
        if self.higher_is_better() {
            -value
        } else {
            value
        }
    }

    /// Inverse of [`rank_key`](Self::rank_key).
    pub fn from_rank_key(&self, key: f32) -> f32 {
        self.rank_key(key)
    }

    /// Stable one-byte tag used in the index artifact header.
    pub fn tag(&self) -> u8 {
        match self {
            DistanceMetric::L2 => 0,
            DistanceMetric::Cosine => 1,
            DistanceMetric::InnerProduct => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(DistanceMetric::L2),
            1 => Some(DistanceMetric::Cosine),
            2 => Some(DistanceMetric::InnerProduct),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::L2 => "l2",
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::InnerProduct => "inner_product",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceMetric {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            "cosine" => Ok(DistanceMetric::Cosine),
            "inner_product" | "innerproduct" | "ip" | "dot" => Ok(DistanceMetric::InnerProduct),
            other => Err(SearchError::InvalidArgument(format!(
                "unknown metric {other:?} (expected l2, cosine or inner_product)"
            ))),
        }
    }
}

/// Squared Euclidean distance between two slices
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Dot product of two slices
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine distance between two slices (1 - cosine similarity)
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    cosine_from_norms(dot_product(a, b), l2_norm(a), l2_norm(b))
}

fn cosine_from_norms(dot: f32, norm_a: f32, norm_b: f32) -> Result<f32> {
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(SearchError::DegenerateVector(
            "cosine distance is undefined for a zero vector".to_string(),
        ));
    }

    // Clamp to [-1, 1] to handle floating point errors
    let similarity = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    Ok(1.0 - similarity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_squared_l2() {
        let dist = squared_l2(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]);
        assert_relative_eq!(dist, 27.0, epsilon = 1e-5);
    }

    #[test]
    fn test_squared_l2_same_vector() {
        let v = [1.0, 2.0, 3.0];
        assert_relative_eq!(squared_l2(&v, &v), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_dot_product() {
        assert_relative_eq!(dot_product(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_identical() {
        let dist = cosine_distance(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]).unwrap();
        assert_relative_eq!(dist, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let dist = cosine_distance(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).unwrap();
        assert_relative_eq!(dist, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let dist = cosine_distance(&[1.0, 0.0, 0.0], &[-1.0, 0.0, 0.0]).unwrap();
        assert_relative_eq!(dist, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert!(matches!(
            DistanceMetric::Cosine.distance(&[0.0, 0.0], &[1.0, 0.0]),
            Err(SearchError::DegenerateVector(_))
        ));
    }

    #[test]
    fn test_symmetry() {
        let a = [0.3, -1.2, 4.0];
        let b = [2.0, 0.5, -0.7];
        for metric in [DistanceMetric::L2, DistanceMetric::Cosine, DistanceMetric::InnerProduct] {
            let ab = metric.distance(&a, &b).unwrap();
            let ba = metric.distance(&b, &a).unwrap();
            assert_relative_eq!(ab, ba, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(matches!(
            DistanceMetric::L2.distance(&[1.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(SearchError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_rank_key_flips_inner_product() {
        assert_eq!(DistanceMetric::L2.rank_key(2.0), 2.0);
        assert_eq!(DistanceMetric::InnerProduct.rank_key(2.0), -2.0);
        assert_eq!(DistanceMetric::InnerProduct.from_rank_key(-2.0), 2.0);
    }

    #[test]
    fn test_tag_roundtrip_and_parse() {
        for metric in [DistanceMetric::L2, DistanceMetric::Cosine, DistanceMetric::InnerProduct] {
            assert_eq!(DistanceMetric::from_tag(metric.tag()), Some(metric));
            assert_eq!(metric.name().parse::<DistanceMetric>().unwrap(), metric);
        }
        assert_eq!(DistanceMetric::from_tag(9), None);
        assert!("manhattan".parse::<DistanceMetric>().is_err());
    }
}
